//! Encoder and preset tables, plus two-pass flags.

use std::path::{Path, PathBuf};
use vidmend_av::Artifact;
use vidmend_common::{Device, Speed, ValidatedEncode, VideoFormat};

/// ffmpeg encoder name for a device and output format.
pub fn codec(device: Device, format: VideoFormat) -> &'static str {
    match (device, format) {
        (Device::Gpu, VideoFormat::H264) => "h264_nvenc",
        (Device::Gpu, VideoFormat::H265) => "hevc_nvenc",
        (Device::Cpu, VideoFormat::H264) => "libx264",
        (Device::Cpu, VideoFormat::H265) => "libx265",
    }
}

/// `-preset` value for a device and speed.
pub fn preset(device: Device, speed: Speed) -> &'static str {
    match (device, speed) {
        (Device::Gpu, Speed::Fast) => "2",
        (Device::Gpu, Speed::Slow) => "1",
        (Device::Cpu, Speed::Fast) => "medium",
        (Device::Cpu, Speed::Slow) => "slow",
    }
}

/// Reason a combination is known to produce a broken encode, if it is.
pub fn unsupported_reason(encode: &ValidatedEncode) -> Option<&'static str> {
    match (encode.device, encode.format, encode.speed) {
        (Device::Gpu, VideoFormat::H264, Speed::Slow) => {
            Some("h264_nvenc does not accept the slow preset used for gpu/h264/slow")
        }
        _ => None,
    }
}

/// Two-pass statistics handling for a software encoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TwoPass {
    /// libx264: `-pass N -passlogfile PREFIX`.
    X264 { prefix: PathBuf },
    /// libx265: `-x265-params pass=N:stats='PREFIX.log'`.
    X265 { prefix: PathBuf },
}

impl TwoPass {
    /// Two-pass flags for `codec`, writing statistics under `prefix`.
    ///
    /// Returns `None` for encoders without a two-pass mode.
    pub fn for_codec(codec: &str, prefix: &Path) -> Option<Self> {
        let prefix = prefix.to_path_buf();
        match codec {
            "libx264" => Some(Self::X264 { prefix }),
            "libx265" => Some(Self::X265 { prefix }),
            _ => None,
        }
    }

    /// Arguments selecting pass `pass` (1 or 2).
    pub fn args(&self, pass: u8) -> Vec<String> {
        match self {
            Self::X264 { prefix } => vec![
                "-pass".to_string(),
                pass.to_string(),
                "-passlogfile".to_string(),
                prefix.to_string_lossy().to_string(),
            ],
            Self::X265 { prefix } => vec![
                "-x265-params".to_string(),
                format!(
                    "pass={}:stats={}",
                    pass,
                    quote_option_value(&with_suffix(prefix, ".log").to_string_lossy())
                ),
            ],
        }
    }

    /// Statistics files the encoder leaves behind.
    pub fn artifacts(&self) -> Vec<Artifact> {
        let suffixes: &[&str] = match self {
            Self::X264 { .. } => &["-0.log", "-0.log.mbtree"],
            Self::X265 { .. } => &[".log", ".log.cutree"],
        };
        let prefix = match self {
            Self::X264 { prefix } | Self::X265 { prefix } => prefix,
        };
        suffixes
            .iter()
            .map(|suffix| Artifact::temporary(with_suffix(prefix, suffix)))
            .collect()
    }
}

/// Quote a value inside an ffmpeg `key=value:key=value` option list.
///
/// ffmpeg splits such lists on `:` and treats a backslash as an escape
/// outside single quotes. A literal `'` closes the quote, is escaped, and
/// reopens it.
fn quote_option_value(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

fn with_suffix(prefix: &Path, suffix: &str) -> PathBuf {
    let mut name = prefix.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}
