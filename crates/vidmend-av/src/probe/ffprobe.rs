//! FFprobe-based media probing.

use super::types::*;
use super::Prober;
use crate::command::ToolCommand;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    size: Option<String>,
    bit_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    index: u32,
    codec_type: Option<String>,
    codec_name: Option<String>,
    sample_rate: Option<String>,
    channels: Option<u16>,
    bit_rate: Option<String>,
}

/// [`Prober`] that shells out to `ffprobe`.
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    program: PathBuf,
    timeout: Option<Duration>,
}

impl FfprobeProber {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for FfprobeProber {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

impl Prober for FfprobeProber {
    fn name(&self) -> &'static str {
        "ffprobe"
    }

    fn probe(&self, path: &Path) -> Result<MediaMetadata> {
        if !path.is_file() {
            return Err(Error::file_not_found(path));
        }

        let mut cmd = ToolCommand::new(&self.program);
        cmd.args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(path.to_string_lossy())
            .maybe_timeout(self.timeout);

        let stdout = cmd.capture()?;
        let json_str = String::from_utf8(stdout)
            .map_err(|e| Error::parse_error("ffprobe", format!("Invalid UTF-8: {}", e)))?;

        parse_ffprobe_json(path, &json_str)
    }
}

/// Parse `ffprobe -print_format json -show_format -show_streams` output.
///
/// # Errors
///
/// Returns [`Error::Json`] for malformed JSON, [`Error::MissingField`] when
/// duration, size, bit rate or an audio stream's sample rate/channels are
/// absent, and [`Error::ParseError`] when a present value is not a number.
pub fn parse_ffprobe_json(path: &Path, json: &str) -> Result<MediaMetadata> {
    let output: FfprobeOutput = serde_json::from_str(json)?;
    let format = output
        .format
        .ok_or_else(|| Error::missing_field("format"))?;

    let duration_secs: f64 = required(format.duration, "format.duration")?;
    if !(duration_secs > 0.0) {
        return Err(Error::parse_error(
            "ffprobe",
            format!("non-positive duration: {duration_secs}"),
        ));
    }

    let mut metadata = MediaMetadata {
        path: path.to_path_buf(),
        duration_secs,
        size: required(format.size, "format.size")?,
        bit_rate: required(format.bit_rate, "format.bit_rate")?,
        audio_tracks: Vec::new(),
    };

    for stream in output.streams {
        if stream.codec_type.as_deref() != Some("audio") {
            continue;
        }
        let index = metadata.audio_tracks.len();
        let field = |name: &str| format!("streams[{}].{name}", stream.index);

        metadata.audio_tracks.push(AudioStream {
            index,
            stream_index: stream.index,
            codec: stream.codec_name,
            sample_rate: required(stream.sample_rate, &field("sample_rate"))?,
            channels: stream
                .channels
                .ok_or_else(|| Error::missing_field(field("channels")))?,
            bit_rate: optional(stream.bit_rate, &field("bit_rate"))?,
        });
    }

    Ok(metadata)
}

fn required<T: std::str::FromStr>(value: Option<String>, field: &str) -> Result<T> {
    let value = value.ok_or_else(|| Error::missing_field(field))?;
    parse_number(&value, field)
}

/// ffprobe prints `N/A` for values a container does not record.
fn optional<T: std::str::FromStr>(value: Option<String>, field: &str) -> Result<Option<T>> {
    match value.as_deref().map(str::trim) {
        None | Some("N/A") | Some("") => Ok(None),
        Some(value) => parse_number(value, field).map(Some),
    }
}

fn parse_number<T: std::str::FromStr>(value: &str, field: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::parse_error("ffprobe", format!("{field} is not a number: {value:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_TRACK: &str = r#"{
        "streams": [
            {"index": 0, "codec_type": "video", "codec_name": "h264"},
            {"index": 1, "codec_type": "audio", "codec_name": "aac",
             "sample_rate": "48000", "channels": 2, "bit_rate": "192000"},
            {"index": 2, "codec_type": "audio", "codec_name": "aac",
             "sample_rate": "48000", "channels": 1}
        ],
        "format": {"duration": "60.500000", "size": "52428800", "bit_rate": "6932000"}
    }"#;

    #[test]
    fn test_parse_audio_tracks_in_container_order() {
        let meta = parse_ffprobe_json(Path::new("/v/a.mp4"), TWO_TRACK).unwrap();
        assert_eq!(meta.duration_secs, 60.5);
        assert_eq!(meta.size, 52_428_800);
        assert_eq!(meta.bit_rate, 6_932_000);
        assert_eq!(meta.audio_track_count(), 2);

        let mic = meta.audio_track(1).unwrap();
        assert_eq!(mic.index, 1);
        assert_eq!(mic.stream_index, 2);
        assert_eq!(mic.channels, 1);
        assert_eq!(mic.bit_rate, None);
        assert_eq!(meta.audio_track(0).unwrap().bit_rate, Some(192_000));
    }

    #[test]
    fn test_unrecorded_stream_bit_rate_is_none() {
        let json = r#"{
            "streams": [
                {"index": 0, "codec_type": "audio", "codec_name": "opus",
                 "sample_rate": "48000", "channels": 2, "bit_rate": "N/A"}
            ],
            "format": {"duration": "12.0", "size": "1000", "bit_rate": "800"}
        }"#;
        let meta = parse_ffprobe_json(Path::new("x.mkv"), json).unwrap();
        assert_eq!(meta.audio_track(0).unwrap().bit_rate, None);
    }

    #[test]
    fn test_garbled_stream_bit_rate_is_fatal() {
        let json = r#"{
            "streams": [
                {"index": 0, "codec_type": "audio", "sample_rate": "48000",
                 "channels": 2, "bit_rate": "fast"}
            ],
            "format": {"duration": "12.0", "size": "1000", "bit_rate": "800"}
        }"#;
        let err = parse_ffprobe_json(Path::new("x.mkv"), json).unwrap_err();
        assert!(matches!(err, Error::ParseError { .. }));
    }

    #[test]
    fn test_missing_bit_rate_is_fatal() {
        let json = r#"{"streams": [], "format": {"duration": "10.0", "size": "100"}}"#;
        let err = parse_ffprobe_json(Path::new("x.mp4"), json).unwrap_err();
        assert!(matches!(err, Error::MissingField { ref field } if field == "format.bit_rate"));
    }

    #[test]
    fn test_missing_duration_is_fatal() {
        let json = r#"{"streams": [], "format": {"size": "100", "bit_rate": "1000"}}"#;
        let err = parse_ffprobe_json(Path::new("x.mp4"), json).unwrap_err();
        assert!(matches!(err, Error::MissingField { ref field } if field == "format.duration"));
    }

    #[test]
    fn test_missing_format_is_fatal() {
        let err = parse_ffprobe_json(Path::new("x.mp4"), "{}").unwrap_err();
        assert!(matches!(err, Error::MissingField { .. }));
    }

    #[test]
    fn test_malformed_json() {
        let err = parse_ffprobe_json(Path::new("x.mp4"), "not json").unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_non_numeric_size() {
        let json = r#"{"format": {"duration": "1.0", "size": "big", "bit_rate": "1"}}"#;
        let err = parse_ffprobe_json(Path::new("x.mp4"), json).unwrap_err();
        assert!(matches!(err, Error::ParseError { .. }));
    }

    #[test]
    fn test_zero_duration_rejected() {
        let json = r#"{"format": {"duration": "0.0", "size": "1", "bit_rate": "1"}}"#;
        assert!(parse_ffprobe_json(Path::new("x.mp4"), json).is_err());
    }

    #[test]
    fn test_probe_missing_file() {
        let err = FfprobeProber::default()
            .probe(Path::new("/nonexistent/clip.mp4"))
            .unwrap_err();
        assert!(matches!(err, Error::FileNotFound { .. }));
    }
}
