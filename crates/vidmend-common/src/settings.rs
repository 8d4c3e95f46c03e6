//! Per-file job settings.
//!
//! A [`Job`] is an immutable value built once per input file. Directory
//! expansion creates fresh values with [`Job::with_input`]; nothing is shared
//! between jobs.
//!
//! Units: bit rates are given in megabits per second (1 Mbps = 1 000 000
//! bits/s, the meaning of ffmpeg's `M` suffix) and sizes in megabytes
//! (1 MB = 1 048 576 bytes). [`EncodeSpec::validate`] converts both to base
//! units so nothing downstream multiplies by a unit constant again.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{Device, Error, Result, Speed, VideoFormat};

/// Bits in one megabit.
pub const BITS_PER_MEGABIT: f64 = 1_000_000.0;

/// Bytes in one megabyte.
pub const BYTES_PER_MEGABYTE: u64 = 1024 * 1024;

/// Settings for one audio track of the input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioSpec {
    /// Audio-relative stream index (0 = first audio stream).
    pub track: usize,
    /// Gain in decibels applied after noise reduction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amplify_db: Option<f64>,
    /// WAV file holding a sample of the background noise to remove.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub noise_reference: Option<PathBuf>,
    /// Drop this track from the output.
    #[serde(default)]
    pub remove: bool,
}

impl AudioSpec {
    /// Spec for the given track with no processing.
    pub fn track(track: usize) -> Self {
        Self {
            track,
            amplify_db: None,
            noise_reference: None,
            remove: false,
        }
    }

    /// Default main track: the first audio stream.
    pub fn default_main() -> Self {
        Self::track(0)
    }

    /// Default mic track: the second audio stream.
    pub fn default_mic() -> Self {
        Self::track(1)
    }

    pub fn with_amplify(mut self, db: f64) -> Self {
        self.amplify_db = Some(db);
        self
    }

    pub fn with_noise_reference(mut self, path: impl Into<PathBuf>) -> Self {
        self.noise_reference = Some(path.into());
        self
    }

    pub fn removed(mut self) -> Self {
        self.remove = true;
        self
    }

    /// Whether any sample processing was requested for this track.
    pub fn is_processed(&self) -> bool {
        self.amplify_db.is_some() || self.noise_reference.is_some()
    }
}

/// Declarative encode settings as written by the user.
///
/// Use [`EncodeSpec::validate`] to turn it into a [`ValidatedEncode`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EncodeSpec {
    #[serde(default)]
    pub device: Option<Device>,
    /// Defaults to H.264 when absent.
    #[serde(default)]
    pub format: Option<VideoFormat>,
    #[serde(default)]
    pub speed: Option<Speed>,
    /// Ceiling on the video bit rate, in Mbps.
    #[serde(default)]
    pub target_bit_rate: Option<f64>,
    /// Desired output size, in MB.
    #[serde(default)]
    pub target_size: Option<f64>,
}

impl EncodeSpec {
    pub fn new(device: Device, speed: Speed) -> Self {
        Self {
            device: Some(device),
            speed: Some(speed),
            ..Self::default()
        }
    }

    pub fn with_format(mut self, format: VideoFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_bit_rate(mut self, mbps: f64) -> Self {
        self.target_bit_rate = Some(mbps);
        self
    }

    pub fn with_size(mut self, megabytes: f64) -> Self {
        self.target_size = Some(megabytes);
        self
    }

    /// Check the invariants and normalize units.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingDeviceOrSpeed`] if either is unset.
    /// - [`Error::MissingTarget`] if neither target is set.
    /// - [`Error::NotPositive`] if a target is not positive, or rounds to zero
    ///   bits per second or bytes.
    pub fn validate(&self) -> Result<ValidatedEncode> {
        let (Some(device), Some(speed)) = (self.device, self.speed) else {
            return Err(Error::MissingDeviceOrSpeed);
        };
        if self.target_bit_rate.is_none() && self.target_size.is_none() {
            return Err(Error::MissingTarget);
        }

        let target_bit_rate = self
            .target_bit_rate
            .map(|mbps| normalize("target_bit_rate", mbps, BITS_PER_MEGABIT))
            .transpose()?;
        let target_size = self
            .target_size
            .map(|mb| normalize("target_size", mb, BYTES_PER_MEGABYTE as f64))
            .transpose()?;

        Ok(ValidatedEncode {
            device,
            format: self.format.unwrap_or_default(),
            speed,
            target_bit_rate,
            target_size,
        })
    }
}

/// Scale `value` to base units, rejecting anything that is not at least one
/// whole unit after rounding.
fn normalize(field: &'static str, value: f64, scale: f64) -> Result<u64> {
    if !(value > 0.0 && value.is_finite()) {
        return Err(Error::not_positive(field, value));
    }
    match (value * scale).round() as u64 {
        0 => Err(Error::not_positive(field, value)),
        units => Ok(units),
    }
}

/// Encode settings after validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValidatedEncode {
    pub device: Device,
    pub format: VideoFormat,
    pub speed: Speed,
    /// Bit rate ceiling in bits per second.
    pub target_bit_rate: Option<u64>,
    /// Target output size in bytes.
    pub target_size: Option<u64>,
}

impl ValidatedEncode {
    /// Two-pass encoding is used for slow software encodes only.
    pub fn is_two_pass(&self) -> bool {
        self.device == Device::Cpu && self.speed == Speed::Slow
    }
}

/// Identity used to deduplicate jobs: settings are deliberately ignored.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobKey {
    pub input_path: PathBuf,
    pub output_dir: PathBuf,
}

/// A single file conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    input_path: PathBuf,
    output_dir: PathBuf,
    debug: bool,
    main_audio: AudioSpec,
    mic_audio: AudioSpec,
    encode: Option<ValidatedEncode>,
}

impl Job {
    /// Start building a job for `input` writing into `output_dir`.
    pub fn builder(input: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> JobBuilder {
        JobBuilder {
            input_path: input.into(),
            output_dir: output_dir.into(),
            debug: false,
            main_audio: AudioSpec::default_main(),
            mic_audio: AudioSpec::default_mic(),
            encode: None,
        }
    }

    /// A copy of this job pointed at a different input file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `input` has no file name.
    pub fn with_input(&self, input: impl Into<PathBuf>) -> Result<Self> {
        let input_path = input.into();
        require_file_name(&input_path)?;
        Ok(Self {
            input_path,
            ..self.clone()
        })
    }

    pub fn input_path(&self) -> &Path {
        &self.input_path
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn main_audio(&self) -> &AudioSpec {
        &self.main_audio
    }

    pub fn mic_audio(&self) -> &AudioSpec {
        &self.mic_audio
    }

    pub fn encode(&self) -> Option<&ValidatedEncode> {
        self.encode.as_ref()
    }

    /// Converted file location: the input file name inside the output directory.
    pub fn output_path(&self) -> PathBuf {
        match self.input_path.file_name() {
            Some(name) => self.output_dir.join(name),
            None => self.output_dir.clone(),
        }
    }

    /// File stem used to derive temp artifact names.
    pub fn stem(&self) -> String {
        self.input_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    pub fn key(&self) -> JobKey {
        JobKey {
            input_path: self.input_path.clone(),
            output_dir: self.output_dir.clone(),
        }
    }
}

/// Builder for [`Job`]; all invariants are checked in [`JobBuilder::build`].
#[derive(Debug, Clone)]
pub struct JobBuilder {
    input_path: PathBuf,
    output_dir: PathBuf,
    debug: bool,
    main_audio: AudioSpec,
    mic_audio: AudioSpec,
    encode: Option<EncodeSpec>,
}

impl JobBuilder {
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn main_audio(mut self, spec: AudioSpec) -> Self {
        self.main_audio = spec;
        self
    }

    pub fn mic_audio(mut self, spec: AudioSpec) -> Self {
        self.mic_audio = spec;
        self
    }

    pub fn encode(mut self, spec: EncodeSpec) -> Self {
        self.encode = Some(spec);
        self
    }

    pub fn maybe_encode(mut self, spec: Option<EncodeSpec>) -> Self {
        self.encode = spec;
        self
    }

    /// Validate and build the job.
    ///
    /// # Errors
    ///
    /// - [`Error::MainAudioProcessing`] if the main track asks for denoise or gain.
    /// - [`Error::SameTrack`] if main and mic share a track index.
    /// - Any [`EncodeSpec::validate`] error.
    /// - [`Error::InvalidInput`] if the input has no file name.
    pub fn build(self) -> Result<Job> {
        if self.main_audio.is_processed() {
            return Err(Error::MainAudioProcessing);
        }
        if self.main_audio.track == self.mic_audio.track {
            return Err(Error::SameTrack(self.main_audio.track));
        }
        require_file_name(&self.input_path)?;

        let encode = self.encode.as_ref().map(EncodeSpec::validate).transpose()?;

        Ok(Job {
            input_path: self.input_path,
            output_dir: self.output_dir,
            debug: self.debug,
            main_audio: self.main_audio,
            mic_audio: self.mic_audio,
            encode,
        })
    }
}

fn require_file_name(path: &Path) -> Result<()> {
    if path.file_name().is_none() {
        return Err(Error::invalid_input(format!(
            "input path has no file name: {}",
            path.display()
        )));
    }
    Ok(())
}
