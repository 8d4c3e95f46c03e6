//! Mic track repair.
//!
//! A mic track is pulled out of the container as 16-bit PCM, optionally
//! denoised against a reference recording of the room noise, amplified, and
//! written back out as a WAV file that the encoder merges into the output.
//!
//! - [`Samples`] holds interleaved PCM in memory.
//! - [`amplify`] applies gain in decibels.
//! - [`Denoiser`] is the noise-reduction seam; [`StationaryNoiseGate`] is the
//!   built-in implementation.
//! - [`AudioTrack`] sequences extraction and processing for one track.

mod denoise;
mod track;

pub use denoise::{Denoiser, NoiseGateParams, StationaryNoiseGate};
pub use track::{AudioTrack, FfmpegTrackSource, TrackSource};

use crate::{Error, Result};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::path::Path;

/// Interleaved signed 16-bit PCM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Samples {
    pub sample_rate: u32,
    pub channels: u16,
    pub data: Vec<i16>,
}

impl Samples {
    pub fn new(sample_rate: u32, channels: u16, data: Vec<i16>) -> Self {
        Self {
            sample_rate,
            channels,
            data,
        }
    }

    /// Decode raw little-endian `s16le` bytes as produced by `ffmpeg -f s16le`.
    pub fn from_s16le(bytes: &[u8], sample_rate: u32, channels: u16) -> Self {
        let data = bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        Self::new(sample_rate, channels, data)
    }

    /// Read a WAV file, converting integer or float samples to 16-bit.
    pub fn read_wav(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::file_not_found(path));
        }
        let mut reader = WavReader::open(path)?;
        let spec = reader.spec();

        let data: Vec<i16> = match (spec.sample_format, spec.bits_per_sample) {
            (SampleFormat::Int, 16) => reader
                .samples::<i16>()
                .collect::<std::result::Result<_, _>>()?,
            (SampleFormat::Int, bits) => {
                let shift = i32::from(bits) - 16;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| rescale_int(v, shift)))
                    .collect::<std::result::Result<_, _>>()?
            }
            (SampleFormat::Float, _) => reader
                .samples::<f32>()
                .map(|s| s.map(|v| (v.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16))
                .collect::<std::result::Result<_, _>>()?,
        };

        Ok(Self::new(spec.sample_rate, spec.channels, data))
    }

    /// Write 16-bit PCM WAV.
    pub fn write_wav(&self, path: &Path) -> Result<()> {
        let spec = WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(path, spec)?;
        for &sample in &self.data {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
        Ok(())
    }

    /// Number of sample frames (samples per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.data.len() / usize::from(self.channels)
        }
    }

    /// Average of all channels, normalized to [-1.0, 1.0].
    pub fn to_mono_f64(&self) -> Vec<f64> {
        let channels = usize::from(self.channels.max(1));
        self.data
            .chunks(channels)
            .map(|frame| {
                frame.iter().map(|&s| normalize(s)).sum::<f64>() / frame.len() as f64
            })
            .collect()
    }
}

fn rescale_int(value: i32, shift: i32) -> i16 {
    let scaled = if shift >= 0 {
        value >> shift
    } else {
        value << -shift
    };
    scaled.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
}

pub(crate) fn normalize(sample: i16) -> f64 {
    f64::from(sample) / 32768.0
}

pub(crate) fn denormalize(value: f64) -> i16 {
    (value * 32768.0)
        .round()
        .clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16
}

/// Apply `gain_db` decibels of gain, saturating at the 16-bit range.
///
/// A gain of exactly 0 dB leaves the samples untouched.
pub fn amplify(samples: &mut Samples, gain_db: f64) {
    if gain_db == 0.0 {
        return;
    }
    let factor = 10f64.powf(gain_db / 20.0);
    for sample in &mut samples.data {
        *sample = (f64::from(*sample) * factor)
            .round()
            .clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16;
    }
}
