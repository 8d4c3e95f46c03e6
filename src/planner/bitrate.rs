//! Video bit rate targeting.

use crate::error::{JobError, Result};
use vidmend_av::MediaMetadata;
use vidmend_common::{ValidatedEncode, BITS_PER_MEGABIT, BYTES_PER_MEGABYTE};

/// Bit rate of every retained audio stream, in bits per second.
pub const AUDIO_BIT_RATE: u64 = 128_000;

/// `-maxrate` is capped at this multiple of the target rate.
const MAXRATE_MULTIPLIER: f64 = 2.0;

/// Rate control triple passed to the encoder, in bits per second.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateControl {
    pub bit_rate: f64,
    pub max_rate: f64,
    pub buf_size: f64,
}

impl RateControl {
    /// Derive the video bit rate for an encode of a probed file.
    ///
    /// A size target takes precedence: the audio budget is subtracted from
    /// the size in bits and the remainder is spread over the duration. A bit
    /// rate target, when also present, acts as a ceiling.
    ///
    /// # Errors
    ///
    /// [`JobError::Config`] when the size target leaves no room for video, or
    /// when neither target is set.
    pub fn compute(encode: &ValidatedEncode, metadata: &MediaMetadata) -> Result<Self> {
        let bit_rate = match (encode.target_size, encode.target_bit_rate) {
            (Some(size), ceiling) => {
                let from_size = size_to_bit_rate(size, metadata.duration_secs)?;
                match ceiling {
                    Some(ceiling) if (ceiling as f64) < from_size => ceiling as f64,
                    _ => from_size,
                }
            }
            (None, Some(rate)) => rate as f64,
            (None, None) => {
                return Err(JobError::config(
                    "encode settings have neither a size nor a bit rate target",
                ))
            }
        };

        Ok(Self {
            bit_rate,
            max_rate: (bit_rate * MAXRATE_MULTIPLIER).min(metadata.bit_rate as f64),
            buf_size: bit_rate,
        })
    }

    /// `-b:v`, `-maxrate` and `-bufsize` arguments.
    pub fn args(&self) -> Vec<String> {
        vec![
            "-b:v".to_string(),
            megabits(self.bit_rate),
            "-maxrate".to_string(),
            megabits(self.max_rate),
            "-bufsize".to_string(),
            megabits(self.buf_size),
        ]
    }
}

fn size_to_bit_rate(size_bytes: u64, duration_secs: f64) -> Result<f64> {
    if !(duration_secs > 0.0) {
        return Err(JobError::config(format!(
            "cannot target a size for a file of duration {duration_secs}s"
        )));
    }
    let video_bits = size_bytes as f64 * 8.0 - AUDIO_BIT_RATE as f64 * duration_secs;
    let bit_rate = video_bits / duration_secs;
    if bit_rate <= 0.0 {
        return Err(JobError::config(format!(
            "target size of {:.2} MB is too small for {:.1}s of video",
            size_bytes as f64 / BYTES_PER_MEGABYTE as f64,
            duration_secs
        )));
    }
    Ok(bit_rate)
}

/// Format bits per second the way ffmpeg reads an `M` suffix.
pub fn megabits(bits_per_sec: f64) -> String {
    format!("{:.2}M", bits_per_sec / BITS_PER_MEGABIT)
}
