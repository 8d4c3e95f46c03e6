//! Stationary noise reduction.

use super::{denormalize, normalize, Samples};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Noise reduction against a reference recording of the background noise.
///
/// Implementations must return a buffer with the same sample rate, channel
/// count and length as `signal`.
pub trait Denoiser: Send + Sync {
    fn reduce(&self, signal: &Samples, noise: &Samples) -> Result<Samples>;
}

/// Tuning for [`StationaryNoiseGate`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseGateParams {
    /// Analysis frame length in milliseconds.
    pub frame_ms: u32,
    /// Standard deviations above the mean noise frame level that a frame
    /// must exceed to be treated as signal.
    pub n_std: f64,
    /// Strongest attenuation applied, in dB (negative).
    pub floor_db: f64,
}

impl Default for NoiseGateParams {
    fn default() -> Self {
        Self {
            frame_ms: 20,
            n_std: 1.5,
            floor_db: -30.0,
        }
    }
}

/// Time-domain gate driven by a stationary noise profile.
///
/// The reference is cut into frames and its frame RMS levels give a threshold
/// of `mean + n_std * std`. Each signal frame above the threshold is scaled by
/// `sqrt(1 - P_noise / P_frame)`; frames at or below it drop to the floor.
/// Gains are interpolated linearly between frame centers so that level
/// changes do not click.
#[derive(Debug, Clone, Default)]
pub struct StationaryNoiseGate {
    params: NoiseGateParams,
}

impl StationaryNoiseGate {
    pub fn new(params: NoiseGateParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &NoiseGateParams {
        &self.params
    }

    fn frame_len(&self, sample_rate: u32) -> usize {
        let len = u64::from(sample_rate) * u64::from(self.params.frame_ms) / 1000;
        (len as usize).max(1)
    }

    fn floor_gain(&self) -> f64 {
        10f64.powf(self.params.floor_db.min(0.0) / 20.0)
    }
}

struct NoiseProfile {
    threshold: f64,
    power: f64,
}

impl StationaryNoiseGate {
    fn profile(&self, noise: &Samples) -> Result<NoiseProfile> {
        let mono = noise.to_mono_f64();
        if mono.is_empty() {
            return Err(Error::InvalidInput(
                "noise reference contains no samples".to_string(),
            ));
        }

        let levels: Vec<f64> = mono
            .chunks(self.frame_len(noise.sample_rate))
            .map(|frame| mean_square(frame.iter().copied()).sqrt())
            .collect();
        let mean = levels.iter().sum::<f64>() / levels.len() as f64;
        let variance =
            levels.iter().map(|l| (l - mean).powi(2)).sum::<f64>() / levels.len() as f64;

        Ok(NoiseProfile {
            threshold: mean + self.params.n_std * variance.sqrt(),
            power: mean_square(mono.iter().copied()),
        })
    }

    fn frame_gains(&self, channel: &[f64], frame_len: usize, profile: &NoiseProfile) -> Vec<f64> {
        let floor = self.floor_gain();
        channel
            .chunks(frame_len)
            .map(|frame| {
                let power = mean_square(frame.iter().copied());
                if power.sqrt() <= profile.threshold {
                    floor
                } else {
                    (1.0 - profile.power / power).max(0.0).sqrt().max(floor)
                }
            })
            .collect()
    }
}

impl Denoiser for StationaryNoiseGate {
    fn reduce(&self, signal: &Samples, noise: &Samples) -> Result<Samples> {
        let profile = self.profile(noise)?;
        let channels = usize::from(signal.channels.max(1));
        let frame_len = self.frame_len(signal.sample_rate);
        let mut data = signal.data.clone();

        for ch in 0..channels {
            let channel: Vec<f64> = signal
                .data
                .iter()
                .skip(ch)
                .step_by(channels)
                .map(|&s| normalize(s))
                .collect();
            if channel.is_empty() {
                continue;
            }
            let gains = self.frame_gains(&channel, frame_len, &profile);

            for (i, value) in channel.iter().enumerate() {
                let gain = interpolate(&gains, frame_len, i);
                data[i * channels + ch] = denormalize(value * gain);
            }
        }

        Ok(Samples::new(signal.sample_rate, signal.channels, data))
    }
}

fn mean_square(values: impl ExactSizeIterator<Item = f64>) -> f64 {
    let n = values.len();
    if n == 0 {
        return 0.0;
    }
    values.map(|v| v * v).sum::<f64>() / n as f64
}

/// Gain at sample `i`, blending the two frames whose centers surround it.
fn interpolate(gains: &[f64], frame_len: usize, i: usize) -> f64 {
    let center = |f: usize| f as f64 * frame_len as f64 + (frame_len as f64 - 1.0) / 2.0;
    let pos = i as f64;
    let last = gains.len() - 1;

    if pos <= center(0) {
        return gains[0];
    }
    if pos >= center(last) {
        return gains[last];
    }
    let f = ((pos - center(0)) / frame_len as f64).floor() as usize;
    let f = f.min(last - 1);
    let t = (pos - center(f)) / frame_len as f64;
    gains[f] + (gains[f + 1] - gains[f]) * t
}
