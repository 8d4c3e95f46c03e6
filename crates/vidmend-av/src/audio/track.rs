//! Extraction and processing of a single audio track.

use super::{amplify, Denoiser, Samples};
use crate::command::ToolCommand;
use crate::probe::{AudioStream, MediaMetadata};
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Source of decoded PCM for one audio stream of a container.
pub trait TrackSource: Send + Sync {
    fn extract(&self, video: &Path, stream: &AudioStream) -> Result<Samples>;
}

/// [`TrackSource`] that decodes through ffmpeg into raw `s16le` on stdout.
#[derive(Debug, Clone)]
pub struct FfmpegTrackSource {
    program: PathBuf,
    timeout: Option<Duration>,
}

impl FfmpegTrackSource {
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

    fn command(&self, video: &Path, stream: &AudioStream) -> ToolCommand {
        let mut cmd = ToolCommand::new(&self.program);
        cmd.args(["-v", "error", "-i"])
            .arg(video.to_string_lossy())
            .arg("-map")
            .arg(format!("0:a:{}", stream.index))
            .arg("-ar")
            .arg(stream.sample_rate.to_string())
            .arg("-ac")
            .arg(stream.channels.to_string())
            .args(["-c:a", "pcm_s16le", "-f", "s16le", "pipe:1"])
            .maybe_timeout(self.timeout);
        cmd
    }
}

impl Default for FfmpegTrackSource {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl TrackSource for FfmpegTrackSource {
    fn extract(&self, video: &Path, stream: &AudioStream) -> Result<Samples> {
        let cmd = self.command(video, stream);
        tracing::debug!("Extracting audio track {}: {}", stream.index, cmd.command_line());

        let bytes = cmd.capture()?;
        if bytes.is_empty() {
            return Err(Error::audio_track(stream.index, "no samples decoded"));
        }
        Ok(Samples::from_s16le(&bytes, stream.sample_rate, stream.channels))
    }
}

/// One audio track of a video, extracted on first use.
///
/// Processing order is enforced: noise reduction must happen before any gain
/// is applied, since the noise profile is measured at the original level.
pub struct AudioTrack<'a> {
    source: &'a dyn TrackSource,
    video: PathBuf,
    stream: AudioStream,
    samples: Option<Samples>,
    amplified: bool,
}

impl<'a> AudioTrack<'a> {
    pub fn new(source: &'a dyn TrackSource, video: impl Into<PathBuf>, stream: AudioStream) -> Self {
        Self {
            source,
            video: video.into(),
            stream,
            samples: None,
            amplified: false,
        }
    }

    /// Select audio track `track` of a probed file.
    ///
    /// # Errors
    ///
    /// [`Error::AudioTrack`] when the file has no such track.
    pub fn from_metadata(
        source: &'a dyn TrackSource,
        metadata: &MediaMetadata,
        track: usize,
    ) -> Result<Self> {
        let stream = metadata.audio_track(track).cloned().ok_or_else(|| {
            Error::audio_track(
                track,
                format!(
                    "{} has {} audio track(s)",
                    metadata.path.display(),
                    metadata.audio_track_count()
                ),
            )
        })?;
        Ok(Self::new(source, &metadata.path, stream))
    }

    /// Audio-relative index of this track.
    pub fn track(&self) -> usize {
        self.stream.index
    }

    pub fn samples(&self) -> Option<&Samples> {
        self.samples.as_ref()
    }

    /// Decode the track. Returns `false` without doing anything when the
    /// track was already extracted.
    pub fn extract(&mut self) -> Result<bool> {
        if self.samples.is_some() {
            tracing::warn!(
                "Audio track {} of {} already extracted",
                self.stream.index,
                self.video.display()
            );
            return Ok(false);
        }
        let samples = self.source.extract(&self.video, &self.stream)?;
        tracing::debug!(
            "Extracted {} frames from audio track {}",
            samples.frames(),
            self.stream.index
        );
        self.samples = Some(samples);
        Ok(true)
    }

    fn loaded(&mut self) -> Result<&mut Samples> {
        if self.samples.is_none() {
            self.extract()?;
        }
        self.samples
            .as_mut()
            .ok_or_else(|| Error::audio_track(self.stream.index, "extraction produced no data"))
    }

    /// Denoise against a WAV recording of the background noise.
    pub fn reduce_noise(&mut self, denoiser: &dyn Denoiser, reference: &Path) -> Result<()> {
        if self.amplified {
            return Err(Error::InvalidInput(
                "noise reduction must run before amplification".to_string(),
            ));
        }
        let noise = Samples::read_wav(reference)?;
        let signal = self.loaded()?;
        let reduced = denoiser.reduce(signal, &noise)?;
        *signal = reduced;
        Ok(())
    }

    /// Apply `gain_db` decibels of gain.
    pub fn amplify(&mut self, gain_db: f64) -> Result<()> {
        amplify(self.loaded()?, gain_db);
        self.amplified = true;
        Ok(())
    }

    /// Write the track as a 16-bit WAV file.
    pub fn export(&mut self, path: &Path) -> Result<()> {
        self.loaded()?.write_wav(path)
    }
}
