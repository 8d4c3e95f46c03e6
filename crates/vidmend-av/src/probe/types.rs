//! Media metadata types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Container and audio stream metadata for one file.
///
/// Every numeric field drives bitrate math, so none of them is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaMetadata {
    /// Path to the media file.
    pub path: PathBuf,
    /// Duration in seconds.
    pub duration_secs: f64,
    /// File size in bytes.
    pub size: u64,
    /// Overall container bit rate in bits per second.
    pub bit_rate: u64,
    /// Audio streams in container order.
    pub audio_tracks: Vec<AudioStream>,
}

/// One audio stream of a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioStream {
    /// Position among the audio streams (0-based); what job settings call a track.
    pub index: usize,
    /// Stream index within the whole container.
    pub stream_index: u32,
    /// Codec name, e.g. "aac".
    pub codec: Option<String>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Number of channels.
    pub channels: u16,
    /// Stream bit rate in bits per second, when the container reports one.
    pub bit_rate: Option<u64>,
}

impl MediaMetadata {
    pub fn audio_track_count(&self) -> usize {
        self.audio_tracks.len()
    }

    /// Look up an audio stream by its audio-relative index.
    pub fn audio_track(&self, track: usize) -> Option<&AudioStream> {
        self.audio_tracks.get(track)
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.duration_secs)
    }
}
