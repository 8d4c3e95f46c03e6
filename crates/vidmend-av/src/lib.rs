//! # vidmend-av
//!
//! Media access for vidmend: everything that touches ffprobe, ffmpeg or raw
//! audio samples.
//!
//! This crate provides functionality for:
//! - Probing containers for duration, size, bit rate and audio streams
//! - Locating the ffmpeg/ffprobe binaries
//! - Running tool invocations with an optional timeout
//! - Extracting, denoising, amplifying and exporting a mic track
//! - Tracking per-job intermediate files for cleanup
//!
//! ## Example
//!
//! ```no_run
//! use vidmend_av::{FfprobeProber, Prober};
//! use std::path::Path;
//!
//! let meta = FfprobeProber::default().probe(Path::new("/videos/clip.mp4"))?;
//! println!("{:.1}s, {} audio tracks", meta.duration_secs, meta.audio_track_count());
//! # Ok::<(), vidmend_av::Error>(())
//! ```

mod error;
pub mod audio;
pub mod command;
pub mod probe;
pub mod tools;
pub mod workspace;

// Re-exports
pub use audio::{
    amplify, AudioTrack, Denoiser, FfmpegTrackSource, NoiseGateParams, Samples,
    StationaryNoiseGate, TrackSource,
};
pub use command::ToolCommand;
pub use error::{Error, Result};
pub use probe::{AudioStream, FfprobeProber, MediaMetadata, Prober};
pub use tools::{check_tools, require_tool, ToolInfo, ToolPaths};
pub use workspace::{Artifact, Workspace};
