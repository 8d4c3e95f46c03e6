//! Media file probing.
//!
//! The [`Prober`] trait is the seam between job execution and the tool that
//! reads container metadata. [`FfprobeProber`] is the production backend.

mod ffprobe;
mod types;

pub use ffprobe::{parse_ffprobe_json, FfprobeProber};
pub use types::*;

use crate::Result;
use std::path::Path;

/// A media file prober capable of extracting container and audio metadata.
///
/// Implementations must be safe to share across worker threads.
pub trait Prober: Send + Sync {
    /// Human-readable name identifying this prober implementation.
    fn name(&self) -> &'static str;

    /// Probe a media file at the given path.
    fn probe(&self, path: &Path) -> Result<MediaMetadata>;
}
