//! Job error taxonomy.
//!
//! [`JobError::Config`] and [`JobError::UnsupportedCombination`] reject a job
//! before any process is spawned. The remaining variants abort only the job
//! that raised them; the batch carries on.

use std::fmt;
use std::path::PathBuf;

/// Which ffmpeg invocation of a job failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeStage {
    PrePass,
    MainPass,
}

impl fmt::Display for EncodeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeStage::PrePass => write!(f, "first pass"),
            EncodeStage::MainPass => write!(f, "encode"),
        }
    }
}

/// Errors that end a single job.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    /// Invalid or missing settings.
    #[error("configuration error: {0}")]
    Config(String),

    /// Metadata could not be read.
    #[error("failed to probe {}: {source}", path.display())]
    Probe {
        path: PathBuf,
        source: vidmend_av::Error,
    },

    /// An audio track the job needs is missing or could not be processed.
    #[error("audio track {track}: {message}")]
    AudioExtraction { track: usize, message: String },

    /// ffmpeg exited non-zero, failed to start, timed out, or left no output.
    #[error("{stage} failed: {message}")]
    Encode { stage: EncodeStage, message: String },

    /// A device/format/speed combination the encoder is known to mishandle.
    #[error("unsupported encoder combination: {0}")]
    UnsupportedCombination(String),

    /// Filesystem failure outside of any external tool.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl JobError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn audio(track: usize, err: impl fmt::Display) -> Self {
        Self::AudioExtraction {
            track,
            message: err.to_string(),
        }
    }

    pub fn encode(stage: EncodeStage, err: impl fmt::Display) -> Self {
        Self::Encode {
            stage,
            message: err.to_string(),
        }
    }

    /// Whether the job was turned away before anything ran.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Config(_) | Self::UnsupportedCombination(_))
    }
}

impl From<vidmend_common::Error> for JobError {
    fn from(err: vidmend_common::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type alias for job operations.
pub type Result<T> = std::result::Result<T, JobError>;
