//! Settings validation errors.
//!
//! Every variant describes a job that must be rejected before any external
//! process is spawned.

/// Error raised while constructing or validating job settings.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// The main audio track was given denoise or amplify options.
    #[error("cannot remove noise or amplify the main audio track")]
    MainAudioProcessing,

    /// Main and mic audio point at the same track.
    #[error("main and mic audio tracks cannot be the same (track {0})")]
    SameTrack(usize),

    /// Encode settings are missing a device or speed.
    #[error("encode settings must include a device and a speed")]
    MissingDeviceOrSpeed,

    /// Encode settings have neither a bit rate nor a size target.
    #[error("encode settings must include target_bit_rate and/or target_size")]
    MissingTarget,

    /// A numeric setting must be strictly positive.
    #[error("{field} must be greater than 0 (got {value})")]
    NotPositive { field: &'static str, value: f64 },

    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Create a new NotPositive error.
    pub fn not_positive(field: &'static str, value: f64) -> Self {
        Self::NotPositive { field, value }
    }

    /// Create a new InvalidInput error.
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }
}

/// Result type alias using the settings Error type.
pub type Result<T> = std::result::Result<T, Error>;
