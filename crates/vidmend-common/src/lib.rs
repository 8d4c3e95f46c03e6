//! Vidmend-Common: job settings and shared helpers.
//!
//! This crate provides the value types every other vidmend crate passes around:
//!
//! - **Encoder enums**: [`Device`], [`VideoFormat`], [`Speed`]
//! - **Settings**: [`Job`], [`AudioSpec`], [`EncodeSpec`] and the validated
//!   [`ValidatedEncode`] with normalized units
//! - **Path Utilities**: video extension checks and temp artifact naming
//! - **Error Handling**: settings validation errors and a result alias
//!
//! # Examples
//!
//! ```
//! use vidmend_common::{AudioSpec, Device, EncodeSpec, Job, Speed};
//!
//! let job = Job::builder("/videos/clip.mp4", "/videos/out")
//!     .mic_audio(AudioSpec::track(1).with_amplify(10.0))
//!     .encode(EncodeSpec::new(Device::Gpu, Speed::Fast).with_bit_rate(10.0))
//!     .build()?;
//!
//! assert_eq!(job.mic_audio().track, 1);
//! assert_eq!(job.encode().unwrap().target_bit_rate, Some(10_000_000));
//! # Ok::<(), vidmend_common::Error>(())
//! ```

pub mod error;
pub mod paths;
pub mod settings;
pub mod types;

pub use error::{Error, Result};
pub use settings::*;
pub use types::*;
