//! vidmend - batch video re-encoder with mic track repair
//!
//! The library drives ffmpeg for a list of jobs: each job's input is probed,
//! a command plan is synthesized, the mic track is optionally denoised and
//! amplified, and the video is copied or re-encoded at a target bit rate or
//! size. Jobs run in parallel on a fixed-size worker pool.
//!
//! The binary is a thin CLI over this crate; integration tests use it
//! directly with fake probers and executors.

pub mod batch;
pub mod config;
pub mod error;
pub mod planner;
pub mod runner;

pub use batch::{BatchOrchestrator, BatchReport, JobOutcome, WorkerPool};
pub use error::{EncodeStage, JobError, Result};
pub use planner::{AudioTopology, CommandPlan, Invocation, MicFix, Planner};
pub use runner::{CommandExecutor, JobReport, JobRunner, ProcessExecutor};
