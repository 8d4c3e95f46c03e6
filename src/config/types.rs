use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use vidmend_av::{NoiseGateParams, ToolPaths};
use vidmend_common::{AudioSpec, EncodeSpec, Job};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub batch: BatchConfig,

    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub planner: PlannerConfig,

    #[serde(default)]
    pub denoise: NoiseGateParams,

    #[serde(default)]
    pub jobs: Vec<JobEntry>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BatchConfig {
    /// Worker threads; defaults to the number of CPUs.
    #[serde(default)]
    pub workers: Option<usize>,

    /// Only pick up files with a known video extension when expanding a
    /// directory.
    #[serde(default)]
    pub video_only: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    #[serde(default)]
    pub ffprobe_path: Option<PathBuf>,

    /// Kill any single tool invocation running longer than this.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PlannerConfig {
    /// Warn instead of failing on encoder combinations known to break.
    #[serde(default)]
    pub allow_unsupported: bool,
}

/// One `[[jobs]]` entry.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct JobEntry {
    /// A video file, or a directory whose files are each converted.
    pub input: PathBuf,

    pub output_dir: PathBuf,

    #[serde(default)]
    pub debug: bool,

    #[serde(default = "AudioSpec::default_main")]
    pub main_audio: AudioSpec,

    #[serde(default = "AudioSpec::default_mic")]
    pub mic_audio: AudioSpec,

    #[serde(default)]
    pub encode: Option<EncodeSpec>,
}

impl JobEntry {
    pub fn to_job(&self) -> vidmend_common::Result<Job> {
        Job::builder(&self.input, &self.output_dir)
            .debug(self.debug)
            .main_audio(self.main_audio.clone())
            .mic_audio(self.mic_audio.clone())
            .maybe_encode(self.encode.clone())
            .build()
    }
}

impl Config {
    pub fn tool_paths(&self) -> ToolPaths {
        ToolPaths::discover(
            self.tools.ffmpeg_path.as_deref(),
            self.tools.ffprobe_path.as_deref(),
        )
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.tools.timeout_secs.map(Duration::from_secs)
    }

    /// Worker count: configured value or the number of CPUs.
    pub fn workers(&self) -> usize {
        self.batch.workers.unwrap_or_else(num_cpus::get).max(1)
    }
}
