//! Running a single job end to end.
//!
//! A job goes through: output directory → probe → plan → mic repair →
//! first pass → main pass. Once a plan exists its temporary artifacts are
//! removed on every exit path. Steps run strictly in order on the calling
//! thread; the first failure ends the job.

use crate::config::Config;
use crate::error::{EncodeStage, JobError, Result};
use crate::planner::{CommandPlan, Invocation, MicFix, Planner};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use vidmend_av::{
    AudioTrack, Denoiser, FfmpegTrackSource, FfprobeProber, MediaMetadata, Prober,
    StationaryNoiseGate, TrackSource, Workspace,
};
use vidmend_common::{Job, BYTES_PER_MEGABYTE};

/// Runs planned tool invocations.
pub trait CommandExecutor: Send + Sync {
    /// Run `invocation` to completion. `visible` lets the tool write to the
    /// terminal.
    fn execute(&self, invocation: &Invocation, visible: bool) -> vidmend_av::Result<()>;
}

/// [`CommandExecutor`] spawning real processes.
#[derive(Debug, Clone, Default)]
pub struct ProcessExecutor {
    timeout: Option<Duration>,
}

impl ProcessExecutor {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

impl CommandExecutor for ProcessExecutor {
    fn execute(&self, invocation: &Invocation, visible: bool) -> vidmend_av::Result<()> {
        let mut cmd = invocation.to_command();
        cmd.maybe_timeout(self.timeout).visible(visible);
        if visible {
            info!("{}", cmd.command_line());
        } else {
            debug!("{}", cmd.command_line());
        }
        cmd.run()
    }
}

/// Outcome of a successful job.
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub input_size: u64,
    pub output_size: u64,
    pub elapsed: Duration,
    pub warnings: Vec<String>,
}

impl JobReport {
    /// `<name> Done: X MB -> Y MB`
    pub fn summary(&self) -> String {
        let name = self
            .input
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        format!(
            "{} Done: {:.0} MB -> {:.0} MB",
            name,
            self.input_size as f64 / BYTES_PER_MEGABYTE as f64,
            self.output_size as f64 / BYTES_PER_MEGABYTE as f64
        )
    }
}

/// Executes jobs with a fixed set of collaborators.
///
/// Collaborators are shared handles so a runner can serve every worker of a
/// batch.
#[derive(Clone)]
pub struct JobRunner {
    planner: Planner,
    prober: Arc<dyn Prober>,
    tracks: Arc<dyn TrackSource>,
    denoiser: Arc<dyn Denoiser>,
    executor: Arc<dyn CommandExecutor>,
}

impl JobRunner {
    /// Runner using ffprobe/ffmpeg from `PATH` and the default noise gate.
    pub fn new(planner: Planner) -> Self {
        Self {
            planner,
            prober: Arc::new(FfprobeProber::default()),
            tracks: Arc::new(FfmpegTrackSource::default()),
            denoiser: Arc::new(StationaryNoiseGate::default()),
            executor: Arc::new(ProcessExecutor::default()),
        }
    }

    /// Production wiring from configuration.
    pub fn from_config(config: &Config) -> Self {
        let tools = config.tool_paths();
        let timeout = config.timeout();
        let planner =
            Planner::new(&tools.ffmpeg).allow_unsupported(config.planner.allow_unsupported);

        Self::new(planner)
            .with_prober(Arc::new(
                FfprobeProber::new(&tools.ffprobe).with_timeout(timeout),
            ))
            .with_track_source(Arc::new(
                FfmpegTrackSource::new(&tools.ffmpeg).with_timeout(timeout),
            ))
            .with_denoiser(Arc::new(StationaryNoiseGate::new(config.denoise)))
            .with_executor(Arc::new(ProcessExecutor::new(timeout)))
    }

    pub fn with_prober(mut self, prober: Arc<dyn Prober>) -> Self {
        self.prober = prober;
        self
    }

    pub fn with_track_source(mut self, tracks: Arc<dyn TrackSource>) -> Self {
        self.tracks = tracks;
        self
    }

    pub fn with_denoiser(mut self, denoiser: Arc<dyn Denoiser>) -> Self {
        self.denoiser = denoiser;
        self
    }

    pub fn with_executor(mut self, executor: Arc<dyn CommandExecutor>) -> Self {
        self.executor = executor;
        self
    }

    pub fn planner(&self) -> &Planner {
        &self.planner
    }

    fn probe(&self, job: &Job) -> Result<MediaMetadata> {
        self.prober
            .probe(job.input_path())
            .map_err(|source| JobError::Probe {
                path: job.input_path().to_path_buf(),
                source,
            })
    }

    /// Probe and plan without executing anything.
    pub fn plan(&self, job: &Job) -> Result<CommandPlan> {
        let metadata = self.probe(job)?;
        self.planner.plan(job, &metadata)
    }

    /// Run a job to completion.
    pub fn run(&self, job: &Job) -> Result<JobReport> {
        let started = Instant::now();
        let mut workspace = Workspace::create(job.output_dir()).map_err(|e| JobError::Io {
            path: job.output_dir().to_path_buf(),
            source: match e {
                vidmend_av::Error::Io(e) => e,
                other => std::io::Error::other(other.to_string()),
            },
        })?;

        let metadata = self.probe(job)?;
        let plan = self.planner.plan(job, &metadata)?;
        workspace.register_all(plan.artifacts.iter().cloned());

        let result = self.execute(job, &metadata, &plan);
        let removed = workspace.cleanup();
        debug!(
            "Removed {} temporary file(s) for {}",
            removed,
            job.input_path().display()
        );
        result?;

        let output_size = std::fs::metadata(&plan.output_path)
            .map_err(|source| JobError::Io {
                path: plan.output_path.clone(),
                source,
            })?
            .len();

        Ok(JobReport {
            input: job.input_path().to_path_buf(),
            output: plan.output_path,
            input_size: metadata.size,
            output_size,
            elapsed: started.elapsed(),
            warnings: plan.warnings,
        })
    }

    fn execute(&self, job: &Job, metadata: &MediaMetadata, plan: &CommandPlan) -> Result<()> {
        for warning in &plan.warnings {
            warn!("{}: {}", job.input_path().display(), warning);
        }

        if let Some(fix) = &plan.mic_fix {
            self.repair_mic(metadata, fix)?;
        }

        if let Some(pre_pass) = &plan.pre_pass {
            info!("First pass for {}", job.input_path().display());
            self.executor
                .execute(pre_pass, job.debug())
                .map_err(|e| JobError::encode(EncodeStage::PrePass, e))?;
        }

        self.executor
            .execute(&plan.main_pass, job.debug())
            .map_err(|e| JobError::encode(EncodeStage::MainPass, e))?;

        if !plan.output_path.is_file() {
            return Err(JobError::encode(
                EncodeStage::MainPass,
                format!("{} was not created", plan.output_path.display()),
            ));
        }
        Ok(())
    }

    fn repair_mic(&self, metadata: &MediaMetadata, fix: &MicFix) -> Result<()> {
        let audio_err = |e: vidmend_av::Error| JobError::audio(fix.track, e);

        let mut track = AudioTrack::from_metadata(self.tracks.as_ref(), metadata, fix.track)
            .map_err(audio_err)?;
        if let Some(reference) = &fix.noise_reference {
            debug!("Reducing noise on track {} using {:?}", fix.track, reference);
            track
                .reduce_noise(self.denoiser.as_ref(), reference)
                .map_err(audio_err)?;
        }
        if let Some(gain_db) = fix.amplify_db {
            track.amplify(gain_db).map_err(audio_err)?;
        }
        track.export(&fix.wav_path).map_err(audio_err)
    }
}
