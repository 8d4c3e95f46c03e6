//! ffmpeg command synthesis.
//!
//! [`Planner::plan`] turns a [`Job`] and the probed [`MediaMetadata`] of its
//! input into a [`CommandPlan`]: the mic repair to perform, an optional first
//! pass, the main encode, and every file the job will leave behind. Planning
//! spawns nothing, so a plan can be printed and inspected as is.
//!
//! Argument layout of the main pass:
//!
//! ```text
//! ffmpeg -hwaccel auto -i <input> [-i <mic.wav>] <audio options>
//!        -map 0:v -c:v <codec|copy> [-preset P <rate control>] [pass 2] -y <output>
//! ```

mod audio;
mod bitrate;
mod encoder;

pub use audio::AudioTopology;
pub use bitrate::{megabits, RateControl, AUDIO_BIT_RATE};
pub use encoder::{codec, preset, unsupported_reason, TwoPass};

use crate::error::{JobError, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use vidmend_av::{Artifact, MediaMetadata, ToolCommand};
use vidmend_common::{paths, Job};

/// One external program run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn to_command(&self) -> ToolCommand {
        let mut cmd = ToolCommand::new(&self.program);
        cmd.args(&self.args);
        cmd
    }

    pub fn command_line(&self) -> String {
        self.to_command().command_line()
    }
}

/// Repair of the mic track, written to `wav_path` before encoding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MicFix {
    pub track: usize,
    pub noise_reference: Option<PathBuf>,
    pub amplify_db: Option<f64>,
    pub wav_path: PathBuf,
}

/// Everything needed to run one job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandPlan {
    pub output_path: PathBuf,
    pub topology: AudioTopology,
    pub mic_fix: Option<MicFix>,
    /// First pass of a two-pass encode; must succeed before `main_pass` runs.
    pub pre_pass: Option<Invocation>,
    pub main_pass: Invocation,
    pub artifacts: Vec<Artifact>,
    pub warnings: Vec<String>,
}

impl CommandPlan {
    /// Invocations in execution order.
    pub fn invocations(&self) -> impl Iterator<Item = &Invocation> {
        self.pre_pass.iter().chain(std::iter::once(&self.main_pass))
    }

    /// Artifacts removed when the job finishes.
    pub fn temporary_artifacts(&self) -> impl Iterator<Item = &Artifact> {
        self.artifacts.iter().filter(|a| a.delete_on_completion)
    }
}

/// Builds [`CommandPlan`]s.
#[derive(Debug, Clone)]
pub struct Planner {
    ffmpeg: PathBuf,
    allow_unsupported: bool,
}

impl Default for Planner {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl Planner {
    pub fn new(ffmpeg: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            allow_unsupported: false,
        }
    }

    /// Downgrade known-broken encoder combinations from an error to a warning.
    pub fn allow_unsupported(mut self, allow: bool) -> Self {
        self.allow_unsupported = allow;
        self
    }

    /// Checks that need no metadata, run before a job is dispatched.
    ///
    /// Returns the warnings the job carries.
    ///
    /// # Errors
    ///
    /// - [`JobError::Config`] if the output would overwrite the input.
    /// - [`JobError::UnsupportedCombination`] for a known-broken encoder
    ///   setting, unless unsupported combinations are allowed.
    pub fn check(&self, job: &Job) -> Result<Vec<String>> {
        let mut warnings = Vec::new();

        let output = job.output_path();
        if same_file(&output, job.input_path()) {
            return Err(JobError::config(format!(
                "output {} would overwrite the input file",
                output.display()
            )));
        }

        if let Some(encode) = job.encode() {
            if let Some(reason) = unsupported_reason(encode) {
                let combo = format!("{}/{}/{}", encode.device, encode.format, encode.speed);
                if !self.allow_unsupported {
                    return Err(JobError::UnsupportedCombination(format!("{combo}: {reason}")));
                }
                warnings.push(format!("{combo}: {reason} (allowed by configuration)"));
            }
            if encode.is_two_pass() {
                warnings.push(
                    "cpu/slow runs a two-pass encode: the first pass doubles encode time \
                     and writes encoder stats to the output directory"
                        .to_string(),
                );
            }
        }

        let mic = job.mic_audio();
        if mic.remove && mic.is_processed() {
            warnings.push(
                "mic track is removed; its denoise and amplify settings are ignored".to_string(),
            );
        }

        Ok(warnings)
    }

    /// Plan a job against the probed metadata of its input.
    ///
    /// # Errors
    ///
    /// Everything [`Planner::check`] rejects, plus
    /// [`JobError::AudioExtraction`] for missing audio tracks and
    /// [`JobError::Config`] when a size target is unreachable.
    pub fn plan(&self, job: &Job, metadata: &MediaMetadata) -> Result<CommandPlan> {
        let mut warnings = self.check(job)?;
        let output_dir = job.output_dir();
        let output_path = job.output_path();
        let stem = job.stem();

        let mic_wav = paths::extracted_track_path(output_dir, &stem, job.mic_audio().track);
        let topology = AudioTopology::select(job, metadata, &mic_wav)?;

        let mic = job.mic_audio();
        let mic_fix = topology.mic().map(|(track, wav)| MicFix {
            track,
            noise_reference: mic.noise_reference.clone(),
            amplify_db: mic.amplify_db,
            wav_path: wav.to_path_buf(),
        });
        if mic_fix.is_none() && !mic.remove && mic.is_processed() {
            warnings.push(format!(
                "{} has {} audio track(s); mic settings are ignored",
                job.input_path().display(),
                metadata.audio_track_count()
            ));
        }

        let mut artifacts = Vec::new();
        if let Some(fix) = &mic_fix {
            artifacts.push(Artifact::temporary(&fix.wav_path));
        }

        let mut video = vec!["-map".to_string(), "0:v".to_string(), "-c:v".to_string()];
        let mut two_pass = None;
        match job.encode() {
            None => video.push("copy".to_string()),
            Some(encode) => {
                let codec = codec(encode.device, encode.format);
                let rate = RateControl::compute(encode, metadata)?;
                if rate.bit_rate > metadata.bit_rate as f64 {
                    warnings.push(format!(
                        "target video bit rate {} exceeds the source's {}",
                        megabits(rate.bit_rate),
                        megabits(metadata.bit_rate as f64)
                    ));
                }

                video.extend([
                    codec.to_string(),
                    "-preset".to_string(),
                    preset(encode.device, encode.speed).to_string(),
                ]);
                video.extend(rate.args());

                if encode.is_two_pass() {
                    two_pass =
                        TwoPass::for_codec(codec, &paths::two_pass_log_prefix(output_dir, &stem));
                }
            }
        }

        let input = job.input_path().to_string_lossy().to_string();
        let decode = ["-hwaccel", "auto", "-i"]
            .into_iter()
            .map(String::from)
            .chain(std::iter::once(input));

        let pre_pass = two_pass.as_ref().map(|tp| {
            let args = decode
                .clone()
                .chain(video.iter().cloned())
                .chain(tp.args(1))
                .chain(["-an", "-f", "null", "-"].map(String::from))
                .collect();
            Invocation {
                program: self.ffmpeg.clone(),
                args,
            }
        });
        if let Some(tp) = &two_pass {
            artifacts.extend(tp.artifacts());
        }

        let main_args = decode
            .chain(topology.input_args())
            .chain(topology.output_args())
            .chain(video)
            .chain(two_pass.iter().flat_map(|tp| tp.args(2)))
            .chain(["-y".to_string(), output_path.to_string_lossy().to_string()])
            .collect();
        artifacts.push(Artifact::kept(&output_path));

        Ok(CommandPlan {
            output_path,
            topology,
            mic_fix,
            pre_pass,
            main_pass: Invocation {
                program: self.ffmpeg.clone(),
                args: main_args,
            },
            artifacts,
            warnings,
        })
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
