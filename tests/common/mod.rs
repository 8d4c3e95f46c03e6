//! Shared fakes for integration tests.
//!
//! [`FakeProber`], [`FakeTracks`], [`CountingDenoiser`] and
//! [`RecordingExecutor`] stand in for ffprobe, ffmpeg and the noise gate so
//! that jobs can run end to end without any external tool.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use vidmend::planner::{Invocation, Planner};
use vidmend::runner::{CommandExecutor, JobRunner};
use vidmend_av::{AudioStream, Denoiser, Error, MediaMetadata, Prober, Samples, TrackSource};

/// Metadata for a 60 second, 300 MB file at 40 Mbps with `tracks` stereo
/// AAC audio streams.
pub fn metadata(path: &Path, tracks: usize) -> MediaMetadata {
    MediaMetadata {
        path: path.to_path_buf(),
        duration_secs: 60.0,
        size: 300 * 1024 * 1024,
        bit_rate: 40_000_000,
        audio_tracks: (0..tracks)
            .map(|i| AudioStream {
                index: i,
                stream_index: i as u32 + 1,
                codec: Some("aac".to_string()),
                sample_rate: 48_000,
                channels: 2,
                bit_rate: Some(128_000),
            })
            .collect(),
    }
}

/// Prober answering with [`metadata`] for any path.
pub struct FakeProber {
    tracks: usize,
    fail_on: Option<String>,
    pub calls: AtomicUsize,
}

impl FakeProber {
    pub fn new(tracks: usize) -> Self {
        Self {
            tracks,
            fail_on: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Fail for paths whose file name contains `needle`.
    pub fn failing_on(mut self, needle: &str) -> Self {
        self.fail_on = Some(needle.to_string());
        self
    }
}

impl Prober for FakeProber {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn probe(&self, path: &Path) -> vidmend_av::Result<MediaMetadata> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if let Some(needle) = &self.fail_on {
            if name.contains(needle.as_str()) {
                return Err(Error::parse_error("ffprobe", "invalid data found"));
            }
        }
        Ok(metadata(path, self.tracks))
    }
}

/// Track source returning a short constant mono signal.
#[derive(Default)]
pub struct FakeTracks {
    pub calls: AtomicUsize,
}

impl TrackSource for FakeTracks {
    fn extract(&self, _video: &Path, _stream: &AudioStream) -> vidmend_av::Result<Samples> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Samples::new(48_000, 1, vec![1000; 4800]))
    }
}

/// Denoiser that passes the signal through and counts calls.
#[derive(Default)]
pub struct CountingDenoiser {
    pub calls: AtomicUsize,
}

impl Denoiser for CountingDenoiser {
    fn reduce(&self, signal: &Samples, _noise: &Samples) -> vidmend_av::Result<Samples> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(signal.clone())
    }
}

/// Executor that records invocations and imitates ffmpeg's file output.
///
/// A first pass (`-f null -`) writes the files in `pass_logs`; a main pass
/// writes its last argument, the output path. Each invocation takes `delay`,
/// and the largest number of invocations seen running at once is kept.
#[derive(Default)]
pub struct RecordingExecutor {
    pub invocations: Mutex<Vec<Invocation>>,
    pub pass_logs: Vec<PathBuf>,
    pub fail_pre_pass: bool,
    pub fail_main_pass: bool,
    pub skip_output: bool,
    pub delay: Duration,
    pub active: AtomicUsize,
    pub max_active: AtomicUsize,
}

impl RecordingExecutor {
    pub fn recorded(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap().clone()
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    fn imitate(&self, invocation: &Invocation) -> vidmend_av::Result<()> {
        if is_pre_pass(invocation) {
            for log in &self.pass_logs {
                fs::write(log, b"stats")?;
            }
            if self.fail_pre_pass {
                return Err(Error::tool_failed("ffmpeg", "exit status: 1"));
            }
            return Ok(());
        }

        if self.fail_main_pass {
            return Err(Error::tool_failed("ffmpeg", "exit status: 1"));
        }
        if !self.skip_output {
            if let Some(output) = invocation.args.last() {
                fs::write(output, vec![0u8; 4096])?;
            }
        }
        Ok(())
    }
}

fn is_pre_pass(invocation: &Invocation) -> bool {
    invocation.args.ends_with(&["-f".to_string(), "null".to_string(), "-".to_string()])
}

impl CommandExecutor for RecordingExecutor {
    fn execute(&self, invocation: &Invocation, _visible: bool) -> vidmend_av::Result<()> {
        self.invocations.lock().unwrap().push(invocation.clone());

        let running = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(running, Ordering::SeqCst);
        thread::sleep(self.delay);
        let result = self.imitate(invocation);
        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Fakes wired into a runner, kept so tests can inspect them.
pub struct Harness {
    pub prober: Arc<FakeProber>,
    pub tracks: Arc<FakeTracks>,
    pub denoiser: Arc<CountingDenoiser>,
    pub executor: Arc<RecordingExecutor>,
}

impl Harness {
    pub fn new(tracks: usize) -> Self {
        Self::with(FakeProber::new(tracks), RecordingExecutor::default())
    }

    pub fn with(prober: FakeProber, executor: RecordingExecutor) -> Self {
        Self {
            prober: Arc::new(prober),
            tracks: Arc::new(FakeTracks::default()),
            denoiser: Arc::new(CountingDenoiser::default()),
            executor: Arc::new(executor),
        }
    }

    pub fn runner(&self) -> JobRunner {
        self.runner_with(Planner::default())
    }

    pub fn runner_with(&self, planner: Planner) -> JobRunner {
        JobRunner::new(planner)
            .with_prober(self.prober.clone())
            .with_track_source(self.tracks.clone())
            .with_denoiser(self.denoiser.clone())
            .with_executor(self.executor.clone())
    }

    pub fn extractions(&self) -> usize {
        self.tracks.calls.load(Ordering::SeqCst)
    }

    pub fn denoise_calls(&self) -> usize {
        self.denoiser.calls.load(Ordering::SeqCst)
    }
}
