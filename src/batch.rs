//! Batch expansion and parallel dispatch.
//!
//! Jobs pointing at a directory expand into one job per regular file directly
//! inside it. Jobs are then deduplicated by `(input, output_dir)`, checked
//! against the planner, and dispatched to a [`WorkerPool`]. Jobs that would
//! share temporary files run back to back on the same worker.

use crate::error::{JobError, Result};
use crate::runner::{JobReport, JobRunner};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use vidmend_common::{paths::is_video_file, Job, JobKey};
use walkdir::WalkDir;

/// Expand a directory job into one job per file. File jobs pass through.
///
/// Only the directory's immediate children are considered; subdirectories
/// are skipped, not descended into. With `video_only`, files without a known
/// video extension are skipped too.
pub fn expand(job: &Job, video_only: bool) -> Result<Vec<Job>> {
    let input = job.input_path();
    if !input.is_dir() {
        return Ok(vec![job.clone()]);
    }

    let mut jobs = Vec::new();
    for entry in WalkDir::new(input)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| JobError::Io {
            path: input.to_path_buf(),
            source: e.into(),
        })?;
        let path = entry.path();

        if !path.is_file() {
            debug!("Skipping non-file {:?}", path);
            continue;
        }
        if video_only && !is_video_file(path) {
            debug!("Skipping non-video file {:?}", path);
            continue;
        }
        jobs.push(job.with_input(path)?);
    }

    if jobs.is_empty() {
        warn!("No files to convert in {:?}", input);
    }
    Ok(jobs)
}

/// Drop jobs whose `(input, output_dir)` was already seen.
///
/// The first occurrence wins. Settings are not part of the identity, so a
/// dropped duplicate that asks for something different is logged.
pub fn dedup(jobs: Vec<Job>) -> Vec<Job> {
    let mut seen: HashMap<JobKey, usize> = HashMap::new();
    let mut kept: Vec<Job> = Vec::with_capacity(jobs.len());

    for job in jobs {
        match seen.get(&job.key()) {
            Some(&index) => {
                if kept[index] != job {
                    warn!(
                        "Ignoring duplicate job for {:?} -> {:?} with different settings",
                        job.input_path(),
                        job.output_dir()
                    );
                } else {
                    debug!("Ignoring duplicate job for {:?}", job.input_path());
                }
            }
            None => {
                seen.insert(job.key(), kept.len());
                kept.push(job);
            }
        }
    }
    kept
}

/// Group jobs that share a file stem and output directory.
///
/// Such jobs also share temporary file names, so each group must run on one
/// worker, one job after another. Groups keep the order in which their first
/// job appears, and jobs keep their order within a group.
pub fn stem_groups(jobs: Vec<Job>) -> Vec<Vec<Job>> {
    let mut index: HashMap<(PathBuf, String), usize> = HashMap::new();
    let mut groups: Vec<Vec<Job>> = Vec::new();
    for job in jobs {
        let key = (job.output_dir().to_path_buf(), job.stem());
        match index.get(&key) {
            Some(&i) => groups[i].push(job),
            None => {
                index.insert(key, groups.len());
                groups.push(vec![job]);
            }
        }
    }
    groups
}

/// Fixed-size pool of worker threads.
pub struct WorkerPool {
    pool: rayon::ThreadPool,
}

impl WorkerPool {
    pub fn new(workers: usize) -> anyhow::Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|i| format!("vidmend-worker-{i}"))
            .build()?;
        Ok(Self { pool })
    }

    pub fn size(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Apply `f` to every item on the pool and wait for all of them.
    /// Results keep the order of `items`.
    pub fn map<T, R, F>(&self, items: Vec<T>, f: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Send + Sync,
    {
        self.pool.install(|| items.into_par_iter().map(f).collect())
    }
}

/// What happened to one job of a batch.
#[derive(Debug)]
pub struct JobOutcome {
    pub input: PathBuf,
    pub result: Result<JobReport>,
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// One status line: the size summary, or the failure reason.
    pub fn status_line(&self) -> String {
        match &self.result {
            Ok(report) => report.summary(),
            Err(e) => format!("{} FAILED: {}", self.input.display(), e),
        }
    }
}

/// Outcome of a whole batch.
#[derive(Debug)]
pub struct BatchReport {
    pub outcomes: Vec<JobOutcome>,
    pub elapsed: Duration,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed() == 0
    }

    pub fn summary(&self) -> String {
        format!(
            "{} of {} job(s) succeeded in {}",
            self.succeeded(),
            self.outcomes.len(),
            format_elapsed(self.elapsed)
        )
    }
}

/// `1h 02m 03s`, `2m 03s` or `3.2s`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    if secs >= 3600 {
        format!("{}h {:02}m {:02}s", secs / 3600, secs % 3600 / 60, secs % 60)
    } else if secs >= 60 {
        format!("{}m {:02}s", secs / 60, secs % 60)
    } else {
        format!("{:.1}s", elapsed.as_secs_f64())
    }
}

/// Expands, deduplicates and runs jobs on a worker pool.
pub struct BatchOrchestrator {
    runner: JobRunner,
    pool: WorkerPool,
    video_only: bool,
}

impl BatchOrchestrator {
    pub fn new(runner: JobRunner, pool: WorkerPool) -> Self {
        Self {
            runner,
            pool,
            video_only: false,
        }
    }

    pub fn video_only(mut self, video_only: bool) -> Self {
        self.video_only = video_only;
        self
    }

    /// Expand and deduplicate, then run planner checks.
    ///
    /// Returns the jobs to dispatch and outcomes for jobs rejected up front.
    pub fn prepare(&self, jobs: &[Job]) -> (Vec<Job>, Vec<JobOutcome>) {
        let mut rejected = Vec::new();
        let mut expanded = Vec::new();

        for job in jobs {
            match expand(job, self.video_only) {
                Ok(files) => expanded.extend(files),
                Err(e) => rejected.push(rejection(job.input_path(), e)),
            }
        }

        let unique = dedup(expanded);
        let mut ready = Vec::with_capacity(unique.len());
        for job in unique {
            match self.runner.planner().check(&job) {
                Ok(_) => ready.push(job),
                Err(e) => rejected.push(rejection(job.input_path(), e)),
            }
        }
        (ready, rejected)
    }

    /// Run every job and wait for all of them.
    pub fn run(&self, jobs: &[Job]) -> BatchReport {
        let started = Instant::now();
        let (ready, mut outcomes) = self.prepare(jobs);
        info!(
            "Converting {} file(s) with {} worker(s)",
            ready.len(),
            self.pool.size()
        );

        let groups = stem_groups(ready);
        for group in groups.iter().filter(|g| g.len() > 1) {
            let inputs: Vec<&Path> = group.iter().map(Job::input_path).collect();
            warn!(
                "Inputs share a file stem and output directory, running them one at a time: {:?}",
                inputs
            );
        }

        let runner = &self.runner;
        let finished = self.pool.map(groups, |group| {
            group
                .into_iter()
                .map(|job| run_one(runner, &job))
                .collect::<Vec<_>>()
        });
        outcomes.extend(finished.into_iter().flatten());

        let report = BatchReport {
            outcomes,
            elapsed: started.elapsed(),
        };
        info!("{}", report.summary());
        report
    }
}

fn run_one(runner: &JobRunner, job: &Job) -> JobOutcome {
    let outcome = JobOutcome {
        input: job.input_path().to_path_buf(),
        result: runner.run(job),
    };
    match &outcome.result {
        Ok(_) => info!("{}", outcome.status_line()),
        Err(_) => error!("{}", outcome.status_line()),
    }
    outcome
}

fn rejection(input: &Path, err: JobError) -> JobOutcome {
    let outcome = JobOutcome {
        input: input.to_path_buf(),
        result: Err(err),
    };
    error!("{}", outcome.status_line());
    outcome
}
