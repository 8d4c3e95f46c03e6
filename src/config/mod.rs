mod types;

pub use types::*;

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use vidmend_common::Job;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = ["./vidmend.toml", "~/.config/vidmend/config.toml"];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    Ok(Config::default())
}

#[derive(Debug, Deserialize)]
struct JobFile {
    #[serde(default)]
    jobs: Vec<JobEntry>,
}

/// Read the `[[jobs]]` entries of a TOML file and validate each one.
///
/// Other tables in the file are ignored, so a full config file is accepted.
pub fn load_jobs(path: &Path) -> Result<Vec<Job>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read job file: {:?}", path))?;

    let file: JobFile = toml::from_str(&content)
        .with_context(|| format!("Failed to parse job file: {:?}", path))?;

    if file.jobs.is_empty() {
        anyhow::bail!("Job file {:?} has no [[jobs]] entries", path);
    }

    build_jobs(&file.jobs)
}

/// Turn job entries into validated jobs, naming the first invalid entry.
pub fn build_jobs(entries: &[JobEntry]) -> Result<Vec<Job>> {
    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            entry
                .to_job()
                .with_context(|| format!("Invalid job #{} ({:?})", i + 1, entry.input))
        })
        .collect()
}

/// Validate configuration
fn validate_config(config: &Config) -> Result<()> {
    if config.batch.workers == Some(0) {
        anyhow::bail!("batch.workers cannot be 0");
    }

    if config.tools.timeout_secs == Some(0) {
        anyhow::bail!("tools.timeout_secs cannot be 0");
    }

    for (name, path) in [
        ("ffmpeg", &config.tools.ffmpeg_path),
        ("ffprobe", &config.tools.ffprobe_path),
    ] {
        if let Some(path) = path {
            if !path.exists() {
                tracing::warn!("Configured {} path does not exist: {:?}", name, path);
            }
        }
    }

    let denoise = &config.denoise;
    if denoise.frame_ms == 0 {
        anyhow::bail!("denoise.frame_ms must be greater than 0");
    }
    if !(denoise.n_std >= 0.0) {
        anyhow::bail!("denoise.n_std cannot be negative");
    }
    if denoise.floor_db > 0.0 {
        anyhow::bail!("denoise.floor_db must be 0 or below");
    }

    build_jobs(&config.jobs)?;

    Ok(())
}
