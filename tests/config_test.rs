//! Configuration and job file loading tests.

use std::path::{Path, PathBuf};
use std::time::Duration;
use vidmend::config::{self, Config};
use vidmend_common::VideoFormat;

const FULL_CONFIG: &str = r#"
[batch]
workers = 3
video_only = true

[tools]
timeout_secs = 600

[planner]
allow_unsupported = true

[denoise]
n_std = 2.0

[[jobs]]
input = "/v/a.mp4"
output_dir = "/out"

[[jobs]]
input = "/v/b.mp4"
output_dir = "/out"
debug = true
mic_audio = { track = 2, amplify_db = 4.5, noise_reference = "/n/room.wav" }
encode = { device = "cpu", speed = "slow", format = "h265", target_size = 50.0 }
"#;

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_full_config_parses() {
    let dir = tempfile::tempdir().unwrap();
    let config = config::load_config(&write(dir.path(), "vidmend.toml", FULL_CONFIG)).unwrap();

    assert_eq!(config.workers(), 3);
    assert!(config.batch.video_only);
    assert_eq!(config.timeout(), Some(Duration::from_secs(600)));
    assert!(config.planner.allow_unsupported);
    assert_eq!(config.denoise.n_std, 2.0);
    assert_eq!(config.denoise.frame_ms, 20);

    let jobs = config::build_jobs(&config.jobs).unwrap();
    assert_eq!(jobs.len(), 2);

    assert_eq!(jobs[0].mic_audio().track, 1);
    assert_eq!(jobs[0].main_audio().track, 0);
    assert!(jobs[0].encode().is_none());

    let b = &jobs[1];
    assert!(b.debug());
    assert_eq!(b.mic_audio().track, 2);
    assert_eq!(b.mic_audio().amplify_db, Some(4.5));
    assert_eq!(
        b.mic_audio().noise_reference.as_deref(),
        Some(Path::new("/n/room.wav"))
    );
    let encode = b.encode().unwrap();
    assert_eq!(encode.format, VideoFormat::H265);
    assert_eq!(encode.target_size, Some(50 * 1024 * 1024));
    assert!(encode.is_two_pass());
}

#[test]
fn test_empty_config_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = config::load_config(&write(dir.path(), "vidmend.toml", "")).unwrap();

    assert!(config.workers() >= 1);
    assert!(!config.batch.video_only);
    assert_eq!(config.timeout(), None);
    assert!(config.jobs.is_empty());
    assert_eq!(config.tools.ffmpeg_path, Config::default().tools.ffmpeg_path);
}

#[test]
fn test_zero_workers_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "vidmend.toml", "[batch]\nworkers = 0\n");
    let err = config::load_config(&path).unwrap_err();
    assert!(err.to_string().contains("workers"));
}

#[test]
fn test_positive_noise_floor_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "vidmend.toml", "[denoise]\nfloor_db = 3.0\n");
    assert!(config::load_config(&path).is_err());
}

#[test]
fn test_invalid_job_is_named() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(
        dir.path(),
        "jobs.toml",
        r#"
[[jobs]]
input = "/v/a.mp4"
output_dir = "/out"

[[jobs]]
input = "/v/b.mp4"
output_dir = "/out"
main_audio = { track = 0, amplify_db = 3.0 }
"#,
    );

    let err = config::load_jobs(&path).unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("Invalid job #2"), "{message}");
    assert!(message.contains("b.mp4"), "{message}");
}

#[test]
fn test_incomplete_encode_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(
        dir.path(),
        "jobs.toml",
        r#"
[[jobs]]
input = "/v/a.mp4"
output_dir = "/out"
encode = { device = "gpu", target_bit_rate = 8.0 }
"#,
    );
    assert!(config::load_jobs(&path).is_err());
}

#[test]
fn test_job_file_without_jobs_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "jobs.toml", "[batch]\nworkers = 2\n");
    let err = config::load_jobs(&path).unwrap_err();
    assert!(err.to_string().contains("[[jobs]]"));
}

#[test]
fn test_job_file_accepts_full_config() {
    let dir = tempfile::tempdir().unwrap();
    let jobs = config::load_jobs(&write(dir.path(), "vidmend.toml", FULL_CONFIG)).unwrap();
    assert_eq!(jobs.len(), 2);
}

#[test]
fn test_missing_config_file_is_an_error() {
    let result = config::load_config_or_default(Some(Path::new("/nonexistent/vidmend.toml")));
    assert!(result.is_err());
}
