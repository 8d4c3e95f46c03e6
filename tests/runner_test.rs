//! Job execution tests against fake tools: ordering, failure handling and
//! cleanup of intermediate files.

mod common;

use assert_matches::assert_matches;
use common::{FakeProber, Harness, RecordingExecutor};
use std::path::{Path, PathBuf};
use vidmend::error::{EncodeStage, JobError};
use vidmend_av::Samples;
use vidmend_common::{AudioSpec, Device, EncodeSpec, Job, Speed};

fn two_pass_job(input: &Path, output_dir: &Path) -> Job {
    Job::builder(input, output_dir)
        .encode(EncodeSpec::new(Device::Cpu, Speed::Slow).with_bit_rate(4.0))
        .build()
        .unwrap()
}

fn x264_logs(output_dir: &Path) -> Vec<PathBuf> {
    vec![
        output_dir.join("clip_2pass-0.log"),
        output_dir.join("clip_2pass-0.log.mbtree"),
    ]
}

#[test]
fn test_copy_job_repairs_mic_then_encodes() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let harness = Harness::new(2);
    let job = Job::builder("/v/clip.mp4", &out).build().unwrap();

    let report = harness.runner().run(&job).unwrap();

    assert_eq!(report.output, out.join("clip.mp4"));
    assert_eq!(report.output_size, 4096);
    assert_eq!(report.input_size, 300 * 1024 * 1024);
    assert_eq!(report.summary(), "clip.mp4 Done: 300 MB -> 0 MB");

    assert_eq!(harness.extractions(), 1);
    assert_eq!(harness.denoise_calls(), 0);
    assert_eq!(harness.executor.recorded().len(), 1);
    // Extracted track is gone, the output stays.
    assert!(!out.join("clip_track1.wav").exists());
    assert!(out.join("clip.mp4").is_file());
}

#[test]
fn test_first_pass_runs_before_main_pass() {
    let dir = tempfile::tempdir().unwrap();
    let harness = Harness::with(
        FakeProber::new(1),
        RecordingExecutor {
            pass_logs: x264_logs(dir.path()),
            ..Default::default()
        },
    );

    harness
        .runner()
        .run(&two_pass_job(Path::new("/v/clip.mp4"), dir.path()))
        .unwrap();

    let recorded = harness.executor.recorded();
    assert_eq!(recorded.len(), 2);
    assert!(recorded[0].args.iter().any(|a| a == "null"));
    assert!(recorded[1].args.windows(2).any(|w| w == ["-pass", "2"]));

    for log in x264_logs(dir.path()) {
        assert!(!log.exists(), "{log:?} should be removed");
    }
}

#[test]
fn test_failed_first_pass_skips_main_pass_and_cleans_up() {
    let dir = tempfile::tempdir().unwrap();
    let harness = Harness::with(
        FakeProber::new(1),
        RecordingExecutor {
            pass_logs: x264_logs(dir.path()),
            fail_pre_pass: true,
            ..Default::default()
        },
    );

    let err = harness
        .runner()
        .run(&two_pass_job(Path::new("/v/clip.mp4"), dir.path()))
        .unwrap_err();

    assert_matches!(
        err,
        JobError::Encode {
            stage: EncodeStage::PrePass,
            ..
        }
    );
    assert_eq!(harness.executor.recorded().len(), 1);
    for log in x264_logs(dir.path()) {
        assert!(!log.exists(), "{log:?} should be removed");
    }
}

#[test]
fn test_failed_main_pass_removes_extracted_track() {
    let dir = tempfile::tempdir().unwrap();
    let harness = Harness::with(
        FakeProber::new(2),
        RecordingExecutor {
            fail_main_pass: true,
            ..Default::default()
        },
    );
    let job = Job::builder("/v/clip.mp4", dir.path()).build().unwrap();

    let err = harness.runner().run(&job).unwrap_err();

    assert_matches!(
        err,
        JobError::Encode {
            stage: EncodeStage::MainPass,
            ..
        }
    );
    assert_eq!(harness.extractions(), 1);
    assert!(!dir.path().join("clip_track1.wav").exists());
}

#[test]
fn test_missing_output_is_an_encode_error() {
    let dir = tempfile::tempdir().unwrap();
    let harness = Harness::with(
        FakeProber::new(1),
        RecordingExecutor {
            skip_output: true,
            ..Default::default()
        },
    );
    let job = Job::builder("/v/clip.mp4", dir.path()).build().unwrap();

    let err = harness.runner().run(&job).unwrap_err();
    assert_matches!(
        err,
        JobError::Encode {
            stage: EncodeStage::MainPass,
            ..
        }
    );
}

#[test]
fn test_removed_mic_is_never_processed() {
    let dir = tempfile::tempdir().unwrap();
    let noise = dir.path().join("noise.wav");
    Samples::new(48_000, 1, vec![100; 4800])
        .write_wav(&noise)
        .unwrap();

    let harness = Harness::new(2);
    let job = Job::builder("/v/clip.mp4", dir.path().join("out"))
        .mic_audio(
            AudioSpec::default_mic()
                .with_noise_reference(&noise)
                .with_amplify(6.0)
                .removed(),
        )
        .build()
        .unwrap();

    let report = harness.runner().run(&job).unwrap();

    assert_eq!(harness.extractions(), 0);
    assert_eq!(harness.denoise_calls(), 0);
    assert!(report.warnings.iter().any(|w| w.contains("removed")));
}

#[test]
fn test_noise_reference_is_applied_once() {
    let dir = tempfile::tempdir().unwrap();
    let noise = dir.path().join("noise.wav");
    Samples::new(48_000, 1, vec![100; 4800])
        .write_wav(&noise)
        .unwrap();

    let harness = Harness::new(2);
    let job = Job::builder("/v/clip.mp4", dir.path().join("out"))
        .mic_audio(
            AudioSpec::default_mic()
                .with_noise_reference(&noise)
                .with_amplify(-3.0),
        )
        .build()
        .unwrap();

    harness.runner().run(&job).unwrap();

    assert_eq!(harness.extractions(), 1);
    assert_eq!(harness.denoise_calls(), 1);
    assert!(noise.exists());
}

#[test]
fn test_missing_noise_reference_fails_before_encoding() {
    let dir = tempfile::tempdir().unwrap();
    let harness = Harness::new(2);
    let job = Job::builder("/v/clip.mp4", dir.path())
        .mic_audio(AudioSpec::default_mic().with_noise_reference(dir.path().join("absent.wav")))
        .build()
        .unwrap();

    let err = harness.runner().run(&job).unwrap_err();
    assert_matches!(err, JobError::AudioExtraction { track: 1, .. });
    assert!(harness.executor.recorded().is_empty());
}

#[test]
fn test_unreadable_metadata_names_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let harness = Harness::with(
        FakeProber::new(2).failing_on("broken"),
        RecordingExecutor::default(),
    );
    let job = Job::builder("/v/broken.mp4", dir.path()).build().unwrap();

    let err = harness.runner().run(&job).unwrap_err();
    assert_matches!(err, JobError::Probe { ref path, .. } if path == Path::new("/v/broken.mp4"));
    assert!(harness.executor.recorded().is_empty());
}

#[test]
fn test_plan_does_not_execute() {
    let harness = Harness::new(2);
    let job = Job::builder("/v/clip.mp4", "/out").build().unwrap();

    let plan = harness.runner().plan(&job).unwrap();

    assert_eq!(plan.output_path, PathBuf::from("/out/clip.mp4"));
    assert!(harness.executor.recorded().is_empty());
    assert_eq!(harness.extractions(), 0);
}

#[test]
fn test_uncreatable_output_dir_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("taken");
    std::fs::write(&blocker, b"not a directory").unwrap();
    let output_dir = blocker.join("out");

    let harness = Harness::new(2);
    let job = Job::builder("/v/clip.mp4", &output_dir).build().unwrap();

    let err = harness.runner().run(&job).unwrap_err();
    assert_matches!(err, JobError::Io { ref path, .. } if path == &output_dir);
    assert_eq!(harness.prober.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
}
