//! Audio stream topology of the output file.

use super::bitrate::AUDIO_BIT_RATE;
use crate::error::{JobError, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use vidmend_av::MediaMetadata;
use vidmend_common::Job;

/// How the output's audio is assembled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AudioTopology {
    /// No audio in the output.
    Strip,
    /// The main track passes through alone.
    MainOnly { main: usize },
    /// The repaired mic track replaces all other audio.
    MicOnly { mic: usize, wav: PathBuf },
    /// Main track and repaired mic track are merged into one stream.
    Merge { main: usize, mic: usize, wav: PathBuf },
}

impl AudioTopology {
    /// Pick the topology for `job` given the probed tracks.
    ///
    /// `mic_wav` is where the repaired mic track will be written when one is
    /// needed.
    ///
    /// # Errors
    ///
    /// [`JobError::AudioExtraction`] when a track the topology needs does not
    /// exist in the file.
    pub fn select(job: &Job, metadata: &MediaMetadata, mic_wav: &Path) -> Result<Self> {
        let count = metadata.audio_track_count();
        let main = job.main_audio();
        let mic = job.mic_audio();

        if count == 0 {
            return Ok(Self::Strip);
        }

        if count <= 1 || mic.remove {
            if main.remove {
                return Ok(Self::Strip);
            }
            require_track(metadata, main.track)?;
            return Ok(Self::MainOnly { main: main.track });
        }

        require_track(metadata, mic.track)?;
        let wav = mic_wav.to_path_buf();
        if main.remove {
            Ok(Self::MicOnly {
                mic: mic.track,
                wav,
            })
        } else {
            require_track(metadata, main.track)?;
            Ok(Self::Merge {
                main: main.track,
                mic: mic.track,
                wav,
            })
        }
    }

    /// Mic track to extract and repair, if this topology uses one.
    pub fn mic(&self) -> Option<(usize, &Path)> {
        match self {
            Self::MicOnly { mic, wav } | Self::Merge { mic, wav, .. } => {
                Some((*mic, wav.as_path()))
            }
            _ => None,
        }
    }

    /// Extra `-i` inputs, placed right after the video input.
    pub fn input_args(&self) -> Vec<String> {
        match self.mic() {
            Some((_, wav)) => vec!["-i".to_string(), wav.to_string_lossy().to_string()],
            None => Vec::new(),
        }
    }

    /// Mapping, filter and bit rate options for the audio.
    pub fn output_args(&self) -> Vec<String> {
        let bit_rate = format!("{}k", AUDIO_BIT_RATE / 1000);
        let mut args: Vec<String> = match self {
            Self::Strip => return vec!["-an".to_string()],
            Self::MainOnly { main } => vec!["-map".to_string(), format!("0:a:{main}")],
            Self::MicOnly { .. } => vec!["-map".to_string(), "1:a".to_string()],
            Self::Merge { main, .. } => vec![
                "-filter_complex".to_string(),
                format!("[0:a:{main}][1:a]amerge=inputs=2[a]"),
                "-map".to_string(),
                "[a]".to_string(),
            ],
        };
        // Without -ac an amerge of two stereo inputs yields four channels.
        let channels = match self {
            Self::MicOnly { .. } => "1",
            _ => "2",
        };
        args.extend(["-b:a".to_string(), bit_rate, "-ac".to_string(), channels.to_string()]);
        args
    }
}

fn require_track(metadata: &MediaMetadata, track: usize) -> Result<()> {
    if track < metadata.audio_track_count() {
        Ok(())
    } else {
        Err(JobError::audio(
            track,
            format!(
                "{} has only {} audio track(s)",
                metadata.path.display(),
                metadata.audio_track_count()
            ),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vidmend_av::AudioStream;
    use vidmend_common::AudioSpec;

    fn metadata(tracks: usize) -> MediaMetadata {
        MediaMetadata {
            path: PathBuf::from("/v/a.mp4"),
            duration_secs: 10.0,
            size: 1,
            bit_rate: 1,
            audio_tracks: (0..tracks)
                .map(|index| AudioStream {
                    index,
                    stream_index: index as u32 + 1,
                    codec: None,
                    sample_rate: 48000,
                    channels: 2,
                    bit_rate: None,
                })
                .collect(),
        }
    }

    fn job(main: AudioSpec, mic: AudioSpec) -> Job {
        Job::builder("/v/a.mp4", "/out")
            .main_audio(main)
            .mic_audio(mic)
            .build()
            .unwrap()
    }

    const WAV: &str = "/out/a_track1.wav";

    fn select(job: &Job, tracks: usize) -> Result<AudioTopology> {
        AudioTopology::select(job, &metadata(tracks), Path::new(WAV))
    }

    #[test]
    fn test_single_track_keeps_main() {
        let job = job(AudioSpec::default_main(), AudioSpec::default_mic());
        let topology = select(&job, 1).unwrap();
        assert_eq!(topology, AudioTopology::MainOnly { main: 0 });
        assert!(topology.input_args().is_empty());
        assert_eq!(topology.output_args(), ["-map", "0:a:0", "-b:a", "128k", "-ac", "2"]);
    }

    #[test]
    fn test_mic_removed_keeps_main() {
        let job = job(AudioSpec::default_main(), AudioSpec::default_mic().removed());
        assert_eq!(select(&job, 2).unwrap(), AudioTopology::MainOnly { main: 0 });
    }

    #[test]
    fn test_both_removed_strips() {
        let job = job(
            AudioSpec::default_main().removed(),
            AudioSpec::default_mic().removed(),
        );
        let topology = select(&job, 2).unwrap();
        assert_eq!(topology, AudioTopology::Strip);
        assert_eq!(topology.output_args(), ["-an"]);
    }

    #[test]
    fn test_no_audio_strips() {
        let job = job(AudioSpec::default_main(), AudioSpec::default_mic());
        assert_eq!(select(&job, 0).unwrap(), AudioTopology::Strip);
    }

    #[test]
    fn test_main_removed_uses_mic_mono() {
        let job = job(AudioSpec::default_main().removed(), AudioSpec::default_mic());
        let topology = select(&job, 2).unwrap();
        assert_eq!(topology.input_args(), ["-i", WAV]);
        assert_eq!(topology.output_args(), ["-map", "1:a", "-b:a", "128k", "-ac", "1"]);
    }

    #[test]
    fn test_merge() {
        let job = job(AudioSpec::default_main(), AudioSpec::default_mic());
        let topology = select(&job, 2).unwrap();
        assert_eq!(topology.mic(), Some((1, Path::new(WAV))));
        assert_eq!(
            topology.output_args(),
            [
                "-filter_complex",
                "[0:a:0][1:a]amerge=inputs=2[a]",
                "-map",
                "[a]",
                "-b:a",
                "128k",
                "-ac",
                "2"
            ]
        );
    }

    #[test]
    fn test_missing_mic_track() {
        let job = job(AudioSpec::default_main(), AudioSpec::track(3));
        let err = select(&job, 2).unwrap_err();
        assert!(matches!(err, JobError::AudioExtraction { track: 3, .. }));
    }

    #[test]
    fn test_missing_main_track() {
        let job = job(AudioSpec::track(2), AudioSpec::track(0));
        assert!(matches!(
            select(&job, 1),
            Err(JobError::AudioExtraction { track: 2, .. })
        ));
    }
}
