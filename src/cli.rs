use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use vidmend_common::{AudioSpec, Device, EncodeSpec, Job, Speed, VideoFormat};

#[derive(Parser)]
#[command(name = "vidmend")]
#[command(author, version, about = "Batch video re-encoder with mic track repair")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Number of files converted in parallel (overrides config)
    #[arg(short = 'j', long, global = true)]
    pub workers: Option<usize>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert a video file, or every file in a directory
    Convert {
        #[command(flatten)]
        job: JobArgs,
    },

    /// Run the jobs listed in a TOML file
    Run {
        /// File with [[jobs]] entries (defaults to the config's jobs)
        jobs: Option<PathBuf>,
    },

    /// Show the commands a conversion would run without running them
    Plan {
        #[command(flatten)]
        job: JobArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Probe a media file and display information
    Probe {
        /// File to probe
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate a config or job file
    Validate {
        /// File to validate (uses the default config if not specified)
        file: Option<PathBuf>,
    },
}

/// Settings for a single conversion given on the command line.
#[derive(Args, Debug, Clone)]
pub struct JobArgs {
    /// Input video file or directory
    #[arg(required = true)]
    pub input: PathBuf,

    /// Output directory
    #[arg(short, long)]
    pub output: PathBuf,

    /// Audio track kept as the main track
    #[arg(long, default_value_t = 0)]
    pub main_track: usize,

    /// Audio track holding the microphone
    #[arg(long, default_value_t = 1)]
    pub mic_track: usize,

    /// Drop the main audio track
    #[arg(long)]
    pub remove_main: bool,

    /// Drop the mic audio track
    #[arg(long)]
    pub remove_mic: bool,

    /// Gain applied to the mic track, in dB
    #[arg(long, allow_hyphen_values = true)]
    pub amplify: Option<f64>,

    /// WAV recording of background noise to remove from the mic track
    #[arg(long)]
    pub noise: Option<PathBuf>,

    /// Re-encode on this device (cpu, gpu); the video is copied when no
    /// encode option is given
    #[arg(long)]
    pub device: Option<Device>,

    /// Output video format (h264, h265)
    #[arg(long)]
    pub format: Option<VideoFormat>,

    /// Encoder speed (fast, slow)
    #[arg(long)]
    pub speed: Option<Speed>,

    /// Video bit rate ceiling in Mbps
    #[arg(long)]
    pub bitrate: Option<f64>,

    /// Target output size in MB
    #[arg(long)]
    pub size: Option<f64>,

    /// Show ffmpeg output and command lines
    #[arg(long)]
    pub debug: bool,
}

impl JobArgs {
    fn encode(&self) -> Option<EncodeSpec> {
        let requested = self.device.is_some()
            || self.format.is_some()
            || self.speed.is_some()
            || self.bitrate.is_some()
            || self.size.is_some();
        requested.then(|| EncodeSpec {
            device: self.device,
            format: self.format,
            speed: self.speed,
            target_bit_rate: self.bitrate,
            target_size: self.size,
        })
    }

    pub fn to_job(&self) -> vidmend_common::Result<Job> {
        let mut main = AudioSpec::track(self.main_track);
        main.remove = self.remove_main;

        let mut mic = AudioSpec::track(self.mic_track);
        mic.amplify_db = self.amplify;
        mic.noise_reference = self.noise.clone();
        mic.remove = self.remove_mic;

        Job::builder(&self.input, &self.output)
            .debug(self.debug)
            .main_audio(main)
            .mic_audio(mic)
            .maybe_encode(self.encode())
            .build()
    }
}
