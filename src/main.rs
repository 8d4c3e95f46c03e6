mod cli;

use vidmend::{
    batch::{self, BatchOrchestrator, WorkerPool},
    config::{self, Config},
    runner::JobRunner,
};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;
use vidmend_av::{FfprobeProber, Prober};
use vidmend_common::Job;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "vidmend=debug,vidmend_av=debug,vidmend_common=debug".to_string()
        } else {
            "vidmend=info,vidmend_av=info,vidmend_common=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = config::load_config_or_default(cli.config.as_deref())?;
    if let Some(workers) = cli.workers {
        if workers == 0 {
            anyhow::bail!("--workers cannot be 0");
        }
        config.batch.workers = Some(workers);
    }

    match cli.command {
        Commands::Convert { job } => {
            let job = job.to_job().context("Invalid conversion settings")?;
            run_jobs(&config, &[job])
        }
        Commands::Run { jobs } => {
            let jobs = match jobs {
                Some(path) => config::load_jobs(&path)?,
                None => {
                    if config.jobs.is_empty() {
                        anyhow::bail!("No job file given and the configuration has no [[jobs]]");
                    }
                    config::build_jobs(&config.jobs)?
                }
            };
            run_jobs(&config, &jobs)
        }
        Commands::Plan { job, json } => {
            let job = job.to_job().context("Invalid conversion settings")?;
            plan_job(&config, &job, json)
        }
        Commands::Probe { file, json } => probe_file(&config, &file, json),
        Commands::CheckTools => check_tools(&config),
        Commands::Validate { file } => validate(file.as_deref().or(cli.config.as_deref())),
    }
}

fn run_jobs(config: &Config, jobs: &[Job]) -> Result<()> {
    let pool = WorkerPool::new(config.workers())?;
    let orchestrator = BatchOrchestrator::new(JobRunner::from_config(config), pool)
        .video_only(config.batch.video_only);

    let report = orchestrator.run(jobs);

    println!();
    for outcome in &report.outcomes {
        println!("{}", outcome.status_line());
    }
    println!("\n{}", report.summary());

    if !report.all_succeeded() {
        anyhow::bail!("{} job(s) failed", report.failed());
    }
    Ok(())
}

fn plan_job(config: &Config, job: &Job, json: bool) -> Result<()> {
    let runner = JobRunner::from_config(config);
    let files = batch::expand(job, config.batch.video_only)?;

    let mut plans = Vec::with_capacity(files.len());
    for file in &files {
        let plan = runner
            .plan(file)
            .with_context(|| format!("Failed to plan {:?}", file.input_path()))?;
        plans.push(plan);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&plans)?);
        return Ok(());
    }

    for plan in &plans {
        println!("Output: {}", plan.output_path.display());
        if let Some(fix) = &plan.mic_fix {
            print!("Mic fix: track {}", fix.track);
            if let Some(ref noise) = fix.noise_reference {
                print!(", denoise with {}", noise.display());
            }
            if let Some(db) = fix.amplify_db {
                print!(", amplify {:+.1} dB", db);
            }
            println!(" -> {}", fix.wav_path.display());
        }
        for warning in &plan.warnings {
            println!("Warning: {}", warning);
        }
        for (i, invocation) in plan.invocations().enumerate() {
            println!("  {}. {}", i + 1, invocation.command_line());
        }
        println!();
    }

    Ok(())
}

fn probe_file(config: &Config, file: &Path, json: bool) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let tools = config.tool_paths();
    let metadata = FfprobeProber::new(&tools.ffprobe)
        .with_timeout(config.timeout())
        .probe(file)?;

    if json {
        let json_str = serde_json::to_string_pretty(&metadata)?;
        println!("{}", json_str);
    } else {
        println!("File: {}", metadata.path.display());
        println!("Size: {} bytes", metadata.size);
        let secs = metadata.duration().as_secs();
        println!(
            "Duration: {:02}:{:02}:{:02}",
            secs / 3600,
            secs / 60 % 60,
            secs % 60
        );
        println!("Bit rate: {:.2} Mbps", metadata.bit_rate as f64 / 1e6);

        println!("\nAudio Tracks: {}", metadata.audio_track_count());
        for track in &metadata.audio_tracks {
            print!(
                "  [{}] {} {} Hz {}ch",
                track.index,
                track.codec.as_deref().unwrap_or("unknown"),
                track.sample_rate,
                track.channels
            );
            if let Some(bits) = track.bit_rate {
                print!(", {} kb/s", bits / 1000);
            }
            println!();
        }
    }

    Ok(())
}

fn check_tools(config: &Config) -> Result<()> {
    println!("Checking external tools...\n");

    let tools = vidmend_av::check_tools(&config.tool_paths());
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version);
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        anyhow::bail!("ffmpeg and ffprobe are both required");
    }

    Ok(())
}

fn validate(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!("  Workers: {}", config.workers());
            println!("  Video files only: {}", config.batch.video_only);
            println!("  Allow unsupported: {}", config.planner.allow_unsupported);
            println!("  Jobs: {}", config.jobs.len());
            println!(
                "    Re-encoding: {}",
                config.jobs.iter().filter(|j| j.encode.is_some()).count()
            );
        }
        None => {
            println!("No config file specified, using defaults");
            let config = Config::default();
            println!("Default config:");
            println!("  Workers: {}", config.workers());
        }
    }

    Ok(())
}
