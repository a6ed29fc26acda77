//! Dubber - Video Dubbing Client
//!
//! Command-line entry point: submits video links to the dubbing backend and
//! follows the jobs until the dubbed video is available.

use anyhow::{Result, bail};
use clap::Parser;
use tracing::{info, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use dubber::cli::{Args, Commands, ConfigAction};
use dubber::config::{Config, API_URL_ENV};
use dubber::error::DubberError;
use dubber::job::Job;
use dubber::poller::TrackOutcome;
use dubber::voice;
use dubber::workflow::{DubOptions, DubOutcome, Workflow};

const DEFAULT_CONFIG_FILE: &str = "dubber.toml";

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging to both console and file; the guard flushes the file writer on exit
    let _log_guard = setup_logging(args.verbose)?;

    let config = load_config(&args)?;

    match args.command {
        Commands::Voices => {
            println!("\nAvailable Voices:");
            println!("{:<12} {:<25} {:<10}", "Id", "Name", "Language");
            println!("{}", "-".repeat(47));
            for v in voice::voices() {
                println!("{:<12} {:<25} {:<10}", v.id, v.name, v.language);
            }
        }
        Commands::Config { action } => match action {
            ConfigAction::Init { output } => {
                if output.exists() {
                    bail!("{} already exists, not overwriting", output.display());
                }
                Config::default().save_to_file(&output)?;
                println!("Wrote default configuration to {}", output.display());
            }
            ConfigAction::Show => {
                let rendered = toml::to_string_pretty(&config)?;
                println!("{}", rendered);
            }
        },
        Commands::Status { task_id } => {
            let workflow = Workflow::new(config)?;
            let job = workflow.status(&task_id).await?;
            print_job(&job);
        }
        Commands::Track { task_id } => {
            info!("Tracking dubbing job: {}", task_id);
            let workflow = Workflow::new(config)?;
            let outcome = workflow.follow(&task_id).await;
            report_outcome(&task_id, outcome)?;
        }
        Commands::Dub { url, voice, language, keep_background_noise, no_auto_sync, detach } => {
            let workflow = Workflow::new(config)?;
            let request = workflow.build_request(&DubOptions {
                url,
                voice_id: voice,
                language,
                keep_background_noise,
                no_auto_sync,
            });

            match workflow.dub(&request, detach).await? {
                DubOutcome::Submitted(job) => {
                    println!("Submitted dubbing job {}", job.id);
                    println!("Follow it with: dubber track --task-id {}", job.id);
                }
                DubOutcome::Finished { job_id, outcome } => report_outcome(&job_id, outcome)?,
            }
        }
    }

    Ok(())
}

/// Resolve configuration: explicit file, then ./dubber.toml, then defaults.
/// The environment can override the backend URL.
fn load_config(args: &Args) -> Result<Config> {
    let config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if std::path::Path::new(DEFAULT_CONFIG_FILE).exists() {
                info!("Found {} in current directory, loading...", DEFAULT_CONFIG_FILE);
                Config::from_file(DEFAULT_CONFIG_FILE)?
            } else {
                Config::default()
            }
        }
    };

    let config = config.with_base_url_override(std::env::var(API_URL_ENV).ok());
    config.validate()?;
    info!("Using dubbing server at {}", config.api.base_url);
    Ok(config)
}

fn print_job(job: &Job) {
    println!("Task:     {}", job.id);
    println!("Status:   {}", job.status());
    println!("Progress: {}%", job.progress);
    if let Some(url) = job.result() {
        println!("Output:   {}", url);
    }
    if let Some(error) = job.error() {
        println!("Error:    {}", error);
    }
}

fn report_outcome(job_id: &str, outcome: TrackOutcome) -> Result<()> {
    match outcome {
        TrackOutcome::Completed(url) => {
            println!("Dubbed video ready: {}", url);
            Ok(())
        }
        TrackOutcome::Cancelled => {
            println!(
                "Stopped tracking job {}. Resume with: dubber track --task-id {}",
                job_id, job_id
            );
            Ok(())
        }
        TrackOutcome::Failed(message) => bail!("Dubbing job {} failed: {}", job_id, message),
        TrackOutcome::Aborted(reason) => {
            let err = DubberError::TrackingAborted(reason);
            Err(anyhow::Error::new(err).context(format!("Lost track of dubbing job {}", job_id)))
        }
    }
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<WorkerGuard> {
    let log_dir = std::env::current_dir()?.join(".dubber").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "dubber.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    // Console output goes to stderr so it does not mix with command output
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_file(verbose)
        .with_line_number(verbose);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false); // No ANSI colors in file

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Logging initialized - console: {}, file: {}",
          log_level, log_dir.join("dubber.log").display());

    Ok(guard)
}
