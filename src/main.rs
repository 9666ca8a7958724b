//! Display Chime
//!
//! Silences the generic device connect/disconnect chimes while a chosen
//! display is attached and restores them when it is gone.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use display_chime::config::{AppConfig, ConfigOverrides, LogConfig};
use display_chime::devices::{self, DisplayDevices, IdGranularity};
use display_chime::instance::{InstanceGuard, EXIT_ALREADY_RUNNING, INSTANCE_LOCK_NAME};
use display_chime::paths::AppPaths;
use display_chime::poll::PollLoop;
use display_chime::sink::tracing_sink;
use display_chime::sounds;
use display_chime::toggle::ToggleController;
use display_chime::ChimeError;

/// Display Chime - mute device chimes while a display is attached
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (default: detected application path)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Identifier of the display to watch for
    #[arg(short, long, env = "DISPLAY_CHIME_TARGET")]
    target: Option<String>,

    /// Sound file restored into the device-connect slot
    #[arg(long)]
    inserted_sound: Option<String>,

    /// Sound file restored into the device-disconnect slot
    #[arg(long)]
    removed_sound: Option<String>,

    /// Time between two enumerations, in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,

    /// How much of the device instance path identifies a display
    #[arg(long, value_enum)]
    granularity: Option<IdGranularity>,

    /// List attached displays and exit
    #[arg(long)]
    list: bool,

    /// Apply the sounds for the given presence once and exit
    #[arg(long, value_enum)]
    apply: Option<Presence>,

    /// Keep sound slot writes in memory instead of the registry
    #[arg(long)]
    dry_run: bool,

    /// Disable the rolling log file
    #[arg(long)]
    no_log_file: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Presence {
    Present,
    Absent,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            target_device_id: self.target.clone(),
            inserted_sound_path: self.inserted_sound.clone(),
            removed_sound_path: self.removed_sound.clone(),
            poll_interval_ms: self.interval_ms,
            id_granularity: self.granularity,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Parse command line arguments
    let args = Args::parse();

    let paths = AppPaths::detect();
    let mut config = match &args.config {
        Some(path) => AppConfig::load(path).await?,
        None => AppConfig::load_or_default(&paths.config).await?,
    };
    config.apply_overrides(args.overrides());
    config.validate()?;

    let logs_dir = (!args.no_log_file && config.log.enabled)
        .then(|| config.log.dir.clone().unwrap_or_else(|| paths.logs_dir.clone()));
    let _log_guard = init_logging(&args.log_level, &config.log, logs_dir.as_deref())?;

    info!("Starting Display Chime v{}...", env!("CARGO_PKG_VERSION"));
    info!(
        "Data directory: {}{}",
        paths.base_dir().display(),
        if paths.is_portable { " (portable)" } else { "" }
    );
    info!(
        "Configuration file: {}",
        args.config.as_ref().unwrap_or(&paths.config).display()
    );
    if let Some(dir) = &logs_dir {
        info!("Log directory: {}", dir.display());
    }

    // Nothing is enumerated or written before the lock is held
    let Some(_instance) = acquire_instance(INSTANCE_LOCK_NAME)? else {
        warn!("Another instance of Display Chime is already running, exiting");
        return Ok(ExitCode::from(EXIT_ALREADY_RUNNING));
    };

    // Handle list displays
    if args.list {
        list_displays(&config)?;
        return Ok(ExitCode::SUCCESS);
    }

    if args.dry_run {
        info!("Dry run: sound slots are kept in memory");
    }
    let log = tracing_sink();
    let mut controller = ToggleController::new(
        sounds::platform_store(args.dry_run),
        config.sound_paths(),
        log.clone(),
    );

    // Handle one-shot apply
    if let Some(presence) = args.apply {
        controller.apply_for_presence(matches!(presence, Presence::Present));
        return Ok(ExitCode::SUCCESS);
    }

    let devices = DisplayDevices::new(devices::platform_backend(), config.id_granularity, log.clone());
    let poll = PollLoop::initialize(
        devices,
        controller,
        config.target_device_id.clone(),
        config.poll_interval(),
        log,
    );

    poll.run(shutdown_signal()).await;

    info!("Display Chime shutdown complete");
    Ok(ExitCode::SUCCESS)
}

/// Take the instance lock, `None` if another process already holds it
fn acquire_instance(name: &str) -> Result<Option<InstanceGuard>> {
    match InstanceGuard::acquire(name) {
        Ok(guard) => Ok(Some(guard)),
        Err(ChimeError::AlreadyRunning) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn init_logging(level: &str, log_config: &LogConfig, logs_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let (file_layer, guard) = match logs_dir {
        Some(dir) => {
            AppPaths::ensure_logs_dir(dir)
                .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;

            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("display-chime")
                .filename_suffix("log")
                .max_log_files(log_config.max_files)
                .build(dir)
                .context("Failed to create rolling log file")?;
            let (writer, guard) = tracing_appender::non_blocking(appender);

            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .with(file_layer)
        .init();

    Ok(guard)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        // Without a handler the process still ends when it is killed
        error!("Failed to install Ctrl+C handler: {}", e);
        std::future::pending::<()>().await;
    }
}

fn list_displays(config: &AppConfig) -> Result<()> {
    use colored::*;

    let instance_paths = devices::platform_backend()
        .instance_paths()
        .context("Failed to enumerate displays")?;

    println!("\n{}", "=== Attached Displays ===".bold().cyan());

    if instance_paths.is_empty() {
        println!("  {}", "(none)".dimmed());
    }

    for path in &instance_paths {
        match config.id_granularity.identify(path) {
            Some(id) if id == config.target_device_id => {
                println!("  {} {} {}", id.green().bold(), path.dimmed(), "<- target".yellow());
            }
            Some(id) => println!("  {} {}", id.bright_white(), path.dimmed()),
            None => println!("  {} {}", "?".red(), path.dimmed()),
        }
    }

    println!(
        "\n  Target: {} ({:?} identifiers)",
        config.target_device_id.yellow(),
        config.id_granularity
    );

    Ok(())
}
