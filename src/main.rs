//! GrassMidi - MIDI controller automation bridge
//!
//! Maps controller knobs, faders and pads to system volume, OBS Studio,
//! media keys, processes and HTTP requests.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use grass_midi::api;
use grass_midi::app::App;
use grass_midi::config::{watcher::ConfigWatcher, AppConfig, ConfigStore};
use grass_midi::device;
use grass_midi::dispatch::Dispatcher;
use grass_midi::drivers::{ConnectionStatus, ConsoleDriver, Driver, Effectors, ObsDriver};
use grass_midi::paths::AppPaths;

/// GrassMidi - Drive OBS and your desktop from a MIDI controller
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML, or JSON by extension)
    #[arg(short, long, env = "GRASS_MIDI_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Override the control API port from the config
    #[arg(long)]
    api_port: Option<u16>,

    /// List available MIDI input ports and exit
    #[arg(long)]
    list_ports: bool,

    /// Log actions to the console instead of performing them
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    if args.list_ports {
        return device::print_ports();
    }

    let paths = AppPaths::detect(args.config.clone());
    paths.ensure_directories()?;
    let _log_guard = init_logging(&args.log_level, &paths)?;

    info!("Starting GrassMidi v{}...", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", paths.config.display());

    let config = AppConfig::load_or_default(&paths.config).await?;
    if !paths.config.exists() {
        // The watcher needs a file to watch
        config.save(&paths.config).await?;
        info!("Wrote default configuration to {}", paths.config.display());
    }

    let (effectors, obs) = if args.dry_run {
        info!("🧪 Dry run: actions are logged, not performed");
        let console = Arc::new(ConsoleDriver::new("dry-run"));
        console.init().await?;
        (Effectors::console(console), None)
    } else {
        let obs = Arc::new(ObsDriver::from_config(&config.obs, &Handle::current()));
        obs.subscribe_connection_status(Arc::new(|status| match status {
            ConnectionStatus::Connected => info!("🎬 OBS connected"),
            ConnectionStatus::Disconnected => warn!("🎬 OBS disconnected"),
            ConnectionStatus::Reconnecting { attempt } => {
                info!("🎬 OBS reconnecting (attempt {})", attempt)
            },
        }));
        if let Err(e) = obs.init().await {
            warn!("⚠️  OBS unavailable, will keep retrying: {:#}", e);
        }
        (Effectors::system(Arc::clone(&obs), Handle::current())?, Some(obs))
    };

    let dispatcher = Arc::new(Dispatcher::new(
        effectors,
        config.binding_table(),
        config.obs.volume_mode,
    ));
    info!("Dispatcher ready ({} bindings)", config.bindings.len());

    let api_port = args.api_port.unwrap_or(config.api.port);
    let midi = config.midi.clone();
    let store = Arc::new(ConfigStore::new(paths.config.clone(), config));
    let app = Arc::new(App::new(dispatcher, store, obs));
    app.connect_device(&midi);

    let api_state = Arc::clone(&app);
    tokio::spawn(async move {
        if let Err(e) = api::start_server(api_state, api_port).await {
            error!("Control API stopped: {:#}", e);
        }
    });

    let config_watcher = ConfigWatcher::new(paths.config.clone())?;
    info!("Configuration loaded with hot-reload enabled");

    run_app(&app, config_watcher, shutdown_signal()).await;

    info!("Shutting down...");
    app.device.disconnect();
    if let Some(obs) = &app.obs {
        obs.shutdown().await?;
    }

    info!("GrassMidi shutdown complete");
    Ok(())
}

async fn run_app(
    app: &App,
    mut config_watcher: ConfigWatcher,
    shutdown: impl std::future::Future<Output = ()>,
) {
    info!("Ready to process MIDI events!");

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            Some(new_config) = config_watcher.next_config() => {
                info!("📝 Configuration file changed, reloading...");
                app.reload_config(new_config).await;
            }

            _ = &mut shutdown => {
                info!("Shutdown signal received, stopping event loop");
                break;
            }
        }
    }
}

/// Console output plus a daily JSON log file; keep the guard alive
fn init_logging(level: &str, paths: &AppPaths) -> Result<WorkerGuard> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let file_appender = tracing_appender::rolling::daily(&paths.logs_dir, "grass-midi.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .try_init()?;

    Ok(guard)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for CTRL+C: {}", e);
        std::future::pending::<()>().await;
    }
}
