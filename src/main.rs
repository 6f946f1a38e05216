use clap::Parser;
use crossbeam::channel::RecvTimeoutError;
use log::{debug, error, info, warn};
use rotabar::bar::{BarManager, ItemSnapshot};
use rotabar::config::AppConfig;
use rotabar::core::{ThreadClock, UpdateScheduler};
use rotabar::render::Renderer;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// rotabar - An animated status bar with per-item update scheduling
#[derive(Parser, Debug, Clone)]
#[command(name = "rotabar")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file to load instead of the default location
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Debug verbosity level (0=quiet, 1=info, 2=debug, 3=trace)
    #[arg(short = 'd', long = "debug", value_name = "LEVEL", default_value = "0")]
    debug: u8,

    /// Force one update of every item, print the bar state and exit
    #[arg(long = "once")]
    once: bool,

    /// Print the bar state as JSON and exit
    #[arg(long = "dump")]
    dump: bool,
}

/// Renderer used when no compositor is attached: logs what would be drawn.
struct LogRenderer;

impl Renderer for LogRenderer {
    fn draw_item(&mut self, item: &ItemSnapshot, frame: Option<&image::RgbaImage>) {
        match frame {
            Some(frame) => debug!(
                "draw '{}' with {}x{} frame",
                item.name,
                frame.width(),
                frame.height()
            ),
            None => debug!("draw '{}'", item.name),
        }
    }
}

fn load_config(cli: &Cli) -> AppConfig {
    if let Some(path) = &cli.config {
        match AppConfig::load_from_path(path) {
            Ok(config) => {
                info!("Loaded configuration from {}", path.display());
                return config;
            }
            Err(e) => {
                warn!("Failed to load config '{}': {e}", path.display());
                return AppConfig::default();
            }
        }
    }
    match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            warn!("Failed to load config, using defaults: {e}");
            AppConfig::default()
        }
    }
}

fn print_snapshot(bar: &BarManager) {
    match serde_json::to_string_pretty(&bar.snapshot()) {
        Ok(json) => println!("{json}"),
        Err(e) => error!("Failed to serialize bar state: {e}"),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Level 0 (default): warn only. RUST_LOG overrides the CLI setting.
    let log_level = match cli.debug {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    warn!("Starting rotabar v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&cli);
    let clock = Arc::new(ThreadClock::new(config.bar.refresh_interval()));

    let mut bar = BarManager::new(clock);
    for item_config in &config.items {
        bar.add_item(item_config.clone());
    }
    info!("Loaded {} items", bar.len());

    if cli.dump {
        print_snapshot(&bar);
        bar.shutdown();
        return;
    }

    if cli.once {
        if let Err(e) = bar.poll_all(true) {
            error!("Forced update failed: {e}");
        }
        print_snapshot(&bar);
        bar.shutdown();
        return;
    }

    let ticks = bar.rotators().tick_events();
    let bar = Arc::new(RwLock::new(bar));
    let stop = Arc::new(AtomicBool::new(false));

    // Tick drain loop: applies queued frame clock events to the bar. The
    // timeout keeps the loop responsive to the stop flag even when no
    // rotator is enabled.
    let drain_bar = bar.clone();
    let drain_stop = stop.clone();
    let drain = tokio::task::spawn_blocking(move || {
        while !drain_stop.load(Ordering::Relaxed) {
            match ticks.recv_timeout(Duration::from_millis(250)) {
                Ok(event) => {
                    let mut bar = drain_bar.blocking_write();
                    bar.handle_tick(event.timestamp);
                    bar.drain_ticks();
                    bar.render_into(&mut LogRenderer);
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
    });

    // Slow-path poll loop for script-backed items.
    let scheduler = UpdateScheduler::new(bar.clone());
    let poll_interval = config.bar.poll_interval();
    let poll = tokio::spawn(async move {
        scheduler.run(poll_interval).await;
    });

    info!("Update loop running");
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {e}");
    }
    info!("Shutting down");

    poll.abort();
    stop.store(true, Ordering::Relaxed);
    bar.write().await.shutdown();
    if let Err(e) = drain.await {
        warn!("Tick drain task did not exit cleanly: {e}");
    }
}
