mod app;
mod cli;
mod form;
mod output;
mod shell;

use std::ffi::OsStr;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use eventcache_core::Config;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use app::App;
use cli::{Cli, TopCommand};

/// Set up logging. Use RUST_LOG to control the level (e.g. RUST_LOG=debug).
/// With a log file configured, output goes there instead of stderr; keep the
/// returned guard alive so buffered lines are flushed on exit.
fn init_tracing(log_file: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path.file_name().unwrap_or_else(|| OsStr::new("eventcache.log"));
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .with(filter)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::stderr))
                .with(filter)
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(url) = cli.api_url {
        config.api_base_url = url;
    }
    if let Some(strategy) = cli.strategy {
        config.update_strategy = strategy.into();
    }

    let guard = init_tracing(config.log_file.as_deref());
    info!(api = %config.api_base_url, strategy = ?config.update_strategy, "eventcache starting");

    let mut app = App::new(&config, cli.format)?;
    let result = match cli.command {
        TopCommand::Shell => shell::run(&mut app).await.map(|()| true),
        TopCommand::Event(command) => app.run(command).await,
    };
    app.shutdown();

    if !result? {
        drop(guard);
        std::process::exit(1);
    }
    Ok(())
}
