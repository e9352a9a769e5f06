mod api;
mod app;
mod auth;
mod cache;
mod commands;
mod config;
mod storage;

use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable holding the log filter.
const LOG_ENV: &str = "FOLIO_LOG";

#[derive(Parser, Debug)]
#[command(name = "folio-admin")]
#[command(about = "Admin client for a portfolio site's content API")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/folio-admin/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Site root the API lives under; overrides the config file and FOLIO_BASE_API
  #[arg(long)]
  base_url: Option<String>,

  /// Also log to stderr, at debug level unless FOLIO_LOG says otherwise
  #[arg(short, long)]
  verbose: bool,

  #[command(subcommand)]
  command: commands::Command,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _log_guard = init_tracing(args.verbose)?;

  // Load configuration
  let mut config = config::Config::load(args.config.as_deref())?;
  config.apply_base_url_override(args.base_url);

  let mut app = app::AppContext::new(config)?;
  commands::dispatch(args.command, &mut app).await
}

/// Log to a daily file under the data directory, and to stderr with
/// `--verbose`. The returned guard flushes the file writer on drop.
fn init_tracing(verbose: bool) -> Result<Option<WorkerGuard>> {
  let level = if verbose { "debug" } else { "warn" };
  let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level));

  let log_dir = dirs::data_dir().map(|dir| dir.join("folio-admin").join("logs"));
  let (file_layer, guard) = match log_dir {
    Some(dir) => {
      std::fs::create_dir_all(&dir)
        .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;
      let appender = tracing_appender::rolling::daily(dir, "folio-admin.log");
      let (writer, guard) = tracing_appender::non_blocking(appender);
      (
        Some(fmt::layer().with_writer(writer).with_ansi(false)),
        Some(guard),
      )
    }
    None => (None, None),
  };

  let stderr_layer = verbose.then(|| fmt::layer().with_writer(std::io::stderr));

  tracing_subscriber::registry()
    .with(filter)
    .with(file_layer)
    .with(stderr_layer)
    .try_init()
    .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;

  Ok(guard)
}
