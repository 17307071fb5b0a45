mod cli;
use cli::{CliMode, USAGE, parse_cli_mode, run_agenda_mode, run_posts_mode};
mod tui;
use tui::{login, logout, run_tui};

use pastelcal::storage::config::Config;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _guard = setup_logging();

    let cli_mode = match parse_cli_mode() {
        Ok(mode) => mode,
        Err(err) => {
            eprintln!("Error: {}", err);
            println!("{}", USAGE);
            return Ok(());
        }
    };

    let result = match cli_mode {
        CliMode::Default { sample } => run_tui(sample).await,
        CliMode::AgendaDate(date) => run_agenda_mode(date),
        CliMode::Login(email) => login(&email).await,
        CliMode::Logout => logout(),
        CliMode::Posts => run_posts_mode().await,
        CliMode::Help => {
            println!("{}", USAGE);
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!("pastelcal exited with error: {:#}", e);
    }
    result
}

fn setup_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_dir = Config::config_dir();
    std::fs::create_dir_all(&log_dir).ok()?;

    let file_appender = tracing_appender::rolling::daily(log_dir, "pastelcal.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(false)
        .init();

    tracing::info!("pastelcal started");
    Some(guard)
}
