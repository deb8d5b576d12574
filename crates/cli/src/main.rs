use std::process::ExitCode;

use anyhow::Context;

use appraisy_core::config::{AppConfig, LoadOptions};

fn init_logging() -> anyhow::Result<()> {
    use appraisy_core::config::LogFormat::{Compact, Json, Pretty};
    use tracing::Level;

    let config = AppConfig::load(LoadOptions::default()).context("loading configuration")?;
    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    // Commands validate configuration themselves and report structured
    // errors; a broken config only costs us the log subscriber here.
    if let Err(error) = init_logging() {
        eprintln!("appraisy: logging disabled: {error:#}");
    }

    appraisy_cli::run()
}
