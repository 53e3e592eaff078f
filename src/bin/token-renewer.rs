use std::process::ExitCode;

use clap::Parser;
use token_renewer::app;
use token_renewer::config::settings::{Args, LogFormat, LoggingConfig};
use token_renewer::utils::logging;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    // -------------------------------
    // 1. Read configuration
    // -------------------------------

    let args = Args::parse();
    let settings = match args.into_settings() {
        Ok(settings) => settings,
        Err(err) => {
            logging::init_logging(&LoggingConfig::new("info".to_owned(), LogFormat::Compact));
            error!("could not create configuration: {:#}", err);
            return ExitCode::FAILURE;
        }
    };

    // -------------------------------
    // 2. Logging
    // -------------------------------

    logging::init_logging(&settings.logging);

    // -------------------------------
    // 3. Check and renew all tokens, notify
    // -------------------------------

    match app::run(&settings).await {
        Ok(summary) => {
            info!(
                "{} of {} tokens ok, {} renewed",
                summary.succeeded, summary.total, summary.renewed
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}
