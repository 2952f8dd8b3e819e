//! MailSentry - resilient security monitoring for a bulk-email platform

use clap::Parser;
use mailsentry::config::Config;
use mailsentry::server::HttpServer;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mailsentry", version, about = "Security monitoring service")]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, env = "MAILSENTRY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // A failed monitor bootstrap leaves the control surface up, answering
    // 503 on the security routes instead of killing the process.
    let monitor = match mailsentry::bootstrap_monitor(&config).await {
        Ok(monitor) => {
            monitor.start();
            Some(monitor)
        }
        Err(e) => {
            warn!("Monitor initialization failed, serving without it: {}", e);
            None
        }
    };

    let result = HttpServer::new(&config, monitor.clone()).start().await;

    if let Some(monitor) = monitor {
        monitor.destroy().await;
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Server error: {}", e);
            ExitCode::FAILURE
        }
    }
}
