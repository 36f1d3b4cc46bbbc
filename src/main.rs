use clap::Parser;
use litepipe::api::router;
use litepipe::listener::bind_with_retry;
use litepipe::logging::{FileLogger, setup_logging};
use litepipe::{AppState, LitePipeConfig, load_config};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{self, error, info};

const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Webhook-triggered task runner
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Path to the config file (JSON, or TOML when it ends in .toml)
    #[arg(short, long, env = "LITEPIPE_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let config: LitePipeConfig = match load_config(&args.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    let file_logger = config
        .log_directory
        .clone()
        .map(|dir| FileLogger::new(dir).with_max_files(config.log_max_files));
    let _log_guard = match setup_logging(file_logger.as_ref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    info!("LitePipe version {}", env!("CARGO_PKG_VERSION"));
    info!("PID: {}", std::process::id());
    info!("Using config at {:?}", args.config);
    config.log_summary();

    let (listener, port) = match bind_with_retry(&config.bind_address, config.port).await {
        Ok(bound) => bound,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    info!("Listening on {}:{}", config.bind_address, port);
    let app = router(Arc::new(AppState::new(config)));

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}
