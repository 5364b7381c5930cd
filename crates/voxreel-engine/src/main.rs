//! Batch assembly engine binary.

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use voxreel_engine::{run_batch, EngineConfig};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("voxreel=info".parse().unwrap());

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting voxreel-engine");

    if let Err(e) = voxreel_media::check_ffmpeg() {
        error!("ffmpeg unavailable: {}", e);
        std::process::exit(1);
    }
    if let Err(e) = voxreel_media::check_ffprobe() {
        error!("ffprobe unavailable: {}", e);
        std::process::exit(1);
    }

    let config = match EngineConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };
    info!(
        batch = %config.batch_dir().display(),
        aspect = %config.target_ratio,
        "Engine config loaded"
    );

    match run_batch(&config).await {
        Ok(summary) => {
            info!(
                succeeded = summary.succeeded,
                failed = summary.failed,
                total = summary.total(),
                "Batch finished"
            );
        }
        Err(e) => {
            error!("Batch aborted: {}", e);
            std::process::exit(1);
        }
    }
}
