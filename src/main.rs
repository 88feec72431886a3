//! CLI entry point for the NYC traffic volume map.
//!
//! Provides subcommands for serving the interactive map and exporting the
//! aggregated table.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nyc_traffic_map::{
    aggregate::build_dataset,
    loader::DEFAULT_INPUT,
    output::{DEFAULT_SNAPSHOT, export_aggregated},
    server::{AppState, build_router},
    variant::Variant,
};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "nyc_traffic_map")]
#[command(about = "Map of NYC automated traffic volume counts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate the counts and serve the interactive map
    Serve {
        /// Traffic counts CSV
        #[arg(short, long, default_value = DEFAULT_INPUT)]
        input: PathBuf,

        /// Which map to serve
        #[arg(short, long, value_enum, default_value_t = Variant::Scatter)]
        variant: Variant,

        /// Listen address
        #[arg(short, long, default_value = "127.0.0.1:8051")]
        listen: String,

        /// HTML file rewritten with the most recent figure
        #[arg(short, long, default_value = DEFAULT_SNAPSHOT)]
        snapshot: PathBuf,
    },
    /// Aggregate the counts and write the resulting table as CSV
    Export {
        /// Traffic counts CSV
        #[arg(short, long, default_value = DEFAULT_INPUT)]
        input: PathBuf,

        /// Which variant's aggregation to run
        #[arg(short, long, value_enum, default_value_t = Variant::Scatter)]
        variant: Variant,

        /// CSV file to write
        #[arg(short, long, default_value = "aggregated.csv")]
        output: PathBuf,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/nyc_traffic_map.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("nyc_traffic_map.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive(tracing::Level::INFO.into()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(
            EnvFilter::from_env("RUST_LOG_JSON").add_directive(tracing::Level::DEBUG.into()),
        );

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            input,
            variant,
            listen,
            snapshot,
        } => {
            let dataset = build_dataset(&input, variant)?;
            let state = Arc::new(AppState::new(dataset, snapshot));
            let app = build_router(state);

            let listener = tokio::net::TcpListener::bind(&listen)
                .await
                .with_context(|| format!("failed to bind {}", listen))?;
            info!(%variant, "Serving map on http://{}", listen);

            axum::serve(listener, app).await?;
        }
        Commands::Export {
            input,
            variant,
            output,
        } => {
            let dataset = build_dataset(&input, variant)?;
            export_aggregated(&output, &dataset.records)?;
        }
    }

    Ok(())
}
