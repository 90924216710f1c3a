//! StreamLog Server Binary
//!
//! Main entry point for the StreamLog commit log server.
//!
//! ## Configuration
//! All configuration is done via environment variables:
//!
//! - `STREAMLOG_ADDR`: server bind address (default: 127.0.0.1:8400)
//! - `STREAMLOG_DATA`: log directory (default: ./data/log)
//! - `STREAMLOG_MAX_STORE_BYTES`: segment store capacity in bytes
//! - `STREAMLOG_MAX_INDEX_BYTES`: segment index capacity in bytes
//!
//! ## Logging
//! Logging is controlled via the `RUST_LOG` environment variable:
//! ```bash
//! RUST_LOG=debug cargo run -p streamlog-server
//! ```
//!
//! ## Shutdown
//! SIGINT or SIGTERM stops the accept loop, then the log is closed so
//! buffered frames are flushed and every index file is truncated to its
//! valid entries.

use std::sync::Arc;

use streamlog_server::Server;
use streamlog_storage::{Config, Log, SegmentConfig};
use tokio::net::TcpListener;
use tokio::sync::watch;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let bind_addr =
        std::env::var("STREAMLOG_ADDR").unwrap_or_else(|_| "127.0.0.1:8400".to_string());
    let data_dir = std::env::var("STREAMLOG_DATA").unwrap_or_else(|_| "./data/log".to_string());

    let mut segment = SegmentConfig::default();
    if let Ok(value) = std::env::var("STREAMLOG_MAX_STORE_BYTES") {
        segment.max_store_bytes = value.parse()?;
    }
    if let Ok(value) = std::env::var("STREAMLOG_MAX_INDEX_BYTES") {
        segment.max_index_bytes = value.parse()?;
    }

    tracing::info!("Opening log at {}", data_dir);
    let log = Arc::new(Log::open(&data_dir, Config { segment })?);

    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("StreamLog server listening on {}", bind_addr);

    let (shutdown_tx, shutdown_rx) = watch::channel(());

    tokio::spawn(async move {
        let ctrl_c = async {
            tokio::signal::ctrl_c()
                .await
                .expect("failed to install Ctrl+C handler");
        };

        #[cfg(unix)]
        let terminate = async {
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install signal handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                tracing::info!("Received SIGINT (Ctrl+C), initiating graceful shutdown");
            },
            _ = terminate => {
                tracing::info!("Received SIGTERM, initiating graceful shutdown");
            },
        }

        let _ = shutdown_tx.send(());
    });

    let server = Server::new(log.clone());
    server.serve(listener, shutdown_rx).await?;

    // Flush buffered frames and truncate the index files before exit.
    let close_log = log.clone();
    tokio::task::spawn_blocking(move || close_log.close()).await??;

    tracing::info!("StreamLog server shut down gracefully");
    Ok(())
}
