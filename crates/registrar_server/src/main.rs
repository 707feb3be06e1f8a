//! Registrar server entry point.

use anyhow::{Context, Result};
use log::{info, warn};
use registrar_core::{init_logging, open_db, FsBlobStore, LogConfig};
use registrar_server::config::Config;
use registrar_server::{app, configure_state, AppState};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().context("failed to load configuration")?;

    init_logging(&LogConfig {
        level: config.logging.level.clone(),
        log_dir: Some(config.logging.log_dir.clone()),
        echo_stderr: true,
    })?;
    info!(
        "event=server_config module=server status=ok bind={} database={} storage={}",
        config.bind_address(),
        config.storage.database_path.display(),
        config.storage.storage_dir.display()
    );

    let conn = open_db(&config.storage.database_path).with_context(|| {
        format!(
            "failed to open database `{}`",
            config.storage.database_path.display()
        )
    })?;
    let blobs = FsBlobStore::open(&config.storage.storage_dir).with_context(|| {
        format!(
            "failed to open storage directory `{}`",
            config.storage.storage_dir.display()
        )
    })?;

    let state = configure_state(AppState::new(conn, Arc::new(blobs)), &config);
    let router = app(state, &config);

    let listener = tokio::net::TcpListener::bind(config.bind_address())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_address()))?;
    info!(
        "event=server_start module=server status=ok addr={}",
        config.bind_address()
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(config.server.shutdown_timeout_secs))
        .await?;

    info!("event=server_stop module=server status=ok");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM and arms the shutdown deadline.
async fn shutdown_signal(timeout_secs: u64) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("event=signal_install module=server status=error signal=ctrl_c error={err}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!("event=signal_install module=server status=error signal=sigterm error={err}");
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("event=server_shutdown module=server status=start timeout_secs={timeout_secs}");
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(timeout_secs)).await;
        warn!("event=server_shutdown module=server status=error reason=timeout");
        std::process::exit(1);
    });
}
