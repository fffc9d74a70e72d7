use std::sync::Arc;
use std::time::Duration;

use plyorde_api::{ApiServer, ApiState};
use plyorde_config::{AppConfig, LimitSettings, SiteDirectory};
use plyorde_connector::{ConnectorClient, ConnectorTimeouts};
use plyorde_fileman::{FileManager, FileManagerLimits};
use plyorde_telemetry::{LogFormat, LoggingConfig, Metrics};
use tracing::{info, warn};

use crate::error::{AppError, AppResult};

const BUILD_SHA: &str = match option_env!("PLYORDE_BUILD_SHA") {
    Some(sha) => sha,
    None => "dev",
};

/// Entry point for the Plyorde boot sequence.
///
/// # Errors
///
/// Returns an error if configuration, telemetry or the listener fail.
pub async fn run_app() -> AppResult<()> {
    let config =
        plyorde_config::load_from_env().map_err(|err| AppError::config("config.load", err))?;
    plyorde_telemetry::init_logging(&LoggingConfig {
        level: &config.logging.level,
        format: LogFormat::from_name(config.logging.format.as_deref()),
        build_sha: BUILD_SHA,
    })
    .map_err(|err| AppError::telemetry("telemetry.init", err))?;

    let telemetry = Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;
    let api = build_server(&config, telemetry)?;

    let addr = config.server.bind_addr;
    info!(addr = %addr, sites = config.sites.len(), "Launching API listener");
    api.serve(addr, shutdown_signal())
        .await
        .map_err(|err| AppError::api_server("api_server.serve", err))?;
    info!("API server shutdown complete");
    Ok(())
}

/// Wire the connector client, orchestrator and site directory into a server.
pub(crate) fn build_server(config: &AppConfig, telemetry: Metrics) -> AppResult<ApiServer> {
    let timeouts = ConnectorTimeouts {
        metadata: config.connector.metadata_timeout(),
        archive: config.connector.archive_timeout(),
    };
    let client = ConnectorClient::new(timeouts)
        .map_err(|err| AppError::connector("connector.client", err))?
        .with_metrics(telemetry.clone());
    let files = FileManager::new(Arc::new(client), file_manager_limits(&config.limits))
        .with_metrics(telemetry.clone());

    let sites = SiteDirectory::from_config(config);
    if sites.site_count() == 0 {
        warn!("no sites configured; every file route will answer 404");
    }
    Ok(ApiServer::new(ApiState::new(
        files,
        Arc::new(sites),
        telemetry,
    )))
}

pub(crate) const fn file_manager_limits(settings: &LimitSettings) -> FileManagerLimits {
    FileManagerLimits {
        copy_concurrency: settings.copy_concurrency,
        copy_max_rename_attempts: settings.copy_max_rename_attempts,
        upload_concurrency: settings.upload_concurrency,
        upload_max_rename_attempts: settings.upload_max_rename_attempts,
        delete_chunk_size: settings.delete_chunk_size,
        delete_pause: Duration::from_millis(settings.delete_pause_ms),
        archive_max_entries: settings.archive_max_entries,
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            let err = AppError::io("signal.ctrl_c", err);
            warn!(error = %err, "ctrl-c handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                let err = AppError::io("signal.sigterm", err);
                warn!(error = %err, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("shutdown signal received");
}
