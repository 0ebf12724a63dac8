pub mod utils;

use std::net::SocketAddr;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::http_server;
use crate::service_state::StateSetupError;
use crate::{ServiceConfig, ServiceState};

const FINAL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);
const LOG_FILE_PREFIX: &str = "strongbox.log";

/// Keeps the running service's tasks and lets the owner stop them.
pub struct ShutdownHandle {
    graceful_waiter: JoinHandle<()>,
    handles: Vec<JoinHandle<()>>,
    shutdown_tx: watch::Sender<()>,
}

impl ShutdownHandle {
    /// Resolves once a signal or [`ShutdownHandle::shutdown`] stopped the service.
    pub async fn wait(self) {
        shutdown_and_join(self.graceful_waiter, self.handles).await;
    }

    /// Stop the service without waiting for a signal.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

fn env_filter(level: tracing::Level) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy()
}

/// Install the global subscriber: compact stdout, plus a daily rolling file
/// under `log_dir` when one is configured. The returned guards flush the
/// non-blocking writers and must outlive the service.
fn init_logging(service_config: &ServiceConfig) -> Vec<WorkerGuard> {
    let mut guards = Vec::new();

    let (stdout_writer, guard) = tracing_appender::non_blocking(std::io::stdout());
    guards.push(guard);
    let stdout_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(stdout_writer)
        .with_filter(env_filter(service_config.log_level));

    let file_layer = service_config.log_dir.as_ref().and_then(|log_dir| {
        if let Err(e) = std::fs::create_dir_all(log_dir) {
            eprintln!("Warning: logging to stdout only, cannot create {log_dir:?}: {e}");
            return None;
        }
        let appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
        let (file_writer, guard) = tracing_appender::non_blocking(appender);
        guards.push(guard);
        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_span_events(FmtSpan::CLOSE)
                .with_filter(env_filter(service_config.log_level)),
        )
    });

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(file_layer)
        .init();

    utils::register_panic_logger();
    utils::report_build_info();

    guards
}

/// Wait for the shutdown signal, then give the servers a bounded window to drain.
async fn shutdown_and_join(graceful_waiter: JoinHandle<()>, handles: Vec<JoinHandle<()>>) {
    let _ = graceful_waiter.await;

    let drained = timeout(FINAL_SHUTDOWN_TIMEOUT, join_all(handles)).await;
    if drained.is_err() {
        tracing::error!(
            secs = FINAL_SHUTDOWN_TIMEOUT.as_secs(),
            "servers did not drain in time, exiting"
        );
        std::process::exit(4);
    }
    tracing::info!("shutdown complete");
}

/// Create state and spawn the API server, returning the state handle.
///
/// The returned `ShutdownHandle` must be kept alive; dropping it does not stop the service.
pub async fn start_service(
    service_config: &ServiceConfig,
) -> Result<(ServiceState, ShutdownHandle), ServiceError> {
    let (graceful_waiter, shutdown_tx, shutdown_rx) = utils::graceful_shutdown_blocker()?;
    let state = ServiceState::from_config(service_config, Some(shutdown_rx.clone())).await?;

    let api_addr = SocketAddr::from(([0, 0, 0, 0], service_config.api_port));
    let api_state = state.clone();
    let api_config = http_server::Config::new(api_addr);
    let api_rx = shutdown_rx.clone();
    let api_handle = tokio::spawn(async move {
        if let Err(e) = http_server::run_api(api_config, api_state, api_rx).await {
            tracing::error!(error = %e, "API server failed");
        }
    });

    tracing::info!(
        api_port = service_config.api_port,
        ciphertext = service_config.ciphertext_store.kind(),
        sqlite = ?service_config.sqlite_path,
        "strongbox running"
    );

    let handle = ShutdownHandle {
        graceful_waiter,
        handles: vec![api_handle],
        shutdown_tx,
    };

    Ok((state, handle))
}

/// Spawns the daemon service and blocks until a shutdown signal is received.
pub async fn spawn_service(service_config: &ServiceConfig) {
    let _guards = init_logging(service_config);
    let handle = match start_service(service_config).await {
        Ok((_, handle)) => handle,
        Err(e) => {
            tracing::error!(error = %e, "unable to start strongbox");
            std::process::exit(3);
        }
    };
    handle.wait().await;
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("unable to install signal handlers: {0}")]
    Signals(#[from] std::io::Error),

    #[error(transparent)]
    State(#[from] StateSetupError),
}
