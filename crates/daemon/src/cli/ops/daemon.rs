use std::time::Duration;

use clap::Args;

use strongbox_daemon::state::AppState;
use strongbox_daemon::{spawn_service, ServiceConfig};

#[derive(Args, Debug, Clone)]
pub struct Daemon {
    /// Override API server port (default from config)
    #[arg(long)]
    pub api_port: Option<u16>,

    /// Directory for log files (logs to stdout only if not set)
    #[arg(long)]
    pub log_dir: Option<std::path::PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("state error: {0}")]
    StateError(#[from] strongbox_daemon::state::StateError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Daemon {
    type Error = DaemonError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let state = AppState::load(ctx.config_path.clone())?;
        let signing_key = state.load_signing_key()?;

        let config = ServiceConfig {
            api_port: self.api_port.unwrap_or(state.config.api_port),
            request_timeout: Duration::from_secs(state.config.request_timeout_secs),
            sqlite_path: Some(state.db_path),
            ciphertext_store: state.config.ciphertext_store,
            signing_key,
            password_cost: state.config.password_cost,
            log_level: tracing::Level::DEBUG,
            log_dir: self.log_dir.clone(),
        };

        spawn_service(&config).await;
        Ok("daemon ended".to_string())
    }
}
