use std::path::PathBuf;

use clap::{Args, ValueEnum};

use object_store::ObjectStoreConfig;
use strongbox_daemon::state::{AppConfig, AppState, StateError};

#[derive(ValueEnum, Debug, Clone, Copy, Default)]
pub enum CiphertextBackend {
    /// Files under the state directory (or --ciphertext-path)
    #[default]
    Local,
    /// Nothing persisted, for trying things out
    Memory,
    /// S3-compatible object storage
    S3,
}

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// Port for the API server
    #[arg(long)]
    pub api_port: Option<u16>,

    /// Where ciphertext is stored
    #[arg(long, value_enum, default_value_t)]
    pub ciphertext_backend: CiphertextBackend,

    /// Directory for the local backend (defaults to <state dir>/ciphertext)
    #[arg(long)]
    pub ciphertext_path: Option<PathBuf>,

    /// S3 endpoint URL, e.g. http://localhost:9000
    #[arg(long, required_if_eq("ciphertext_backend", "s3"))]
    pub s3_endpoint: Option<String>,

    #[arg(long, required_if_eq("ciphertext_backend", "s3"))]
    pub s3_bucket: Option<String>,

    #[arg(long, required_if_eq("ciphertext_backend", "s3"))]
    pub s3_access_key: Option<String>,

    #[arg(long, required_if_eq("ciphertext_backend", "s3"))]
    pub s3_secret_key: Option<String>,

    #[arg(long)]
    pub s3_region: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("state error: {0}")]
    StateError(#[from] StateError),

    #[error("missing option for the s3 backend: --{0}")]
    MissingS3Option(&'static str),
}

impl Init {
    fn ciphertext_store(&self, state_dir: &std::path::Path) -> Result<ObjectStoreConfig, InitError> {
        Ok(match self.ciphertext_backend {
            CiphertextBackend::Memory => ObjectStoreConfig::Memory,
            CiphertextBackend::Local => ObjectStoreConfig::Local {
                path: self
                    .ciphertext_path
                    .clone()
                    .unwrap_or_else(|| state_dir.join(strongbox_daemon::state::CIPHERTEXT_DIR_NAME)),
            },
            CiphertextBackend::S3 => ObjectStoreConfig::S3 {
                endpoint: required(&self.s3_endpoint, "s3-endpoint")?,
                access_key: required(&self.s3_access_key, "s3-access-key")?,
                secret_key: required(&self.s3_secret_key, "s3-secret-key")?,
                bucket: required(&self.s3_bucket, "s3-bucket")?,
                region: self.s3_region.clone(),
            },
        })
    }
}

fn required(value: &Option<String>, name: &'static str) -> Result<String, InitError> {
    value.clone().ok_or(InitError::MissingS3Option(name))
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let state_dir = AppState::state_dir(ctx.config_path.clone())?;

        let mut config = AppConfig::for_dir(&state_dir);
        config.ciphertext_store = self.ciphertext_store(&state_dir)?;
        if let Some(port) = self.api_port {
            config.api_port = port;
        }

        let state = AppState::init(Some(state_dir), Some(config))?;

        Ok(format!(
            "Initialized strongbox in {}\n  api_port:   {}\n  ciphertext: {}",
            state.state_dir.display(),
            state.config.api_port,
            state.config.ciphertext_store.kind()
        ))
    }
}
