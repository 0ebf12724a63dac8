//! On-disk application state: the state directory and what lives in it.
//!
//! ```text
//! ~/.strongbox/
//! ├── config.toml       # AppConfig
//! ├── signing_key.pem   # token signing key
//! ├── db.sqlite         # metadata store
//! └── ciphertext/       # default local ciphertext store
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use common::crypto::{Crypto, CryptoError, PasswordCost, SigningKey};
use object_store::ObjectStoreConfig;

pub const APP_NAME: &str = "strongbox";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const SIGNING_KEY_FILE_NAME: &str = "signing_key.pem";
pub const DB_FILE_NAME: &str = "db.sqlite";
pub const CIPHERTEXT_DIR_NAME: &str = "ciphertext";

pub const DEFAULT_API_PORT: u16 = 5080;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_api_port")]
    pub api_port: u16,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    pub ciphertext_store: ObjectStoreConfig,
    #[serde(default)]
    pub password_cost: PasswordCost,
}

fn default_api_port() -> u16 {
    DEFAULT_API_PORT
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl AppConfig {
    /// Defaults for a fresh state directory: ciphertext on local disk next to
    /// the database.
    pub fn for_dir(state_dir: &Path) -> Self {
        Self {
            api_port: DEFAULT_API_PORT,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            ciphertext_store: ObjectStoreConfig::Local {
                path: state_dir.join(CIPHERTEXT_DIR_NAME),
            },
            password_cost: PasswordCost::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub state_dir: PathBuf,
    pub config: AppConfig,
    pub db_path: PathBuf,
    pub signing_key_path: PathBuf,
}

impl AppState {
    /// `~/.strongbox`, unless overridden.
    pub fn state_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }
        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{APP_NAME}")))
    }

    /// Create a new state directory with a fresh signing key.
    ///
    /// Refuses to touch a directory that already holds a config.
    pub fn init(
        custom_path: Option<PathBuf>,
        config: Option<AppConfig>,
    ) -> Result<Self, StateError> {
        let state_dir = Self::state_dir(custom_path)?;
        let config_path = state_dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Err(StateError::AlreadyInitialized(state_dir));
        }

        std::fs::create_dir_all(&state_dir)?;
        let config = config.unwrap_or_else(|| AppConfig::for_dir(&state_dir));
        if let ObjectStoreConfig::Local { path } = &config.ciphertext_store {
            std::fs::create_dir_all(path)?;
        }

        let signing_key = Crypto::new(config.password_cost).new_signing_key();
        let signing_key_path = state_dir.join(SIGNING_KEY_FILE_NAME);
        std::fs::write(&signing_key_path, signing_key.to_pem())?;
        restrict_permissions(&signing_key_path)?;

        std::fs::write(&config_path, toml::to_string_pretty(&config)?)?;

        tracing::info!(dir = ?state_dir, "initialized state directory");
        Ok(Self {
            db_path: state_dir.join(DB_FILE_NAME),
            signing_key_path,
            state_dir,
            config,
        })
    }

    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let state_dir = Self::state_dir(custom_path)?;
        if !state_dir.exists() {
            return Err(StateError::NotInitialized(state_dir));
        }

        let config_path = state_dir.join(CONFIG_FILE_NAME);
        let raw = std::fs::read_to_string(&config_path)
            .map_err(|_| StateError::NotInitialized(state_dir.clone()))?;
        let config: AppConfig = toml::from_str(&raw)?;

        Ok(Self {
            db_path: state_dir.join(DB_FILE_NAME),
            signing_key_path: state_dir.join(SIGNING_KEY_FILE_NAME),
            state_dir,
            config,
        })
    }

    pub fn load_signing_key(&self) -> Result<SigningKey, StateError> {
        let pem = std::fs::read_to_string(&self.signing_key_path)?;
        Ok(SigningKey::from_pem(&pem)?)
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("could not determine the home directory")]
    NoHomeDirectory,

    #[error("state directory {0:?} is not initialized, run `strongbox init`")]
    NotInitialized(PathBuf),

    #[error("state directory {0:?} is already initialized")]
    AlreadyInitialized(PathBuf),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("unable to write config: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    #[error("invalid signing key: {0}")]
    SigningKey(#[from] CryptoError),
}
