use std::path::PathBuf;
use std::time::Duration;

use common::crypto::{PasswordCost, SigningKey};
use object_store::ObjectStoreConfig;

#[derive(Debug)]
pub struct Config {
    // http server configuration
    /// Port for the API HTTP server.
    pub api_port: u16,
    /// Deadline applied to every request's vault operation
    pub request_timeout: Duration,

    // data store configuration
    /// a path to a sqlite database, if not set then an
    ///  in-memory database will be used
    pub sqlite_path: Option<PathBuf>,
    /// Ciphertext storage backend configuration
    pub ciphertext_store: ObjectStoreConfig,

    // crypto
    pub signing_key: SigningKey,
    pub password_cost: PasswordCost,

    // logging
    pub log_level: tracing::Level,
    /// Directory for log files (optional, logs to stdout only if not set)
    pub log_dir: Option<PathBuf>,
}
