use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use common::clock::SystemClock;
use common::context::Context;
use common::crypto::Crypto;
use common::vault::Vault;
use object_store::{ObjectCiphertextStore, ObjectStoreError};

use crate::database::{Database, DatabaseSetupError};
use crate::ServiceConfig;

/// Everything a request handler needs. Cheap to clone.
#[derive(Clone, Debug)]
pub struct State {
    vault: Vault,
    database: Database,
    request_timeout: Duration,
    shutdown: Option<watch::Receiver<()>>,
}

impl State {
    pub async fn from_config(
        config: &ServiceConfig,
        shutdown: Option<watch::Receiver<()>>,
    ) -> Result<Self, StateSetupError> {
        let database = match &config.sqlite_path {
            Some(path) => Database::open(path).await?,
            None => Database::in_memory().await?,
        };
        let ciphertext = ObjectCiphertextStore::new(config.ciphertext_store.clone()).await?;

        let vault = Vault::new(
            Arc::new(database.clone()),
            Arc::new(ciphertext),
            Arc::new(Crypto::new(config.password_cost)),
            &config.signing_key,
            Arc::new(SystemClock),
        );

        Ok(Self {
            vault,
            database,
            request_timeout: config.request_timeout,
            shutdown,
        })
    }

    pub fn vault(&self) -> &Vault {
        &self.vault
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn is_shutting_down(&self) -> bool {
        match &self.shutdown {
            Some(rx) => rx.has_changed().unwrap_or(true),
            None => false,
        }
    }

    /// A fresh context for one request: bounded by the request timeout and
    /// cancelled when the process starts shutting down.
    pub fn request_context(&self) -> Context {
        let ctx = Context::background().with_timeout(self.request_timeout);
        match &self.shutdown {
            Some(rx) => ctx.with_signal(rx.clone()),
            None => ctx,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateSetupError {
    #[error("failed to set up the metadata database: {0}")]
    Database(#[from] DatabaseSetupError),

    #[error("failed to set up the ciphertext store: {0}")]
    Ciphertext(#[from] ObjectStoreError),
}
