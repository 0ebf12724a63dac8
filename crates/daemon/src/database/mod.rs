mod metadata_store;
mod sqlite;

use std::ops::Deref;
use std::path::Path;

use sqlx::SqlitePool;

#[derive(Clone, Debug)]
pub struct Database(SqlitePool);

impl Database {
    /// Open (creating if needed) the database file at `path` and migrate it.
    pub async fn open(path: &Path) -> Result<Self, DatabaseSetupError> {
        let pool = sqlite::connect_sqlite(path).await?;
        sqlite::migrate_sqlite(&pool).await?;
        Ok(Database::new(pool))
    }

    /// A private in-memory database, gone when the last handle drops.
    pub async fn in_memory() -> Result<Self, DatabaseSetupError> {
        let pool = sqlite::connect_sqlite_memory().await?;
        sqlite::migrate_sqlite(&pool).await?;
        Ok(Database::new(pool))
    }

    pub fn new(pool: SqlitePool) -> Self {
        Self(pool)
    }

    /// Cheap round trip used by the readiness probe.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.0).await?;
        Ok(())
    }
}

impl Deref for Database {
    type Target = SqlitePool;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DatabaseSetupError {
    #[error("error occurred while attempting database migration: {0}")]
    MigrationFailed(#[from] sqlx::migrate::MigrateError),

    #[error("unable to perform initial connection and check of the database: {0}")]
    Unavailable(#[from] sqlx::Error),

    #[error("unable to create the database directory: {0}")]
    Io(#[from] std::io::Error),
}
