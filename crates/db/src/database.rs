//! The database facade tying the pieces together.

use std::path::{Path, PathBuf};

use sqlx::PgPool;

use crate::dispatch::{Action, Dispatcher};
use crate::error::DbError;
use crate::postgres::PgTx;
use crate::tx::FileTransaction;

/// A provisioned database plus its file directory and action registry.
///
/// Holds the driver pool by composition and exposes only what callers
/// need: opening coordinated transactions and executing typed actions.
/// All configuration arrives through the constructor; there is no global
/// state behind this type.
pub struct Database {
    pool: PgPool,
    files_root: PathBuf,
    dispatcher: Dispatcher,
}

impl Database {
    /// Wrap `pool` with `files_root` as the file-storage directory and an
    /// action registry fixed for this instance's lifetime.
    ///
    /// The directory is exclusively owned by this instance (typically a
    /// fresh temporary directory); no two live databases share one.
    pub fn new(pool: PgPool, files_root: impl Into<PathBuf>, dispatcher: Dispatcher) -> Self {
        Self {
            pool,
            files_root: files_root.into(),
            dispatcher,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn files_root(&self) -> &Path {
        &self.files_root
    }

    /// Begin a transaction spanning the database and the file directory.
    pub async fn begin(&self) -> Result<FileTransaction<PgTx>, DbError> {
        let tx = self.pool.begin().await?;
        Ok(FileTransaction::new(PgTx::new(tx), self.files_root.clone()))
    }

    /// Validate and execute a typed action through the registry.
    pub async fn execute(&self, action: &dyn Action) -> Result<serde_json::Value, DbError> {
        self.dispatcher.execute(action).await
    }
}
