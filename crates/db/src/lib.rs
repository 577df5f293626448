//! Ephemeral PostgreSQL provisioning and dual-resource transactions.
//!
//! The pieces, leaves first:
//!
//! - [`provision::EphemeralDb`]: a uniquely named database created for one
//!   test run and dropped afterwards.
//! - [`store`]: content-addressed file storage (SHA-256-derived names).
//! - [`tx::FileTransaction`]: one database transaction plus one directory
//!   of files under a single commit/rollback umbrella, with compensating
//!   deletes on failure.
//! - [`dispatch::Dispatcher`]: routes typed actions to their executors.
//! - [`database::Database`]: the facade wiring pool, files, and registry.
//!
//! Server access goes through narrow backend traits; the PostgreSQL
//! implementations live in [`postgres`].

pub mod database;
pub mod dispatch;
pub mod error;
pub mod postgres;
pub mod provision;
pub mod store;
pub mod tx;

pub use database::Database;
pub use dispatch::{Action, ActionExecutor, Dispatcher};
pub use error::DbError;
pub use provision::{EphemeralDb, ProvisioningBackend};
pub use store::UploadedFile;
pub use tx::{ExecResult, FileTransaction, SqlValue, TxBackend};

use sqlx::PgPool;

/// Cheap connectivity probe.
pub async fn health_check(pool: &PgPool) -> Result<(), DbError> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
