use dbarena_core::CoreError;

/// Database-layer error type.
///
/// Every failure is returned to the immediate caller; nothing is retried
/// automatically except the single rollback a [`crate::tx::FileTransaction`]
/// performs when an operation inside it fails.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A database with the generated name already exists. Collisions are
    /// astronomically unlikely with 128-bit suffixes, so this is surfaced
    /// as a distinct, caller-visible error instead of being retried.
    #[error("database {name:?} already exists")]
    AlreadyExists { name: String },

    /// `set_schema` was called a second time on the same instance. Tracked
    /// by a local flag, not by querying the server.
    #[error("schema already set")]
    SchemaAlreadySet,

    /// A command failed its own validity check; no executor was invoked.
    #[error("validation failed: {0}")]
    Validation(String),

    /// No executor is bound to the command's type.
    #[error("no executor registered for action {kind}")]
    UnknownAction { kind: &'static str },

    /// Filesystem read/write/delete failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Underlying driver failure.
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    /// A core-level failure (entropy source, config, validation).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// An operation failed and the automatic rollback failed too. Both
    /// causes are preserved so callers can distinguish "operation failed,
    /// rollback succeeded" from "operation failed, rollback also failed".
    #[error("{rollback_cause} after {triggering_cause}")]
    Rollback {
        /// Why the rollback itself failed.
        rollback_cause: Box<DbError>,
        /// The operation failure that triggered the rollback.
        triggering_cause: Box<DbError>,
    },
}
