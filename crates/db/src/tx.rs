//! Dual-resource transaction coordination.
//!
//! A [`FileTransaction`] wraps one database transaction and one directory
//! of content-addressed files under a single commit/rollback umbrella. The
//! database side has native rollback; the filesystem side is compensated
//! manually by deleting the files this transaction saved. There is no
//! two-phase protocol and no recovery after process death mid-transaction.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::DbError;
use crate::store::{self, UploadedFile};

/// A parameter value bound into a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

/// Row metadata from a completed statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecResult {
    /// Rows matched/affected by the statement.
    pub rows_affected: u64,
}

/// The transaction capability the coordinator needs from the driver.
///
/// Deliberately narrow: execute, commit, rollback. The coordinator holds
/// an implementation by composition rather than inheriting the driver's
/// full connection surface.
#[async_trait]
pub trait TxBackend: Send {
    /// Execute one parameterized statement inside the transaction.
    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<ExecResult, DbError>;

    /// Commit the underlying database transaction.
    async fn commit(&mut self) -> Result<(), DbError>;

    /// Roll back the underlying database transaction.
    async fn rollback(&mut self) -> Result<(), DbError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TxState {
    Open,
    Committed,
    RolledBack,
}

/// One logical transaction spanning a database transaction and a directory
/// of files.
///
/// State machine: `Open` → `Committed` or `RolledBack`, exactly once.
/// Calling any operation after a terminal state is a programming error and
/// panics. Once a `run` or `save_file` call fails, the transaction has
/// already rolled back; the automatic rollback on first failure is the
/// only compensation performed.
///
/// A single instance serves exactly one logical flow; dropping it while
/// still open rolls back the database side (the driver does that on drop)
/// but leaves any saved files in place.
pub struct FileTransaction<B> {
    tx: B,
    dir: PathBuf,
    saved_files: Vec<String>,
    state: TxState,
}

impl<B: TxBackend> FileTransaction<B> {
    /// Wrap an open database transaction targeting `dir` for file saves.
    pub fn new(tx: B, dir: impl Into<PathBuf>) -> Self {
        Self {
            tx,
            dir: dir.into(),
            saved_files: Vec::new(),
            state: TxState::Open,
        }
    }

    /// The directory this transaction saves files into.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Filenames saved so far, in insertion order. This ledger is
    /// authoritative for what a rollback deletes.
    pub fn saved_files(&self) -> &[String] {
        &self.saved_files
    }

    fn assert_open(&self, op: &str) {
        if self.state != TxState::Open {
            panic!("{op} called on a transaction that is already {:?}", self.state);
        }
    }

    /// Execute a parameterized statement.
    ///
    /// On failure the transaction rolls back before returning. If that
    /// rollback also fails, the returned error is [`DbError::Rollback`]
    /// carrying both causes; otherwise the original failure comes back
    /// unchanged.
    pub async fn run(&mut self, sql: &str, params: &[SqlValue]) -> Result<ExecResult, DbError> {
        self.assert_open("run");
        match self.tx.execute(sql, params).await {
            Ok(res) => Ok(res),
            Err(cause) => Err(self.abort(cause).await),
        }
    }

    /// Save a file into the transaction directory under its
    /// content-addressed name, recording it for compensating deletion.
    ///
    /// Failure semantics match [`FileTransaction::run`].
    pub async fn save_file(&mut self, file: &UploadedFile) -> Result<String, DbError> {
        self.assert_open("save_file");
        match store::save_file(file, &self.dir).await {
            Ok(filename) => {
                self.saved_files.push(filename.clone());
                Ok(filename)
            }
            Err(cause) => Err(self.abort(cause).await),
        }
    }

    /// Commit the database transaction. Saved files become permanent.
    ///
    /// If the commit itself fails, saved files are NOT deleted: a lost
    /// commit acknowledgment is indistinguishable from a failed commit, and
    /// deleting could destroy state the database considers durable. The
    /// orphan risk is logged and the error returned.
    pub async fn commit(mut self) -> Result<(), DbError> {
        self.assert_open("commit");
        self.state = TxState::Committed;
        if let Err(err) = self.tx.commit().await {
            tracing::warn!(
                saved_files = self.saved_files.len(),
                error = %err,
                "commit failed; content-addressed files were left in place"
            );
            return Err(err);
        }
        Ok(())
    }

    /// Roll back: delete every ledgered file in insertion order, then roll
    /// back the database transaction.
    pub async fn rollback(mut self) -> Result<(), DbError> {
        self.assert_open("rollback");
        self.rollback_inner().await
    }

    /// Rollback triggered by a failed operation. Returns the error the
    /// caller should see: the triggering cause alone when rollback
    /// succeeds, or a compound error preserving both when it does not.
    async fn abort(&mut self, cause: DbError) -> DbError {
        match self.rollback_inner().await {
            Ok(()) => cause,
            Err(rollback_cause) => DbError::Rollback {
                rollback_cause: Box::new(rollback_cause),
                triggering_cause: Box::new(cause),
            },
        }
    }

    async fn rollback_inner(&mut self) -> Result<(), DbError> {
        self.state = TxState::RolledBack;

        // Compensate the filesystem first, stopping at the first failure.
        let mut delete_err: Option<DbError> = None;
        for filename in &self.saved_files {
            let path = self.dir.join(filename);
            if let Err(err) = tokio::fs::remove_file(&path).await {
                tracing::error!(
                    file = %path.display(),
                    error = %err,
                    "failed to delete saved file during rollback"
                );
                delete_err = Some(err.into());
                break;
            }
        }

        // The server-side rollback runs even when file cleanup failed;
        // skipping it would leave the database transaction open.
        let db_result = self.tx.rollback().await;

        match delete_err {
            Some(err) => {
                if let Err(db_err) = db_result {
                    tracing::error!(error = %db_err, "database rollback also failed");
                }
                Err(err)
            }
            None => db_result,
        }
    }
}
