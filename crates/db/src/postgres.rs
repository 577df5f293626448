//! PostgreSQL implementations of the backend traits.
//!
//! [`PgProvisioner`] drives CREATE/DROP DATABASE over a maintenance
//! connection and keeps a pool on the currently provisioned database.
//! [`PgTx`] adapts a driver transaction to the coordinator's narrow
//! [`TxBackend`] surface.

use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::postgres::{PgArguments, PgConnectOptions, PgConnection, PgPool};
use sqlx::query::Query;
use sqlx::{ConnectOptions, Postgres};

use dbarena_core::Config;

use crate::error::DbError;
use crate::provision::ProvisioningBackend;
use crate::tx::{ExecResult, SqlValue, TxBackend};

/// SQLSTATE for "database already exists".
const DUPLICATE_DATABASE: &str = "42P04";

/// Build connect options for the maintenance database named in `config`.
pub fn connect_options(config: &Config) -> PgConnectOptions {
    PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.username)
        .password(&config.password)
        .database(&config.database)
}

/// Quote an identifier for interpolation into DDL, which cannot take bind
/// parameters.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn is_duplicate_database(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err)
        if db_err.code().as_deref() == Some(DUPLICATE_DATABASE))
}

/// Provisioning backend over a live PostgreSQL server.
///
/// Holds one maintenance connection for administrative statements plus a
/// pool on the most recently created (or scripted) database. PostgreSQL
/// has no `USE` statement, so "switching the active target" means
/// connecting that pool to the new database.
pub struct PgProvisioner {
    admin: PgConnection,
    options: PgConnectOptions,
    pool: Option<(String, PgPool)>,
}

impl PgProvisioner {
    /// Connect the maintenance session described by `options`.
    pub async fn connect(options: PgConnectOptions) -> Result<Self, DbError> {
        let admin = options.connect().await?;
        Ok(Self {
            admin,
            options,
            pool: None,
        })
    }

    /// The pool on the currently provisioned database, if any.
    pub fn pool(&self) -> Option<&PgPool> {
        self.pool.as_ref().map(|(_, pool)| pool)
    }

    /// Pool on `name`, connecting (and dropping any previous pool) if the
    /// active target differs.
    async fn pool_for(&mut self, name: &str) -> Result<PgPool, DbError> {
        if let Some((current, pool)) = &self.pool {
            if current == name {
                return Ok(pool.clone());
            }
        }

        if let Some((_, old)) = self.pool.take() {
            old.close().await;
        }
        let options = self.options.clone().database(name);
        let pool = PgPool::connect_with(options).await?;
        self.pool = Some((name.to_string(), pool.clone()));
        Ok(pool)
    }
}

#[async_trait]
impl ProvisioningBackend for PgProvisioner {
    async fn create_database(&mut self, name: &str) -> Result<(), DbError> {
        let sql = format!("CREATE DATABASE {}", quote_ident(name));
        if let Err(err) = sqlx::query(&sql).execute(&mut self.admin).await {
            if is_duplicate_database(&err) {
                return Err(DbError::AlreadyExists {
                    name: name.to_string(),
                });
            }
            return Err(err.into());
        }

        // Switch the active target to the new database.
        self.pool_for(name).await?;
        Ok(())
    }

    async fn drop_database(&mut self, name: &str) -> Result<(), DbError> {
        // Our own pool would otherwise hold the database open.
        if matches!(&self.pool, Some((current, _)) if current == name) {
            if let Some((_, pool)) = self.pool.take() {
                pool.close().await;
            }
        }

        let sql = format!("DROP DATABASE {}", quote_ident(name));
        sqlx::query(&sql).execute(&mut self.admin).await?;
        Ok(())
    }

    async fn database_exists(&mut self, name: &str) -> Result<bool, DbError> {
        let found: Option<i32> =
            sqlx::query_scalar("SELECT 1 FROM pg_database WHERE datname = $1")
                .bind(name)
                .fetch_optional(&mut self.admin)
                .await?;
        Ok(found.is_some())
    }

    async fn apply_script(&mut self, name: &str, script: &str) -> Result<(), DbError> {
        let pool = self.pool_for(name).await?;
        let mut conn = pool.acquire().await?;

        // The server pipelines one result per statement and the connection
        // stays locked until every result has been read, so the stream
        // must be drained even though the results themselves are unused.
        let mut results = sqlx::raw_sql(script).execute_many(&mut *conn);
        while results.try_next().await?.is_some() {}

        Ok(())
    }
}

/// List databases whose names were generated from `basename`.
///
/// Matches only the exact `basename_<32 hex>` shape, so hand-made
/// databases sharing the prefix are never reported.
pub async fn generated_databases(
    conn: &mut PgConnection,
    basename: &str,
) -> Result<Vec<String>, DbError> {
    let names: Vec<String> =
        sqlx::query_scalar("SELECT datname FROM pg_database WHERE datname LIKE $1 ORDER BY datname")
            .bind(format!("{basename}\\_%"))
            .fetch_all(conn)
            .await?;

    Ok(names
        .into_iter()
        .filter(|name| dbarena_core::suffix::is_generated_name(basename, name))
        .collect())
}

/// [`TxBackend`] over a driver transaction.
pub struct PgTx {
    inner: Option<sqlx::Transaction<'static, Postgres>>,
}

impl PgTx {
    pub fn new(tx: sqlx::Transaction<'static, Postgres>) -> Self {
        Self { inner: Some(tx) }
    }

    fn tx(&mut self) -> &mut sqlx::Transaction<'static, Postgres> {
        match self.inner.as_mut() {
            Some(tx) => tx,
            // The coordinator's state machine prevents this; reaching it
            // means the backend was driven by hand after completion.
            None => panic!("transaction backend used after commit or rollback"),
        }
    }

    fn take(&mut self) -> sqlx::Transaction<'static, Postgres> {
        match self.inner.take() {
            Some(tx) => tx,
            None => panic!("transaction backend used after commit or rollback"),
        }
    }
}

fn bind_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &SqlValue,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        SqlValue::Null => query.bind(None::<String>),
        SqlValue::Bool(b) => query.bind(*b),
        SqlValue::Int(i) => query.bind(*i),
        SqlValue::Float(f) => query.bind(*f),
        SqlValue::Text(s) => query.bind(s.clone()),
        SqlValue::Bytes(b) => query.bind(b.clone()),
    }
}

#[async_trait]
impl TxBackend for PgTx {
    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<ExecResult, DbError> {
        let mut query = sqlx::query(sql);
        for value in params {
            query = bind_value(query, value);
        }

        let result = query.execute(&mut **self.tx()).await?;
        Ok(ExecResult {
            rows_affected: result.rows_affected(),
        })
    }

    async fn commit(&mut self) -> Result<(), DbError> {
        self.take().commit().await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), DbError> {
        self.take().rollback().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoting_doubles_embedded_quotes() {
        assert_eq!(quote_ident("spec_00ff"), "\"spec_00ff\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }
}
