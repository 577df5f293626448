//! Ephemeral database provisioning.
//!
//! Each provisioned database gets a unique generated name so concurrent
//! test runs stay isolated. The actual server operations go through the
//! narrow [`ProvisioningBackend`] trait; unit tests run against an
//! in-memory double, production against [`crate::postgres::PgProvisioner`].

use async_trait::async_trait;

use dbarena_core::{suffix, CoreError};

use crate::error::DbError;

/// Administrative operations a provisioner needs from the server.
///
/// All operations take the database name explicitly; the backend may keep
/// a connection to the named database alive between calls (creating a
/// database also switches the backend's active target to it).
#[async_trait]
pub trait ProvisioningBackend: Send {
    /// Create the named database and switch the active target to it.
    ///
    /// Must fail with [`DbError::AlreadyExists`] when the exact name is
    /// taken.
    async fn create_database(&mut self, name: &str) -> Result<(), DbError>;

    /// Drop the named database.
    async fn drop_database(&mut self, name: &str) -> Result<(), DbError>;

    /// Whether a database with exactly this name exists.
    async fn database_exists(&mut self, name: &str) -> Result<bool, DbError>;

    /// Run a (possibly multi-statement) script against the named database,
    /// consuming every result it produces before returning.
    async fn apply_script(&mut self, name: &str, script: &str) -> Result<(), DbError>;
}

#[async_trait]
impl<'a, B: ProvisioningBackend + ?Sized> ProvisioningBackend for &'a mut B {
    async fn create_database(&mut self, name: &str) -> Result<(), DbError> {
        (**self).create_database(name).await
    }

    async fn drop_database(&mut self, name: &str) -> Result<(), DbError> {
        (**self).drop_database(name).await
    }

    async fn database_exists(&mut self, name: &str) -> Result<bool, DbError> {
        (**self).database_exists(name).await
    }

    async fn apply_script(&mut self, name: &str, script: &str) -> Result<(), DbError> {
        (**self).apply_script(name, script).await
    }
}

/// A uniquely named database owned by the provisioning caller.
///
/// The schema-applied flag lives here, not on the server: a second
/// `set_schema` call fails regardless of what the server state looks like.
pub struct EphemeralDb<B> {
    backend: B,
    name: String,
    schema_set: bool,
}

impl<B: ProvisioningBackend> EphemeralDb<B> {
    /// Generate a unique name for `basename` without touching the server.
    ///
    /// Fails only if the OS entropy source does.
    pub fn new(basename: &str, backend: B) -> Result<Self, CoreError> {
        Self::with_suffix_source(basename, backend, suffix::unique_suffix)
    }

    fn with_suffix_source(
        basename: &str,
        backend: B,
        gen_suffix: impl FnOnce() -> Result<String, CoreError>,
    ) -> Result<Self, CoreError> {
        let suffix = gen_suffix()?;
        Ok(Self {
            backend,
            name: suffix::database_name(basename, &suffix),
            schema_set: false,
        })
    }

    /// Wrap an existing database by its exact name, without generating a
    /// suffix. `create` on the result fails with
    /// [`DbError::AlreadyExists`] if the database is really there.
    pub fn attach(name: impl Into<String>, backend: B) -> Self {
        Self {
            backend,
            name: name.into(),
            schema_set: false,
        }
    }

    /// The full generated (or attached) database name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether `set_schema` has already succeeded on this instance.
    pub fn schema_is_set(&self) -> bool {
        self.schema_set
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Create the database on the server.
    ///
    /// A name collision surfaces as [`DbError::AlreadyExists`]; it is never
    /// silently retried with a fresh suffix.
    pub async fn create(&mut self) -> Result<(), DbError> {
        self.backend.create_database(&self.name).await?;
        tracing::info!(database = %self.name, "provisioned database");
        Ok(())
    }

    /// Drop the database. Whatever the server reports propagates; no retry.
    pub async fn destroy(&mut self) -> Result<(), DbError> {
        self.backend.drop_database(&self.name).await?;
        tracing::info!(database = %self.name, "dropped database");
        Ok(())
    }

    /// Apply a one-time schema script.
    ///
    /// The script may contain multiple statements; the backend drains every
    /// result before this returns, otherwise the connection would stay
    /// locked mid-pipeline. A second call fails with
    /// [`DbError::SchemaAlreadySet`] no matter what the script contains.
    pub async fn set_schema(&mut self, script: &str) -> Result<(), DbError> {
        if self.schema_set {
            return Err(DbError::SchemaAlreadySet);
        }

        self.backend.apply_script(&self.name, script).await?;
        self.schema_set = true;
        Ok(())
    }

    /// Whether a database with this exact name exists on the server.
    pub async fn exists(&mut self) -> Result<bool, DbError> {
        self.backend.database_exists(&self.name).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use assert_matches::assert_matches;

    use super::*;

    /// In-memory stand-in for a database server.
    #[derive(Default)]
    struct MemoryBackend {
        databases: HashSet<String>,
        scripts: Vec<(String, String)>,
    }

    #[async_trait]
    impl ProvisioningBackend for MemoryBackend {
        async fn create_database(&mut self, name: &str) -> Result<(), DbError> {
            if !self.databases.insert(name.to_string()) {
                return Err(DbError::AlreadyExists {
                    name: name.to_string(),
                });
            }
            Ok(())
        }

        async fn drop_database(&mut self, name: &str) -> Result<(), DbError> {
            if !self.databases.remove(name) {
                return Err(DbError::Sqlx(sqlx::Error::RowNotFound));
            }
            Ok(())
        }

        async fn database_exists(&mut self, name: &str) -> Result<bool, DbError> {
            Ok(self.databases.contains(name))
        }

        async fn apply_script(&mut self, name: &str, script: &str) -> Result<(), DbError> {
            self.scripts.push((name.to_string(), script.to_string()));
            Ok(())
        }
    }

    fn fixed_suffix() -> Result<String, CoreError> {
        Ok("not-unique".into())
    }

    #[tokio::test]
    async fn generated_names_share_the_basename_but_differ() {
        let a = EphemeralDb::new("spec", MemoryBackend::default()).unwrap();
        let b = EphemeralDb::new("spec", MemoryBackend::default()).unwrap();

        assert!(a.name().starts_with("spec_"));
        assert!(b.name().starts_with("spec_"));
        assert_ne!(a.name(), b.name());
    }

    #[tokio::test]
    async fn fixed_suffix_collision_is_an_explicit_error() {
        let mut backend = MemoryBackend::default();

        let mut first =
            EphemeralDb::with_suffix_source("spec", &mut backend, fixed_suffix).unwrap();
        first.create().await.unwrap();
        let name = first.name().to_string();

        let mut second =
            EphemeralDb::with_suffix_source("spec", &mut backend, fixed_suffix).unwrap();
        assert_eq!(second.name(), name);

        let err = second.create().await.unwrap_err();
        assert_matches!(err, DbError::AlreadyExists { name: n } if n == name);
    }

    #[tokio::test]
    async fn create_then_destroy_round_trips_existence() {
        let mut db = EphemeralDb::new("spec", MemoryBackend::default()).unwrap();

        assert!(!db.exists().await.unwrap());
        db.create().await.unwrap();
        assert!(db.exists().await.unwrap());
        db.destroy().await.unwrap();
        assert!(!db.exists().await.unwrap());
    }

    #[tokio::test]
    async fn destroy_propagates_the_server_error() {
        let mut db = EphemeralDb::new("spec", MemoryBackend::default()).unwrap();
        // Never created.
        assert_matches!(db.destroy().await, Err(DbError::Sqlx(_)));
    }

    #[tokio::test]
    async fn schema_can_only_be_set_once() {
        let mut db = EphemeralDb::new("spec", MemoryBackend::default()).unwrap();
        db.create().await.unwrap();

        db.set_schema("create table t (id int);").await.unwrap();
        assert!(db.schema_is_set());

        // A second call fails regardless of script content, including empty.
        assert_matches!(
            db.set_schema("").await,
            Err(DbError::SchemaAlreadySet)
        );
        assert_matches!(
            db.set_schema("create table u (id int);").await,
            Err(DbError::SchemaAlreadySet)
        );
    }

    #[tokio::test]
    async fn schema_script_reaches_the_named_database() {
        let mut db = EphemeralDb::new("spec", MemoryBackend::default()).unwrap();
        db.create().await.unwrap();
        db.set_schema("select 1;").await.unwrap();

        let name = db.name().to_string();
        let backend = db.into_backend();
        assert_eq!(backend.scripts, vec![(name, "select 1;".to_string())]);
    }

    #[tokio::test]
    async fn failed_schema_application_leaves_the_flag_unset() {
        struct FailingScripts;

        #[async_trait]
        impl ProvisioningBackend for FailingScripts {
            async fn create_database(&mut self, _: &str) -> Result<(), DbError> {
                Ok(())
            }
            async fn drop_database(&mut self, _: &str) -> Result<(), DbError> {
                Ok(())
            }
            async fn database_exists(&mut self, _: &str) -> Result<bool, DbError> {
                Ok(true)
            }
            async fn apply_script(&mut self, _: &str, _: &str) -> Result<(), DbError> {
                Err(DbError::Sqlx(sqlx::Error::PoolClosed))
            }
        }

        let mut db = EphemeralDb::new("spec", FailingScripts).unwrap();
        assert_matches!(db.set_schema("select 1;").await, Err(DbError::Sqlx(_)));
        assert!(!db.schema_is_set());
    }

    #[tokio::test]
    async fn attach_uses_the_exact_name() {
        let db = EphemeralDb::attach("spec_prod", MemoryBackend::default());
        assert_eq!(db.name(), "spec_prod");
        assert!(!db.schema_is_set());
    }
}
