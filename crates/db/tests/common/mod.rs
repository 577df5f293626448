//! Shared helpers for the live-server integration suites.
//!
//! Connection settings come from the `DBARENA_*` environment variables
//! (see `dbarena_core::Config::from_env`); every suite here needs a
//! running PostgreSQL server and is `#[ignore]`d so plain `cargo test`
//! stays green without one.

use dbarena_core::Config;
use dbarena_db::postgres::{connect_options, PgProvisioner};
use dbarena_db::EphemeralDb;

/// Schema for the update matched-rows scenario. Two statements, so
/// applying it also exercises multi-statement result draining.
pub const TEST_SCHEMA: &str = "\
CREATE TABLE updateResultTest (
    id serial PRIMARY KEY,
    txt text
);

INSERT INTO updateResultTest (txt) VALUES ('test');
";

pub fn test_config() -> Config {
    Config::from_env()
}

pub async fn provisioner() -> PgProvisioner {
    PgProvisioner::connect(connect_options(&test_config()))
        .await
        .expect("failed to connect to PostgreSQL; set DBARENA_DB_* env vars")
}

/// Provision a fresh database with the test schema applied.
pub async fn provisioned_db(basename: &str) -> EphemeralDb<PgProvisioner> {
    let mut db = EphemeralDb::new(basename, provisioner().await).expect("suffix generation");
    db.create().await.expect("create database");
    db.set_schema(TEST_SCHEMA).await.expect("apply schema");
    db
}
