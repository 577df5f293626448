//! Operational helper for dbarena deployments.
//!
//! Subcommands:
//! - `dump`: print the configured database's schema via `pg_dump`.
//! - `sweep BASENAME`: drop leftover ephemeral databases generated from
//!   `BASENAME` (orphans from crashed or interrupted test runs).

use anyhow::{bail, Context, Result};
use sqlx::ConnectOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dbarena_core::Config;
use dbarena_db::postgres::{connect_options, generated_databases, PgProvisioner};
use dbarena_db::ProvisioningBackend;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dbarena_util=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let mut args = std::env::args().skip(1);

    match args.next().as_deref() {
        None | Some("dump") => dump(&config),
        Some("sweep") => {
            let Some(basename) = args.next() else {
                bail!("usage: dbarena-util sweep BASENAME");
            };
            sweep(&config, &basename).await
        }
        Some(other) => bail!("unknown subcommand {other:?}; expected dump or sweep"),
    }
}

/// Run `pg_dump --schema-only` for the configured database, inheriting
/// stdio so the schema lands on stdout.
fn dump(config: &Config) -> Result<()> {
    let status = std::process::Command::new("pg_dump")
        .arg("--schema-only")
        .args(["--host", &config.host])
        .args(["--port", &config.port.to_string()])
        .args(["--username", &config.username])
        .arg(&config.database)
        .env("PGPASSWORD", &config.password)
        .status()
        .context("failed to run pg_dump; is it installed?")?;

    if !status.success() {
        bail!("pg_dump exited with {status}");
    }
    Ok(())
}

/// Drop every database whose name was generated from `basename`.
///
/// Only names with the exact `basename_<32 hex>` shape are touched, so a
/// hand-made database that merely shares the prefix survives.
async fn sweep(config: &Config, basename: &str) -> Result<()> {
    let options = connect_options(config);
    let mut admin = options
        .clone()
        .connect()
        .await
        .context("failed to connect to PostgreSQL")?;

    let orphans = generated_databases(&mut admin, basename).await?;
    if orphans.is_empty() {
        tracing::info!(basename, "no leftover ephemeral databases");
        return Ok(());
    }

    let mut backend = PgProvisioner::connect(options).await?;
    let mut dropped = 0_usize;
    for name in &orphans {
        match backend.drop_database(name).await {
            Ok(()) => {
                tracing::info!(database = %name, "dropped leftover database");
                dropped += 1;
            }
            Err(err) => {
                tracing::error!(database = %name, error = %err, "failed to drop database");
            }
        }
    }

    tracing::info!(dropped, total = orphans.len(), "sweep finished");
    if dropped < orphans.len() {
        bail!("failed to drop {} of {} databases", orphans.len() - dropped, orphans.len());
    }
    Ok(())
}
