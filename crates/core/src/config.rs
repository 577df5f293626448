use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::CoreError;

/// Connection and filesystem settings, loaded once at process start and
/// threaded by value into constructors.
///
/// There is deliberately no process-global configuration state; anything
/// that needs these values receives them explicitly.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Database server user.
    pub username: String,
    /// Database server password.
    #[serde(default)]
    pub password: String,
    /// Database server host (default: `127.0.0.1`).
    #[serde(default = "default_host")]
    pub host: String,
    /// Database server port (default: `5432`).
    #[serde(default = "default_port")]
    pub port: u16,
    /// Maintenance database to connect to for provisioning calls, and the
    /// basename from which ephemeral names are derived.
    pub database: String,
    /// Root directory for content-addressed file storage.
    pub files_root: PathBuf,
}

fn default_host() -> String {
    "127.0.0.1".into()
}

fn default_port() -> u16 {
    5432
}

impl Config {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var               | Default       |
    /// |-----------------------|---------------|
    /// | `DBARENA_DB_USER`     | `postgres`    |
    /// | `DBARENA_DB_PASSWORD` | *(empty)*     |
    /// | `DBARENA_DB_HOST`     | `127.0.0.1`   |
    /// | `DBARENA_DB_PORT`     | `5432`        |
    /// | `DBARENA_DB_NAME`     | `postgres`    |
    /// | `DBARENA_FILES_ROOT`  | `files`       |
    pub fn from_env() -> Self {
        let username = std::env::var("DBARENA_DB_USER").unwrap_or_else(|_| "postgres".into());
        let password = std::env::var("DBARENA_DB_PASSWORD").unwrap_or_default();
        let host = std::env::var("DBARENA_DB_HOST").unwrap_or_else(|_| default_host());

        let port: u16 = std::env::var("DBARENA_DB_PORT")
            .unwrap_or_else(|_| "5432".into())
            .parse()
            .expect("DBARENA_DB_PORT must be a valid u16");

        let database = std::env::var("DBARENA_DB_NAME").unwrap_or_else(|_| "postgres".into());
        let files_root = std::env::var("DBARENA_FILES_ROOT")
            .unwrap_or_else(|_| "files".into())
            .into();

        Self {
            username,
            password,
            host,
            port,
            database,
            files_root,
        }
    }

    /// Load configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| CoreError::Config(format!("reading {}: {e}", path.display())))?;
        serde_json::from_str(&raw)
            .map_err(|e| CoreError::Config(format!("parsing {}: {e}", path.display())))
    }
}
