//! Core domain logic for dbarena: configuration, error taxonomy, content
//! digests, and collision-resistant name generation.
//!
//! This crate is free of any database driver; everything that talks to
//! PostgreSQL lives in `dbarena-db`.

pub mod config;
pub mod error;
pub mod hashing;
pub mod suffix;

pub use config::Config;
pub use error::CoreError;
