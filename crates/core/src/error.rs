/// Core-level error type.
///
/// Covers failures that can occur without ever reaching a database server:
/// command validation, configuration loading, and the OS entropy source.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A value failed its own validity check.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Configuration could not be loaded or parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// The OS random source failed or returned fewer bytes than requested.
    #[error("entropy source failure: {0}")]
    EntropySource(String),
}
