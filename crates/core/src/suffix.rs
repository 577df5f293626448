//! Collision-resistant database name generation.
//!
//! Uniqueness is generated client-side so that concurrent test runs never
//! contend for the same physical database, even without a coordination
//! service. A suffix carries 128 bits of OS entropy, hex-encoded, which
//! makes collisions negligible but never impossible, so creation still
//! surfaces an explicit already-exists error instead of retrying.

use rand::rngs::OsRng;
use rand::TryRngCore;

use crate::error::CoreError;

/// Number of random bytes in a suffix (128 bits).
pub const SUFFIX_BYTES: usize = 16;

/// Hex-encoded suffix length.
pub const SUFFIX_LEN: usize = SUFFIX_BYTES * 2;

/// Generate a fresh lowercase-hex suffix from the OS entropy source.
pub fn unique_suffix() -> Result<String, CoreError> {
    let mut bytes = [0u8; SUFFIX_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| CoreError::EntropySource(e.to_string()))?;
    Ok(hex::encode(bytes))
}

/// Join a basename and a suffix into a database name.
pub fn database_name(basename: &str, suffix: &str) -> String {
    format!("{basename}_{suffix}")
}

/// Whether `name` looks like a generated database name for `basename`,
/// i.e. `basename` + `_` + 32 lowercase hex characters.
///
/// The sweep tool uses this to avoid dropping hand-made databases that
/// merely share the prefix.
pub fn is_generated_name(basename: &str, name: &str) -> bool {
    let Some(rest) = name.strip_prefix(basename) else {
        return false;
    };
    let Some(suffix) = rest.strip_prefix('_') else {
        return false;
    };
    suffix.len() == SUFFIX_LEN
        && suffix
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}
