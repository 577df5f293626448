//! SHA-256 hex digest utility.
//!
//! Content-addressed filenames are derived from this digest, so the output
//! must stay a pure function of the input bytes.

use sha2::{Digest, Sha256};

/// Compute the lowercase SHA-256 hex digest of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    format!("{digest:x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn deterministic_and_fixed_width() {
        let digest = sha256_hex(b"some file content");
        assert_eq!(digest, sha256_hex(b"some file content"));
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(digest, digest.to_lowercase());
    }

    #[test]
    fn distinct_inputs_distinct_digests() {
        assert_ne!(sha256_hex(b"a"), sha256_hex(b"b"));
    }
}
