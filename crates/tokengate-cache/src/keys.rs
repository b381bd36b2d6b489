//! Cache key derivation.
//!
//! Revocation keys are built from a SHA-256 fingerprint of the raw token, so
//! key length is fixed and no credential material is ever written to the cache.

use sha2::{Digest, Sha256};

/// Default prefix for all cache keys to avoid collisions with other Redis users.
pub const DEFAULT_PREFIX: &str = "tokengate";

/// Hex-encoded SHA-256 digest of a token string (64 characters).
pub fn fingerprint(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Key of the revocation record for `token`.
pub fn revoked(prefix: &str, token: &str) -> String {
    format!("{}:revoked:{}", prefix, fingerprint(token))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_fixed_length() {
        assert_eq!(fingerprint("a").len(), 64);
        assert_eq!(fingerprint(&"x".repeat(4096)).len(), 64);
    }

    #[test]
    fn test_fingerprint_consistency() {
        assert_eq!(fingerprint("header.payload.sig"), fingerprint("header.payload.sig"));
        assert_ne!(fingerprint("header.payload.sig"), fingerprint("header.payload.sih"));
    }

    #[test]
    fn test_revoked_key_never_contains_token() {
        let token = "eyJhbGciOiJIUzI1NiJ9.eyJpZCI6MX0.sig";
        let key = revoked(DEFAULT_PREFIX, token);
        assert!(key.starts_with("tokengate:revoked:"));
        assert!(!key.contains(token));
    }
}
