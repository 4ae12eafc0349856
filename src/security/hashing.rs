//! Salted IP hashing.

use sha2::{Digest, Sha256};

/// SHA-256 over salt + IP, hex-encoded.
///
/// The salt is supplied by the host environment; with it, equal IPs map
/// to equal hashes (usable for abuse correlation) without the plaintext
/// address ever being persisted.
pub fn hash_ip(ip: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(ip.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic_per_salt() {
        let a = hash_ip("203.0.113.7", "salt-1");
        let b = hash_ip("203.0.113.7", "salt-1");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_salt_changes_output() {
        let a = hash_ip("203.0.113.7", "salt-1");
        let b = hash_ip("203.0.113.7", "salt-2");
        assert_ne!(a, b);
    }

    #[test]
    fn test_plaintext_not_embedded() {
        let h = hash_ip("203.0.113.7", "salt-1");
        assert!(!h.contains("203.0.113.7"));
    }
}
