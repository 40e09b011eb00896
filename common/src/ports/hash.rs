//! Hash port (§6): `sha256(utf8) -> 64-hex`. Unlike the adapter/NLP ports,
//! this one isn't an external collaborator — SHA-256 is pure and
//! deterministic, so a single concrete implementation ships with the core.

use sha2::{Digest, Sha256};

pub trait Hash: Send + Sync {
    fn sha256(&self, content: &str) -> String;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Sha256Hasher;

impl Hash for Sha256Hasher {
    fn sha256(&self, content: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        let digest = hasher.finalize();
        digest.iter().fold(String::with_capacity(64), |mut acc, byte| {
            use std::fmt::Write;
            let _ = write!(acc, "{byte:02x}");
            acc
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_produces_64_char_lowercase_hex() {
        let hasher = Sha256Hasher;
        let digest = hasher.sha256("bitcoin hits $50,000");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn sha256_is_deterministic() {
        let hasher = Sha256Hasher;
        assert_eq!(hasher.sha256("same input"), hasher.sha256("same input"));
        assert_ne!(hasher.sha256("a"), hasher.sha256("b"));
    }
}
