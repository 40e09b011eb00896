//! Credential encryption and key-provider ports (§6). Concrete primitives
//! are out of scope (§1) — the core only depends on these trait seams.

use async_trait::async_trait;

use crate::error::AppError;

/// Opaque ciphertext. Self-describing per §6 (version tag + IV + auth tag +
/// payload); the concrete format is left to the implementing adapter.
pub type Ciphertext = Vec<u8>;

#[async_trait]
pub trait CredentialCipher: Send + Sync {
    async fn encrypt(&self, plaintext: &str, key: &str) -> Result<Ciphertext, AppError>;
    async fn decrypt(&self, ciphertext: &Ciphertext, key: &str) -> Result<String, AppError>;
}

#[async_trait]
pub trait KeyProvider: Send + Sync {
    async fn get_key(&self) -> Result<String, AppError>;
}
