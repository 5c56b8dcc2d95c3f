//! Cachet Crypto - key derivation and authenticated encryption
//!
//! This crate provides:
//! - PBKDF2-HMAC-SHA256 passphrase key derivation
//! - ChaCha20-Poly1305 sealing of store frames
//!
//! Key material is wrapped in `Zeroizing<>` so it is scrubbed from memory
//! on drop, and never implements `Display`/`Serialize`.

pub mod cipher;
pub mod kdf;

pub use cipher::{decrypt, encrypt, NONCE_SIZE, TAG_SIZE};
pub use kdf::{derive_key, DerivedKey, Salt, KEY_SIZE, PBKDF2_ITERATIONS, SALT_SIZE};

/// Errors that can occur in cryptographic operations
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("System randomness unavailable")]
    Randomness,

    #[error("Encryption failed")]
    EncryptionFailed,

    #[error("Decryption failed - wrong key, or data corrupted or tampered")]
    DecryptionFailed,

    #[error("Sealed data too short: {0} bytes")]
    Truncated(usize),
}

pub type Result<T> = std::result::Result<T, CryptoError>;
