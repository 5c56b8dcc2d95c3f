//! ChaCha20-Poly1305 authenticated encryption
//!
//! Every sealed blob is `nonce || ciphertext || tag`. A wrong key and a
//! tampered blob are indistinguishable here; callers decide which one a
//! failure means from context.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use ring::rand::{SecureRandom, SystemRandom};
use zeroize::Zeroizing;

use crate::{CryptoError, DerivedKey, Result};

/// 96-bit nonce (12 bytes)
pub const NONCE_SIZE: usize = 12;
/// 128-bit Poly1305 tag (16 bytes)
pub const TAG_SIZE: usize = 16;

fn cipher_for(key: &DerivedKey) -> ChaCha20Poly1305 {
    ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()))
}

/// Generate a cryptographically secure random nonce
fn generate_nonce() -> Result<[u8; NONCE_SIZE]> {
    let mut nonce = [0u8; NONCE_SIZE];
    SystemRandom::new()
        .fill(&mut nonce)
        .map_err(|_| CryptoError::Randomness)?;
    Ok(nonce)
}

/// Encrypt plaintext under `key`.
///
/// Returns: nonce || ciphertext || tag
pub fn encrypt(key: &DerivedKey, plaintext: &[u8]) -> Result<Vec<u8>> {
    let nonce_bytes = generate_nonce()?;
    let ciphertext = cipher_for(key)
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
        .map_err(|_| CryptoError::EncryptionFailed)?;

    let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    sealed.extend_from_slice(&nonce_bytes);
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

/// Decrypt a blob produced by [`encrypt`]
pub fn decrypt(key: &DerivedKey, sealed: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    if sealed.len() < NONCE_SIZE + TAG_SIZE {
        return Err(CryptoError::Truncated(sealed.len()));
    }

    let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_SIZE);
    let plaintext = cipher_for(key)
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| CryptoError::DecryptionFailed)?;

    Ok(Zeroizing::new(plaintext))
}
