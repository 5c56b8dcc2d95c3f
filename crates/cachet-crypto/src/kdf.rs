//! Passphrase key derivation
//!
//! PBKDF2-HMAC-SHA256 with a constant iteration count and a per-store random
//! salt. The threat model is disk theft, not an attacker with process access.

use std::fmt;
use std::num::NonZeroU32;

use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};
use secrecy::{ExposeSecret, SecretString};
use zeroize::Zeroizing;

use crate::{CryptoError, Result};

/// 256-bit key (32 bytes)
pub const KEY_SIZE: usize = 32;
/// 128-bit salt (16 bytes)
pub const SALT_SIZE: usize = 16;
/// Fixed work factor. Changing it invalidates every existing store.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

const ITERATIONS: NonZeroU32 = match NonZeroU32::new(PBKDF2_ITERATIONS) {
    Some(n) => n,
    None => panic!("PBKDF2_ITERATIONS must be non-zero"),
};

/// KDF salt, stored in the clear at the head of the container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Salt([u8; SALT_SIZE]);

impl Salt {
    /// Generate a fresh random salt
    pub fn generate() -> Result<Self> {
        let mut bytes = [0u8; SALT_SIZE];
        SystemRandom::new()
            .fill(&mut bytes)
            .map_err(|_| CryptoError::Randomness)?;
        Ok(Self(bytes))
    }

    pub fn from_bytes(bytes: [u8; SALT_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SALT_SIZE] {
        &self.0
    }
}

/// Symmetric key derived from the user's passphrase.
///
/// Not `Clone`: there is exactly one copy, owned by whoever holds the open
/// store, and it is zeroized when dropped.
pub struct DerivedKey(Zeroizing<[u8; KEY_SIZE]>);

impl DerivedKey {
    /// Wrap raw key bytes obtained outside the KDF
    pub fn from_raw(bytes: Zeroizing<[u8; KEY_SIZE]>) -> Self {
        Self(bytes)
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        self.0.as_ref()
    }

    #[cfg(test)]
    pub(crate) fn generate() -> Self {
        let mut key = Zeroizing::new([0u8; KEY_SIZE]);
        SystemRandom::new()
            .fill(key.as_mut())
            .expect("system randomness");
        Self(key)
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DerivedKey([redacted])")
    }
}

/// Derive the store key from a passphrase and salt
pub fn derive_key(passphrase: &SecretString, salt: &Salt) -> DerivedKey {
    tracing::debug!(iterations = PBKDF2_ITERATIONS, "deriving store key");
    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        ITERATIONS,
        salt.as_bytes(),
        passphrase.expose_secret().as_bytes(),
        key.as_mut(),
    );
    DerivedKey(key)
}
