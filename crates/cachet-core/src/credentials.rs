//! Passphrase sources
//!
//! The session asks a [`CredentialSource`] whenever it needs a passphrase, so
//! prompting stays in the frontend and the core runs unattended in tests.

use secrecy::{ExposeSecret, SecretString};

use crate::error::Result;

/// Why the session is asking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassphrasePrompt {
    /// Open an existing store
    Unlock,
    /// Choose a passphrase for a new store
    NewStore,
    /// Repeat the new passphrase
    Confirm,
}

pub trait CredentialSource {
    fn passphrase(&self, prompt: PassphrasePrompt) -> Result<SecretString>;
}

/// Fixed in-memory passphrase
pub struct StaticCredentials {
    passphrase: SecretString,
    confirmation: Option<SecretString>,
}

impl StaticCredentials {
    /// Answers every prompt, confirmation included, with `passphrase`
    pub fn new(passphrase: &str) -> Self {
        Self {
            passphrase: SecretString::new(passphrase.to_string()),
            confirmation: None,
        }
    }

    /// Answers [`PassphrasePrompt::Confirm`] with a different value
    pub fn with_confirmation(passphrase: &str, confirmation: &str) -> Self {
        Self {
            passphrase: SecretString::new(passphrase.to_string()),
            confirmation: Some(SecretString::new(confirmation.to_string())),
        }
    }
}

impl CredentialSource for StaticCredentials {
    fn passphrase(&self, prompt: PassphrasePrompt) -> Result<SecretString> {
        let secret = match (prompt, &self.confirmation) {
            (PassphrasePrompt::Confirm, Some(confirmation)) => confirmation,
            _ => &self.passphrase,
        };
        Ok(SecretString::new(secret.expose_secret().clone()))
    }
}
