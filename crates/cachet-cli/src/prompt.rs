//! Interactive passphrase entry

use cachet_core::{CacheError, CredentialSource, PassphrasePrompt};
use dialoguer::{theme::ColorfulTheme, Password};
use secrecy::SecretString;

/// Asks on the terminal, without echo
pub struct PromptCredentials;

impl CredentialSource for PromptCredentials {
    fn passphrase(&self, prompt: PassphrasePrompt) -> cachet_core::Result<SecretString> {
        let label = match prompt {
            PassphrasePrompt::Unlock => "Cache passphrase",
            PassphrasePrompt::NewStore => "New cache passphrase",
            PassphrasePrompt::Confirm => "Repeat passphrase",
        };
        Password::with_theme(&ColorfulTheme::default())
            .with_prompt(label)
            .interact()
            .map(SecretString::new)
            .map_err(|e| CacheError::Credentials(e.to_string()))
    }
}
