//! Remember-me credential storage in the OS keychain.
//!
//! Only the login password is stored here, and only when the user asks for
//! it. Tokens never go through the keychain; they live in the session file.

use anyhow::{Context, Result};
use keyring::Entry;

const SERVICE_NAME: &str = "landrec";

pub struct CredentialStore;

impl CredentialStore {
    /// Remember a password for a username.
    pub fn store(username: &str, password: &str) -> Result<()> {
        let entry = Entry::new(SERVICE_NAME, username)
            .context("Failed to create keyring entry")?;
        entry
            .set_password(password)
            .context("Failed to store password in keychain")?;
        Ok(())
    }

    /// Look up the remembered password for a username.
    pub fn lookup(username: &str) -> Result<String> {
        let entry = Entry::new(SERVICE_NAME, username)
            .context("Failed to create keyring entry")?;
        entry
            .get_password()
            .context("No remembered password for this username")
    }

    /// Forget the remembered password for a username.
    pub fn forget(username: &str) -> Result<()> {
        let entry = Entry::new(SERVICE_NAME, username)
            .context("Failed to create keyring entry")?;
        entry
            .delete_credential()
            .context("Failed to delete credential from keychain")?;
        Ok(())
    }

    pub fn has_credentials(username: &str) -> bool {
        match Entry::new(SERVICE_NAME, username) {
            Ok(entry) => entry.get_password().is_ok(),
            Err(_) => false,
        }
    }
}
