//! Signed-in session kept in the OS keychain, one slot per Supabase project.

#[cfg(test)]
use std::collections::HashMap;
#[cfg(test)]
use std::sync::{Mutex, OnceLock};

#[cfg(not(test))]
use keyring::Entry;

use scribe_core::auth::{AuthSession, SessionPersistence, SupabaseAuthClient};
use scribe_core::config::ProjectCredentials;
use scribe_core::{Error, Result};

#[cfg(not(test))]
const KEYRING_SERVICE_NAME: &str = "scribe-cli";

pub type AuthClient = SupabaseAuthClient<KeychainSession>;

/// Auth client for `project`, persisting into that project's keychain slot.
pub fn auth_client(project: &ProjectCredentials) -> Result<AuthClient> {
    SupabaseAuthClient::new(project, KeychainSession::for_project(&project.url))
}

pub struct KeychainSession {
    account: String,
}

impl KeychainSession {
    pub fn for_project(project_url: &str) -> Self {
        Self {
            account: format!("session:{}", project_url.trim().trim_end_matches('/')),
        }
    }

    #[cfg(test)]
    fn slots() -> &'static Mutex<HashMap<String, String>> {
        static SLOTS: OnceLock<Mutex<HashMap<String, String>>> = OnceLock::new();
        SLOTS.get_or_init(|| Mutex::new(HashMap::new()))
    }

    #[cfg(not(test))]
    fn entry(&self) -> Result<Entry> {
        Entry::new(KEYRING_SERVICE_NAME, &self.account).map_err(keychain_error)
    }

    #[cfg(not(test))]
    fn read_raw(&self) -> Result<Option<String>> {
        match self.entry()?.get_password() {
            Ok(raw) => Ok(Some(raw)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(error) => Err(keychain_error(error)),
        }
    }

    #[cfg(test)]
    fn read_raw(&self) -> Result<Option<String>> {
        let slots = Self::slots().lock().map_err(keychain_error)?;
        Ok(slots.get(&self.account).cloned())
    }

    #[cfg(not(test))]
    fn write_raw(&self, raw: &str) -> Result<()> {
        self.entry()?.set_password(raw).map_err(keychain_error)
    }

    #[cfg(test)]
    fn write_raw(&self, raw: &str) -> Result<()> {
        let mut slots = Self::slots().lock().map_err(keychain_error)?;
        slots.insert(self.account.clone(), raw.to_string());
        Ok(())
    }

    #[cfg(not(test))]
    fn remove_raw(&self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(error) => Err(keychain_error(error)),
        }
    }

    #[cfg(test)]
    fn remove_raw(&self) -> Result<()> {
        let mut slots = Self::slots().lock().map_err(keychain_error)?;
        slots.remove(&self.account);
        Ok(())
    }
}

fn keychain_error(error: impl std::fmt::Display) -> Error {
    Error::Credentials(format!("keychain: {error}"))
}

impl SessionPersistence for KeychainSession {
    fn load(&self) -> Result<Option<AuthSession>> {
        self.read_raw()?
            .map(|raw| serde_json::from_str(&raw))
            .transpose()
            .map_err(Error::from)
    }

    fn save(&self, session: &AuthSession) -> Result<()> {
        self.write_raw(&serde_json::to_string(session)?)
    }

    fn clear(&self) -> Result<()> {
        self.remove_raw()
    }
}
