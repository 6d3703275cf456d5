//! Token store and its durable backends

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use keyring::Entry;
use std::sync::RwLock;
use tracing::{debug, info};

use super::credential::{Credential, CredentialStatus, StoredCredential};

const KEYRING_SERVICE: &str = "spotify-widget";
const KEYRING_ENTRY: &str = "spotify:credential";

/// Durable key-value storage for the credential pair
pub trait CredentialStorage: Send + Sync {
    /// Read the stored pair, `None` when nothing was ever saved
    fn load(&self) -> Result<Option<Credential>>;

    /// Write token and expiry together
    fn save(&self, credential: &Credential) -> Result<()>;

    /// Remove the stored pair
    fn clear(&self) -> Result<()>;
}

/// System keyring backend
///
/// Token and expiry live in a single entry so they are always written as a pair.
pub struct KeyringStorage {
    entry: Entry,
}

impl KeyringStorage {
    pub fn new() -> Result<Self> {
        let entry = Entry::new(KEYRING_SERVICE, KEYRING_ENTRY).context("Failed to access keyring")?;
        Ok(Self { entry })
    }
}

impl CredentialStorage for KeyringStorage {
    fn load(&self) -> Result<Option<Credential>> {
        let raw = match self.entry.get_password() {
            Ok(raw) => raw,
            Err(keyring::Error::NoEntry) => return Ok(None),
            Err(e) => return Err(e).context("Failed to read credential from keyring"),
        };

        let stored: StoredCredential =
            serde_json::from_str(&raw).context("Stored credential is not valid JSON")?;
        Ok(stored.into_credential())
    }

    fn save(&self, credential: &Credential) -> Result<()> {
        let raw = serde_json::to_string(&StoredCredential::from(credential))
            .context("Failed to serialize credential")?;
        self.entry
            .set_password(&raw)
            .context("Failed to store credential in keyring")?;
        debug!("Credential stored in keyring");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match self.entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to remove credential from keyring"),
        }
    }
}

/// Process-local backend
#[cfg(test)]
#[derive(Default)]
pub struct MemoryStorage {
    slot: std::sync::Mutex<Option<Credential>>,
}

#[cfg(test)]
impl MemoryStorage {
    pub fn with(credential: Credential) -> Self {
        Self {
            slot: std::sync::Mutex::new(Some(credential)),
        }
    }
}

#[cfg(test)]
impl CredentialStorage for MemoryStorage {
    fn load(&self) -> Result<Option<Credential>> {
        Ok(self.slot.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn save(&self, credential: &Credential) -> Result<()> {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(credential.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}

/// Current credential, cached in memory over a durable backend
pub struct TokenStore {
    storage: Box<dyn CredentialStorage>,
    current: RwLock<Option<Credential>>,
}

impl TokenStore {
    /// Open the store and read whatever the backend holds
    pub fn open(storage: Box<dyn CredentialStorage>) -> Result<Self> {
        let current = storage.load()?;
        if current.is_some() {
            debug!("Loaded stored Spotify credential");
        }
        Ok(Self {
            storage,
            current: RwLock::new(current),
        })
    }

    /// Store backed by memory only
    #[cfg(test)]
    pub fn in_memory(credential: Option<Credential>) -> Self {
        let storage = match &credential {
            Some(cred) => MemoryStorage::with(cred.clone()),
            None => MemoryStorage::default(),
        };
        Self {
            storage: Box::new(storage),
            current: RwLock::new(credential),
        }
    }

    pub fn get(&self) -> Option<Credential> {
        self.current.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Persist the pair, then make it current
    pub fn set(&self, credential: Credential) -> Result<()> {
        self.storage.save(&credential)?;
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = Some(credential);
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        self.storage.clear()?;
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = None;
        info!("Spotify credential cleared");
        Ok(())
    }

    pub fn status_at(&self, now: DateTime<Utc>) -> CredentialStatus {
        self.get()
            .map(|c| c.status_at(now))
            .unwrap_or(CredentialStatus::Missing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_set_persists_to_backend() {
        let store = TokenStore::open(Box::new(MemoryStorage::default())).unwrap();
        assert_eq!(store.status_at(Utc::now()), CredentialStatus::Missing);

        let cred = Credential {
            access_token: "AQX".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
        };
        store.set(cred.clone()).unwrap();

        assert_eq!(store.get(), Some(cred.clone()));
        assert_eq!(store.storage.load().unwrap(), Some(cred));
        assert_eq!(store.status_at(Utc::now()), CredentialStatus::Valid);
    }

    #[test]
    fn test_open_reads_existing_pair() {
        let cred = Credential {
            access_token: "old".to_string(),
            expires_at: Utc::now() - Duration::minutes(1),
        };
        let store = TokenStore::open(Box::new(MemoryStorage::with(cred))).unwrap();
        assert_eq!(store.status_at(Utc::now()), CredentialStatus::Expired);
    }

    #[test]
    fn test_clear_removes_pair() {
        let store = TokenStore::in_memory(Some(Credential {
            access_token: "AQX".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
        }));
        store.clear().unwrap();
        assert!(store.get().is_none());
        assert!(store.storage.load().unwrap().is_none());
    }
}
