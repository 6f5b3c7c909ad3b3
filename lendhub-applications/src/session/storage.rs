//! Session Storage - typed boundary over the key-value store
//!
//! Every read of a persisted record goes through [`UserRecord::parse`], so a
//! malformed value is caught here and never reaches the session store.

use super::errors::StoredRecordError;
use super::types::UserRecord;
use lendhub_core::{KeyValueStore, StorageError};
use std::sync::Arc;
use tracing::{debug, warn};

/// Key holding the serialized current user
pub const CURRENT_USER_KEY: &str = "lendhub.currentUser";
/// Key holding the ordered registered-user collection
pub const USERS_KEY: &str = "lendhub.users";
/// Key holding the opaque session token
pub const TOKEN_KEY: &str = "lendhub.authToken";

/// Result of reading a persisted value
#[derive(Debug)]
pub enum Loaded<T> {
    Present(T),
    Absent,
    /// The value existed but was corrupt and has been removed
    Cleared(StoredRecordError),
}

impl<T> Loaded<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            Loaded::Present(value) => Some(value),
            Loaded::Absent | Loaded::Cleared(_) => None,
        }
    }
}

/// Typed access to the session keys
#[derive(Clone)]
pub struct SessionStorage {
    store: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for SessionStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStorage")
            .field("backend", &self.store.backend_name())
            .finish()
    }
}

impl SessionStorage {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    /// Read the current user, clearing the key if it is corrupt
    pub fn load_current(&self) -> Loaded<UserRecord> {
        let raw = match self.store.get(CURRENT_USER_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Loaded::Absent,
            Err(e) => {
                warn!("Failed to read current user: {}", e);
                return Loaded::Absent;
            }
        };

        match UserRecord::parse(&raw) {
            Ok(record) => {
                debug!("Loaded current user {}", record.id);
                Loaded::Present(record)
            }
            Err(e) => {
                warn!("Current user record is corrupt, clearing it: {}", e);
                if let Err(remove_err) = self.store.remove(CURRENT_USER_KEY) {
                    warn!("Failed to clear corrupt current user: {}", remove_err);
                }
                Loaded::Cleared(e)
            }
        }
    }

    /// Persist the current user
    pub fn save_current(&self, record: &UserRecord) -> Result<(), StorageError> {
        let json = serde_json::to_string(record)?;
        self.store.set(CURRENT_USER_KEY, &json)
    }

    pub fn clear_current(&self) -> Result<(), StorageError> {
        self.store.remove(CURRENT_USER_KEY)
    }

    /// Read the registered-user collection. A corrupt collection is cleared and
    /// read as empty.
    pub fn load_users(&self) -> Loaded<Vec<UserRecord>> {
        let raw = match self.store.get(USERS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Loaded::Absent,
            Err(e) => {
                warn!("Failed to read user collection: {}", e);
                return Loaded::Absent;
            }
        };

        match UserRecord::parse_collection(&raw) {
            Ok(users) => Loaded::Present(users),
            Err(e) => {
                warn!("User collection is corrupt, clearing it: {}", e);
                if let Err(remove_err) = self.store.remove(USERS_KEY) {
                    warn!("Failed to clear corrupt user collection: {}", remove_err);
                }
                Loaded::Cleared(e)
            }
        }
    }

    /// Registered users, empty when absent or corrupt
    pub fn users(&self) -> Vec<UserRecord> {
        self.load_users().into_option().unwrap_or_default()
    }

    pub fn save_users(&self, users: &[UserRecord]) -> Result<(), StorageError> {
        let json = serde_json::to_string(users)?;
        self.store.set(USERS_KEY, &json)
    }

    pub fn token(&self) -> Option<String> {
        self.store.get(TOKEN_KEY).ok().flatten()
    }

    pub fn save_token(&self, token: &str) -> Result<(), StorageError> {
        self.store.set(TOKEN_KEY, token)
    }

    pub fn clear_token(&self) -> Result<(), StorageError> {
        self.store.remove(TOKEN_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::session::types::UserDraft;
    use chrono::Local;
    use lendhub_core::MemoryStore;

    fn storage() -> (Arc<MemoryStore>, SessionStorage) {
        let store = Arc::new(MemoryStore::new());
        (store.clone(), SessionStorage::new(store))
    }

    fn record() -> UserRecord {
        let draft = UserDraft {
            full_name: "Kofi Mensah".into(),
            phone: "+233241112222".into(),
            country: "GH".into(),
            password: "password".into(),
            email: None,
        };
        UserRecord::from_draft(draft, Role::Lender, Local::now())
    }

    #[test]
    fn test_current_user_roundtrip() {
        let (_, storage) = storage();
        let record = record();
        storage.save_current(&record).unwrap();

        match storage.load_current() {
            Loaded::Present(loaded) => assert_eq!(loaded, record),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_corrupt_current_user_is_cleared() {
        let (store, storage) = storage();
        store.set(CURRENT_USER_KEY, "{\"id\": 42").unwrap();

        assert!(matches!(storage.load_current(), Loaded::Cleared(_)));
        assert_eq!(store.get(CURRENT_USER_KEY).unwrap(), None);
        assert!(matches!(storage.load_current(), Loaded::Absent));
    }

    #[test]
    fn test_corrupt_collection_reads_empty() {
        let (store, storage) = storage();
        store.set(USERS_KEY, "[{\"nope\": true}]").unwrap();

        assert!(storage.users().is_empty());
        assert_eq!(store.get(USERS_KEY).unwrap(), None);
    }
}
