//! Key store for owner keys
//!
//! Keeps one JSON file per key so the CLI can act as an owner and produce
//! endorsements.

use crate::core::Address;
use crate::crypto::{KeyError, KeyPair};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Key store errors
#[derive(Error, Debug)]
pub enum KeystoreError {
    #[error("Key not found: {0}")]
    NotFound(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Crypto error: {0}")]
    CryptoError(#[from] KeyError),
}

/// Serializable key data for persistence
#[derive(Debug, Serialize, Deserialize)]
struct KeyData {
    private_key_hex: String,
    address: Address,
    label: Option<String>,
}

/// A stored key with its optional label
pub struct StoredKey {
    key_pair: KeyPair,
    pub label: Option<String>,
}

impl StoredKey {
    /// Create a fresh key
    pub fn generate(label: Option<&str>) -> Self {
        Self {
            key_pair: KeyPair::generate(),
            label: label.map(str::to_string),
        }
    }

    /// Import a key from a private key
    pub fn from_private_key(private_key_hex: &str, label: Option<&str>) -> Result<Self, KeystoreError> {
        Ok(Self {
            key_pair: KeyPair::from_private_key_hex(private_key_hex)?,
            label: label.map(str::to_string),
        })
    }

    pub fn address(&self) -> Address {
        self.key_pair.address()
    }

    pub fn key_pair(&self) -> &KeyPair {
        &self.key_pair
    }

    /// Save key to file
    pub fn save(&self, path: &Path) -> Result<(), KeystoreError> {
        let data = KeyData {
            private_key_hex: self.key_pair.private_key_hex(),
            address: self.address(),
            label: self.label.clone(),
        };

        let json = serde_json::to_string_pretty(&data)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Load key from file
    pub fn load(path: &Path) -> Result<Self, KeystoreError> {
        let json = fs::read_to_string(path)?;
        let data: KeyData = serde_json::from_str(&json)?;

        let mut key = Self::from_private_key(&data.private_key_hex, None)?;
        key.label = data.label;
        Ok(key)
    }

    /// Public key information (safe to share)
    pub fn info(&self) -> KeyInfo {
        KeyInfo {
            address: self.address(),
            public_key: self.key_pair.public_key_hex(),
            label: self.label.clone(),
        }
    }
}

/// Public key information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyInfo {
    pub address: Address,
    pub public_key: String,
    pub label: Option<String>,
}

/// Directory of key files named by address
pub struct KeyStore {
    keys_dir: PathBuf,
}

impl KeyStore {
    pub fn new(keys_dir: &Path) -> Result<Self, KeystoreError> {
        fs::create_dir_all(keys_dir)?;
        Ok(Self {
            keys_dir: keys_dir.to_path_buf(),
        })
    }

    fn key_path(&self, address: &Address) -> PathBuf {
        self.keys_dir.join(format!("{}.json", address))
    }

    /// Create and save a new key
    pub fn create(&self, label: Option<&str>) -> Result<StoredKey, KeystoreError> {
        let key = StoredKey::generate(label);
        key.save(&self.key_path(&key.address()))?;
        Ok(key)
    }

    /// Save an imported key
    pub fn import(&self, private_key_hex: &str, label: Option<&str>) -> Result<StoredKey, KeystoreError> {
        let key = StoredKey::from_private_key(private_key_hex, label)?;
        key.save(&self.key_path(&key.address()))?;
        Ok(key)
    }

    /// All stored keys, sorted by address
    pub fn list(&self) -> Result<Vec<StoredKey>, KeystoreError> {
        let mut keys = Vec::new();

        for entry in fs::read_dir(&self.keys_dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|e| e == "json") {
                if let Ok(key) = StoredKey::load(&path) {
                    keys.push(key);
                }
            }
        }

        keys.sort_by_key(StoredKey::address);
        Ok(keys)
    }

    /// Load a key by address
    pub fn load(&self, address: &Address) -> Result<StoredKey, KeystoreError> {
        let path = self.key_path(address);
        if !path.exists() {
            return Err(KeystoreError::NotFound(address.to_string()));
        }
        StoredKey::load(&path)
    }

    /// Load a key by address or label
    pub fn find(&self, name: &str) -> Result<StoredKey, KeystoreError> {
        if let Ok(address) = name.parse::<Address>() {
            return self.load(&address);
        }
        self.list()?
            .into_iter()
            .find(|key| key.label.as_deref() == Some(name))
            .ok_or_else(|| KeystoreError::NotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_save_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("key.json");

        let key = StoredKey::generate(Some("alice"));
        key.save(&path).unwrap();

        let loaded = StoredKey::load(&path).unwrap();
        assert_eq!(loaded.address(), key.address());
        assert_eq!(loaded.label.as_deref(), Some("alice"));
    }

    #[test]
    fn test_keystore_find_by_label_or_address() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = KeyStore::new(temp_dir.path()).unwrap();

        let alice = store.create(Some("alice")).unwrap();
        let bob = store.create(Some("bob")).unwrap();
        assert_eq!(store.list().unwrap().len(), 2);

        assert_eq!(store.find("bob").unwrap().address(), bob.address());
        assert_eq!(
            store.find(&alice.address().to_string()).unwrap().address(),
            alice.address()
        );
        assert!(matches!(
            store.find("carol"),
            Err(KeystoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_import_restores_address() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = KeyStore::new(temp_dir.path()).unwrap();

        let original = KeyPair::generate();
        let imported = store.import(&original.private_key_hex(), None).unwrap();
        assert_eq!(imported.address(), original.address());

        assert_eq!(store.load(&original.address()).unwrap().address(), original.address());
        assert!(store.load(&KeyPair::generate().address()).is_err());
    }
}
