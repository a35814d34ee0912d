//! Chain state persistence layer
//!
//! Provides save/load functionality for the chain state.

use crate::core::Chain;
use std::fs;
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub state_file: String,
    pub backup_enabled: bool,
    pub max_backups: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".quorum_data"),
            state_file: "chain.json".to_string(),
            backup_enabled: true,
            max_backups: 5,
        }
    }
}

/// Chain state storage manager
pub struct Storage {
    config: StorageConfig,
}

impl Storage {
    /// Create a new storage manager
    pub fn new(config: StorageConfig) -> Result<Self, StorageError> {
        fs::create_dir_all(&config.data_dir)?;
        Ok(Self { config })
    }

    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    fn state_path(&self) -> PathBuf {
        self.config.data_dir.join(&self.config.state_file)
    }

    fn backup_path(&self, index: usize) -> PathBuf {
        self.config
            .data_dir
            .join(format!("{}.backup.{}", self.config.state_file, index))
    }

    /// Save the chain to disk
    pub fn save(&self, chain: &Chain) -> Result<(), StorageError> {
        let path = self.state_path();

        if self.config.backup_enabled && self.config.max_backups > 0 && path.exists() {
            self.rotate_backups()?;
            fs::copy(&path, self.backup_path(0))?;
        }

        // Write to temporary file first
        let temp_path = self.config.data_dir.join("chain.tmp");
        let file = fs::File::create(&temp_path)?;
        let writer = BufWriter::new(file);

        serde_json::to_writer_pretty(writer, chain)?;

        // Atomic rename
        fs::rename(&temp_path, &path)?;

        Ok(())
    }

    /// Load the chain from disk
    pub fn load(&self) -> Result<Chain, StorageError> {
        let path = self.state_path();

        if !path.exists() {
            return Err(StorageError::InvalidData(
                "Chain state file not found".to_string(),
            ));
        }

        load_from_file(&path)
    }

    /// Load the saved chain, or start an empty one
    pub fn load_or_default(&self) -> Result<Chain, StorageError> {
        if self.exists() {
            self.load()
        } else {
            Ok(Chain::new())
        }
    }

    /// Check if a saved chain exists
    pub fn exists(&self) -> bool {
        self.state_path().exists()
    }

    fn rotate_backups(&self) -> Result<(), StorageError> {
        // Delete oldest backup
        let oldest = self.backup_path(self.config.max_backups - 1);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }

        // Shift existing backups
        for i in (0..self.config.max_backups - 1).rev() {
            let current = self.backup_path(i);
            if current.exists() {
                fs::rename(&current, self.backup_path(i + 1))?;
            }
        }

        Ok(())
    }

    /// Restore from a backup
    pub fn restore_backup(&self, backup_index: usize) -> Result<Chain, StorageError> {
        let backup_path = self.backup_path(backup_index);

        if !backup_path.exists() {
            return Err(StorageError::InvalidData(format!(
                "Backup {} not found",
                backup_index
            )));
        }

        load_from_file(&backup_path)
    }

    /// List available backups
    pub fn list_backups(&self) -> Vec<usize> {
        (0..self.config.max_backups)
            .filter(|i| self.backup_path(*i).exists())
            .collect()
    }
}

/// Save chain state to a specific file path
pub fn save_to_file(chain: &Chain, path: &Path) -> Result<(), StorageError> {
    let file = fs::File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, chain)?;
    Ok(())
}

/// Load chain state from a specific file path
pub fn load_from_file(path: &Path) -> Result<Chain, StorageError> {
    let file = fs::File::open(path)?;
    let reader = BufReader::new(file);
    Ok(serde_json::from_reader(reader)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Address;

    fn addr(n: u8) -> Address {
        Address::from_bytes([n; 20])
    }

    fn storage(dir: &tempfile::TempDir, max_backups: usize) -> Storage {
        Storage::new(StorageConfig {
            data_dir: dir.path().to_path_buf(),
            max_backups,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_save_load_chain() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = storage(&temp_dir, 5);

        let mut chain = Chain::new();
        chain.mint(addr(1), 50);
        let wallet = chain
            .deploy_wallet(addr(1), vec![addr(1), addr(2)], 2)
            .unwrap()
            .output;
        chain
            .submit_transaction(addr(1), wallet, addr(3), 0, vec![])
            .unwrap();

        storage.save(&chain).unwrap();
        assert!(storage.exists());

        let loaded = storage.load().unwrap();
        assert_eq!(loaded.balance_of(&addr(1)), 50);
        let loaded_wallet = loaded.wallet(&wallet).unwrap();
        assert_eq!(loaded_wallet.required(), 2);
        assert_eq!(loaded_wallet.confirmation_count(0), 1);
        assert_eq!(loaded.logs().len(), chain.logs().len());
    }

    #[test]
    fn test_missing_state() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = storage(&temp_dir, 5);

        assert!(matches!(storage.load(), Err(StorageError::InvalidData(_))));
        assert_eq!(storage.load_or_default().unwrap().contracts().count(), 0);
    }

    #[test]
    fn test_backup_rotation() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = storage(&temp_dir, 3);
        let mut chain = Chain::new();

        for i in 0..5 {
            chain.mint(addr(1), 1);
            storage.save(&chain).unwrap();
            assert_eq!(storage.list_backups().len(), i.min(3));
        }

        // Backup 0 holds the state before the last save
        let previous = storage.restore_backup(0).unwrap();
        assert_eq!(previous.balance_of(&addr(1)), 4);
        assert!(storage.restore_backup(7).is_err());
    }
}
