//! Configuration for the vault, its collaborators and the session slot.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default read chunk size for content store streams (256 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 256 * 1024;

/// Default upper bound for a single cleartext payload (64 MiB).
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Default name of the persisted session slot.
pub const DEFAULT_SESSION_SLOT: &str = "crimeUser";

/// Content store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Path to the blob database file.
    pub path: String,
    /// Whether to use an in-memory database (for testing).
    pub in_memory: bool,
    /// Size of the chunks yielded by `get`.
    pub chunk_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: "evidence-blobs.db".to_string(),
            in_memory: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Ledger configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LedgerConfig {
    /// Path to the ledger database file.
    pub path: String,
    /// Whether to use an in-memory database (for testing).
    pub in_memory: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: "evidence-ledger.db".to_string(),
            in_memory: false,
        }
    }
}

/// Session persistence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Directory holding the session slots.
    pub dir: PathBuf,
    /// Slot name the logged-in session is stored under.
    pub slot: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(".evidence"),
            slot: DEFAULT_SESSION_SLOT.to_string(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VaultConfig {
    /// Content store settings.
    pub store: StoreConfig,
    /// Ledger settings.
    pub ledger: LedgerConfig,
    /// Session slot settings.
    pub session: SessionConfig,
    /// Description written on-chain for sealed records.
    pub sealed_description: String,
    /// Largest cleartext payload accepted by `seal`.
    pub max_payload_bytes: usize,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            ledger: LedgerConfig::default(),
            session: SessionConfig::default(),
            sealed_description: crate::SEALED_DESCRIPTION.to_string(),
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }
}

impl VaultConfig {
    /// In-memory configuration for tests and demos.
    pub fn in_memory() -> Self {
        let mut config = Self::default();
        config.store.in_memory = true;
        config.ledger.in_memory = true;
        config
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Error::InvalidInput(format!("invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&json)
    }

    /// Check the values that would otherwise fail later at runtime.
    pub fn validate(&self) -> Result<()> {
        if self.store.chunk_size == 0 {
            return Err(Error::InvalidInput("store.chunk_size must be positive".into()));
        }
        if self.sealed_description.trim().is_empty() {
            return Err(Error::InvalidInput("sealed_description must not be empty".into()));
        }
        if self.session.slot.trim().is_empty() {
            return Err(Error::InvalidInput("session.slot must not be empty".into()));
        }
        if self.max_payload_bytes == 0 {
            return Err(Error::InvalidInput("max_payload_bytes must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = VaultConfig::default();
        assert_eq!(config.sealed_description, "Encrypted Evidence");
        assert_eq!(config.session.slot, "crimeUser");
        assert_eq!(config.store.chunk_size, DEFAULT_CHUNK_SIZE);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = VaultConfig::from_json_str(r#"{"store": {"chunk_size": 1024}}"#)
            .expect("parse config");
        assert_eq!(config.store.chunk_size, 1024);
        assert_eq!(config.store.path, "evidence-blobs.db");
        assert_eq!(config.ledger.path, "evidence-ledger.db");
    }

    #[test]
    fn test_rejects_unknown_fields() {
        let err = VaultConfig::from_json_str(r#"{"ipfs_host": "ipfs.infura.io"}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_rejects_zero_chunk_size() {
        let err = VaultConfig::from_json_str(r#"{"store": {"chunk_size": 0}}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("vault.json");
        std::fs::write(&path, r#"{"sealed_description": "Sealed"}"#).expect("write config");

        let config = VaultConfig::load(&path).expect("load config");
        assert_eq!(config.sealed_description, "Sealed");
    }
}
