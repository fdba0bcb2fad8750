//! Logged-in session and its persisted slot.
//!
//! A session is an identity (wallet address) plus a role. It is persisted as
//! one JSON document in a named slot so it survives restarts, read once at
//! startup and written only on login and logout. The vault never reads it;
//! callers hand the [`Session`] to the workflow explicitly.

use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::logging::RedactedIdentity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Minimum accepted length of an identity at login.
pub const MIN_ADDRESS_LEN: usize = 10;

/// Agency a user acts for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Police officers register cases and exhibits.
    Police,
    /// Forensic lab staff.
    Forensic,
    /// Hospital staff attaching medical proof.
    Hospital,
    /// Court officials; read-only.
    Court,
}

impl Role {
    /// Whether this role may open evidence records.
    pub fn can_view_evidence(self) -> bool {
        matches!(self, Role::Police | Role::Forensic | Role::Hospital | Role::Court)
    }

    /// Whether this role may submit new evidence.
    pub fn can_submit_evidence(self) -> bool {
        matches!(self, Role::Police | Role::Forensic | Role::Hospital)
    }

    /// Whether this role may share evidence with another agency.
    pub fn can_share_evidence(self) -> bool {
        matches!(self, Role::Police | Role::Forensic)
    }

    /// Whether this role may attach medical proof to a case.
    pub fn can_upload_proof(self) -> bool {
        matches!(self, Role::Hospital)
    }

    /// Lower-case role name.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Police => "police",
            Role::Forensic => "forensic",
            Role::Hospital => "hospital",
            Role::Court => "court",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A logged-in user.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Wallet address; also the input to key derivation.
    pub address: String,
    /// Acting role.
    pub role: Role,
    /// Login time.
    pub logged_at: DateTime<Utc>,
}

impl Session {
    /// Start a session for `address` acting as `role`.
    pub fn login(address: impl Into<String>, role: Role) -> Result<Self> {
        let address = address.into().trim().to_string();
        if address.chars().count() < MIN_ADDRESS_LEN {
            return Err(Error::InvalidIdentity);
        }
        Ok(Self {
            address,
            role,
            logged_at: Utc::now(),
        })
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("address", &RedactedIdentity(&self.address))
            .field("role", &self.role)
            .field("logged_at", &self.logged_at)
            .finish()
    }
}

/// Directory-backed key-value slot holding the current session.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// Slot `slot` inside `dir`.
    pub fn new(dir: impl AsRef<Path>, slot: &str) -> Self {
        Self {
            path: dir.as_ref().join(format!("{}.json", slot)),
        }
    }

    /// Slot described by the configuration.
    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(&config.dir, &config.slot)
    }

    /// Path of the slot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted session, if any.
    pub async fn load(&self) -> Result<Option<Session>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => {
                let session: Session = serde_json::from_slice(&bytes)?;
                debug!(
                    user = %RedactedIdentity(&session.address),
                    role = %session.role,
                    "Restored session"
                );
                Ok(Some(session))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Persist `session` (login).
    pub async fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(session)?;
        tokio::fs::write(&self.path, json).await?;
        info!(user = %RedactedIdentity(&session.address), role = %session.role, "Logged in");
        Ok(())
    }

    /// Remove the persisted session (logout). Clearing an empty slot is a no-op.
    pub async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                info!("Logged out");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_rejects_short_address() {
        assert!(matches!(Session::login("0x123", Role::Police), Err(Error::InvalidIdentity)));
        assert!(matches!(Session::login("   ", Role::Police), Err(Error::InvalidIdentity)));
        let session = Session::login("0xABCDEF0123", Role::Hospital).expect("login");
        assert_eq!(session.address, "0xABCDEF0123");
    }

    #[test]
    fn test_role_permissions() {
        assert!(Role::Court.can_view_evidence());
        assert!(!Role::Court.can_submit_evidence());
        assert!(Role::Hospital.can_submit_evidence());
        assert!(!Role::Hospital.can_share_evidence());
        assert!(Role::Forensic.can_share_evidence());
        assert!(Role::Hospital.can_upload_proof());
        assert!(!Role::Police.can_upload_proof());
        assert!(!Role::Court.can_upload_proof());
    }

    #[test]
    fn test_session_json_shape() {
        let session = Session::login("0xABCDEF0123", Role::Forensic).expect("login");
        let value = serde_json::to_value(&session).expect("serialize");
        assert_eq!(value["address"], "0xABCDEF0123");
        assert_eq!(value["role"], "forensic");
        assert!(value.get("loggedAt").is_some());
    }

    #[test]
    fn test_debug_redacts_address() {
        let session = Session::login("0xABCDEF0123456789", Role::Police).expect("login");
        let debug = format!("{:?}", session);
        assert!(!debug.contains("0xABCDEF0123456789"));
    }

    #[tokio::test]
    async fn test_save_load_clear() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SessionStore::new(dir.path().join("state"), "crimeUser");

        assert!(store.load().await.expect("load").is_none());

        let session = Session::login("0xABCDEF0123", Role::Police).expect("login");
        store.save(&session).await.expect("save");
        assert_eq!(store.load().await.expect("load"), Some(session));

        store.clear().await.expect("clear");
        assert!(store.load().await.expect("load").is_none());
        store.clear().await.expect("second clear");
    }

    #[tokio::test]
    async fn test_corrupt_slot() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SessionStore::new(dir.path(), "crimeUser");
        std::fs::write(store.path(), b"{not json").expect("write");
        assert!(matches!(store.load().await, Err(Error::Encoding(_))));
    }
}
