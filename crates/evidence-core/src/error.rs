//! Error types for the evidence vault.
//!
//! Every failure is local to one user action. The display strings are the
//! messages a status banner shows, so they never carry key material or
//! cleartext; the attached detail strings are for logs only.

use thiserror::Error;

/// Core error type for vault, store and ledger operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Empty or malformed identity supplied to key derivation or login.
    #[error("invalid identity")]
    InvalidIdentity,

    /// The sealed string cannot be split into its cipher components, or the
    /// stored bytes no longer hash to their content id.
    #[error("corrupted evidence")]
    MalformedPayload(String),

    /// Authentication failed after decryption.
    /// Deliberately carries no detail to avoid acting as an oracle.
    #[error("wrong key or corrupted data")]
    DecryptionFailed,

    /// Content store unreachable or refused the request.
    #[error("content store unavailable")]
    StoreUnavailable(String),

    /// Ledger client unreachable or the call reverted.
    #[error("ledger unavailable")]
    LedgerUnavailable(String),

    /// No ledger record with this id.
    #[error("record {0} not found")]
    RecordNotFound(u64),

    /// The session role may not perform this action.
    #[error("access denied")]
    AccessDenied(String),

    /// Caller-supplied input failed validation.
    #[error("invalid input")]
    InvalidInput(String),

    /// Serialization or deserialization failed.
    #[error("encoding error")]
    Encoding(String),

    /// Local storage (database, session slot) failed.
    #[error("storage error")]
    Storage(String),
}

/// Result type alias using the vault's Error.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether the caller may retry the same action with backoff.
    ///
    /// Only collaborator failures qualify; the vault itself never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::StoreUnavailable(_) | Error::LedgerUnavailable(_))
    }

    /// Banner text for the user-visible status line.
    pub fn user_message(&self) -> &'static str {
        match self {
            Error::InvalidIdentity => "Please connect or enter a valid wallet address.",
            Error::MalformedPayload(_) => "Corrupted evidence: the stored payload cannot be read.",
            Error::DecryptionFailed => "Wrong key or corrupted data.",
            Error::StoreUnavailable(_) => "Network error while contacting the content store.",
            Error::LedgerUnavailable(_) => {
                "Blockchain not reachable. Please check your wallet connection."
            }
            Error::RecordNotFound(_) => "No evidence found for this record.",
            Error::AccessDenied(_) => "Access denied for your role.",
            Error::InvalidInput(_) => "Please fill in all required fields.",
            Error::Encoding(_) | Error::Storage(_) => "Unexpected local error.",
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Storage(e.to_string())
    }
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Error::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Encoding(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_collaborator_errors_retry() {
        assert!(Error::StoreUnavailable("timeout".into()).is_retryable());
        assert!(Error::LedgerUnavailable("reverted".into()).is_retryable());
        assert!(!Error::DecryptionFailed.is_retryable());
        assert!(!Error::MalformedPayload("bad".into()).is_retryable());
        assert!(!Error::InvalidIdentity.is_retryable());
        assert!(!Error::RecordNotFound(7).is_retryable());
    }

    #[test]
    fn test_display_hides_detail() {
        let err = Error::MalformedPayload("salt section missing".into());
        assert_eq!(err.to_string(), "corrupted evidence");

        let err = Error::StoreUnavailable("connection refused 10.0.0.1".into());
        assert!(!err.to_string().contains("10.0.0.1"));
    }

    #[test]
    fn test_distinct_user_messages() {
        assert_ne!(
            Error::StoreUnavailable(String::new()).user_message(),
            Error::DecryptionFailed.user_message()
        );
        assert_eq!(Error::RecordNotFound(3).to_string(), "record 3 not found");
    }
}
