//! Append-only, tamper-evident record log.
//!
//! The ledger stands in for the evidence contract: records are appended,
//! read back by id or in full, and every write emits events that an audit
//! view can replay. No record is ever updated or deleted.
//!
//! Each write is mined into its own block, so block numbers give the
//! global order of records and audit events.

pub mod audit;
mod memory;
mod schema;
mod sqlite;

pub use audit::{audit_trail, AuditEntry};
pub use memory::MemoryLedger;
pub use sqlite::SqliteLedger;

use crate::error::Result;
use crate::store::ContentId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Ledger-assigned record identifier (0-based, dense).
pub type RecordId = u64;

/// A record as stored on the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Position in the ledger.
    pub record_id: RecordId,
    /// Case identifier.
    pub case_id: String,
    /// Exhibit name.
    pub exhibit_name: String,
    /// Either a legacy plain description or the sealed sentinel.
    pub description: String,
    /// Timestamp supplied by the submitter.
    pub timestamp: String,
    /// Content id of the sealed metadata (empty for legacy records).
    pub content_id: ContentId,
    /// Identity that sent the transaction.
    pub added_by: String,
}

impl Record {
    /// Whether the description lives inside sealed metadata.
    pub fn is_sealed(&self, sealed_description: &str) -> bool {
        self.description == sealed_description && !self.content_id.is_empty()
    }
}

/// Arguments of `add_record`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    /// Case identifier.
    pub case_id: String,
    /// Exhibit name.
    pub exhibit_name: String,
    /// Description or sentinel.
    pub description: String,
    /// Timestamp.
    pub timestamp: String,
    /// Content id of the sealed metadata.
    pub content_id: ContentId,
}

/// Kinds of events emitted by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEventKind {
    /// A record was appended.
    RecordAdded,
    /// A record was viewed.
    RecordAccessed,
    /// A consent proof was logged when sharing evidence.
    ConsentLogged,
    /// A hospital attached sealed medical proof to a case.
    ProofAdded,
}

impl LedgerEventKind {
    /// Stable name used for persistence.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RecordAdded => "RecordAdded",
            Self::RecordAccessed => "RecordAccessed",
            Self::ConsentLogged => "ConsentLogged",
            Self::ProofAdded => "ProofAdded",
        }
    }

    /// Parse a persisted name.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "RecordAdded" => Some(Self::RecordAdded),
            "RecordAccessed" => Some(Self::RecordAccessed),
            "ConsentLogged" => Some(Self::ConsentLogged),
            "ProofAdded" => Some(Self::ProofAdded),
            _ => None,
        }
    }
}

/// An event emitted by a ledger write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEvent {
    /// Event kind.
    pub kind: LedgerEventKind,
    /// Record concerned, if any.
    pub record_id: Option<RecordId>,
    /// Identity that caused the event.
    pub actor: String,
    /// Block the event was emitted in.
    pub block_number: u64,
    /// Transaction hash.
    pub tx_hash: String,
    /// Extra data: the case id for additions and proofs, the consent hash
    /// for consent.
    pub detail: Option<String>,
}

/// Medical proof anchored against a case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HospitalProof {
    /// Case the proof belongs to.
    pub case_id: String,
    /// Content id of the sealed proof file.
    pub content_id: ContentId,
    /// Identity that sent the transaction; its key sealed the file.
    pub added_by: String,
    /// Block the proof was mined in.
    pub block_number: u64,
    /// Transaction hash.
    pub tx_hash: String,
}

/// Result of a ledger write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    /// Transaction hash.
    pub tx_hash: String,
    /// Block the transaction was included in.
    pub block_number: u64,
    /// Events emitted by the transaction.
    pub events: Vec<LedgerEvent>,
}

impl TransactionReceipt {
    /// Id of the record added by this transaction, if any.
    pub fn record_id(&self) -> Option<RecordId> {
        self.events
            .iter()
            .find(|e| e.kind == LedgerEventKind::RecordAdded)
            .and_then(|e| e.record_id)
    }
}

/// Capability set of the evidence ledger.
///
/// Implementations surface transport failures as
/// [`crate::Error::LedgerUnavailable`] and unknown ids as
/// [`crate::Error::RecordNotFound`].
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Append a record sent by `from`.
    async fn add_record(&self, record: NewRecord, from: &str) -> Result<TransactionReceipt>;

    /// Point lookup.
    async fn get_record(&self, record_id: RecordId) -> Result<Record>;

    /// Every record, in ledger order.
    async fn get_all_records(&self) -> Result<Vec<Record>>;

    /// Number of records.
    async fn get_record_count(&self) -> Result<u64>;

    /// Append an access event for `record_id`.
    async fn log_access(&self, record_id: RecordId, accessor: &str) -> Result<TransactionReceipt>;

    /// Append a consent proof sent by `from`.
    async fn log_consent(&self, consent_hash: &str, from: &str) -> Result<TransactionReceipt>;

    /// Anchor sealed medical proof for `case_id`, sent by `from`.
    async fn add_hospital_proof(
        &self,
        case_id: &str,
        content_id: &ContentId,
        from: &str,
    ) -> Result<TransactionReceipt>;

    /// Proofs anchored for `case_id`, oldest first. Unknown cases have none.
    async fn get_hospital_proofs(&self, case_id: &str) -> Result<Vec<HospitalProof>>;

    /// Every event, in emission order.
    async fn events(&self) -> Result<Vec<LedgerEvent>>;
}

/// Transaction hash over the block number, method and call data.
pub(crate) fn transaction_hash(block_number: u64, method: &str, call_data: &[&str]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(block_number.to_be_bytes());
    hasher.update(method.as_bytes());
    for field in call_data {
        hasher.update((field.len() as u64).to_be_bytes());
        hasher.update(field.as_bytes());
    }
    format!("0x{}", hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_hash_binds_fields() {
        let a = transaction_hash(1, "addRecord", &["42", "Knife"]);
        let b = transaction_hash(1, "addRecord", &["42K", "nife"]);
        let c = transaction_hash(2, "addRecord", &["42", "Knife"]);
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("0x"));
        assert_eq!(a.len(), 66);
    }

    #[test]
    fn test_receipt_record_id() {
        let receipt = TransactionReceipt {
            tx_hash: "0x00".into(),
            block_number: 1,
            events: vec![LedgerEvent {
                kind: LedgerEventKind::RecordAdded,
                record_id: Some(4),
                actor: "0x1".into(),
                block_number: 1,
                tx_hash: "0x00".into(),
                detail: None,
            }],
        };
        assert_eq!(receipt.record_id(), Some(4));
    }

    #[test]
    fn test_event_kind_names() {
        for kind in [
            LedgerEventKind::RecordAdded,
            LedgerEventKind::RecordAccessed,
            LedgerEventKind::ConsentLogged,
            LedgerEventKind::ProofAdded,
        ] {
            assert_eq!(LedgerEventKind::parse(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn test_is_sealed() {
        let mut record = Record {
            record_id: 0,
            case_id: "42".into(),
            exhibit_name: "Knife".into(),
            description: "Encrypted Evidence".into(),
            timestamp: "2025-01-01T00:00:00Z".into(),
            content_id: ContentId::new("bafk00"),
            added_by: "0x1".into(),
        };
        assert!(record.is_sealed("Encrypted Evidence"));

        record.description = "Bloodstained knife".into();
        assert!(!record.is_sealed("Encrypted Evidence"));
    }
}
