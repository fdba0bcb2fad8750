//! Human-readable audit trail built from ledger events.

use super::{LedgerEvent, LedgerEventKind};
use serde::{Deserialize, Serialize};

/// One line of the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    /// Display label of the event kind.
    pub label: String,
    /// Case id for additions and proofs, record index for accesses, `-` for
    /// consent.
    pub subject: String,
    /// Identity that caused the event.
    pub actor: String,
    /// Block the event was mined in.
    pub block_number: u64,
    /// Transaction hash.
    pub tx_hash: String,
}

impl LedgerEventKind {
    /// Label shown in the audit trail.
    pub fn label(self) -> &'static str {
        match self {
            Self::RecordAdded => "Record Added",
            Self::RecordAccessed => "Record Accessed",
            Self::ConsentLogged => "Consent Logged",
            Self::ProofAdded => "Proof Added",
        }
    }
}

impl From<LedgerEvent> for AuditEntry {
    fn from(event: LedgerEvent) -> Self {
        let subject = match event.kind {
            LedgerEventKind::RecordAdded | LedgerEventKind::ProofAdded => {
                event.detail.unwrap_or_else(|| "-".into())
            }
            LedgerEventKind::RecordAccessed => event
                .record_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "-".into()),
            LedgerEventKind::ConsentLogged => "-".into(),
        };
        Self {
            label: event.kind.label().to_string(),
            subject,
            actor: event.actor,
            block_number: event.block_number,
            tx_hash: event.tx_hash,
        }
    }
}

/// Newest-first audit trail over every event kind.
pub fn audit_trail(events: Vec<LedgerEvent>) -> Vec<AuditEntry> {
    let mut entries: Vec<AuditEntry> = events.into_iter().map(AuditEntry::from).collect();
    entries.sort_by(|a, b| b.block_number.cmp(&a.block_number));
    entries
}
