//! In-memory ledger.

use super::{
    transaction_hash, HospitalProof, Ledger, LedgerEvent, LedgerEventKind, NewRecord, Record,
    RecordId, TransactionReceipt,
};
use crate::error::{Error, Result};
use crate::logging::RedactedIdentity;
use crate::store::ContentId;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Default)]
struct LedgerState {
    records: Vec<Record>,
    events: Vec<LedgerEvent>,
    proofs: Vec<HospitalProof>,
    block_number: u64,
}

impl LedgerState {
    /// Mine one block holding a single transaction.
    fn mine(
        &mut self,
        method: &str,
        call_data: &[&str],
        kind: LedgerEventKind,
        record_id: Option<RecordId>,
        actor: &str,
        detail: Option<String>,
    ) -> TransactionReceipt {
        self.block_number += 1;
        let tx_hash = transaction_hash(self.block_number, method, call_data);
        let event = LedgerEvent {
            kind,
            record_id,
            actor: actor.to_string(),
            block_number: self.block_number,
            tx_hash: tx_hash.clone(),
            detail,
        };
        self.events.push(event.clone());
        TransactionReceipt {
            tx_hash,
            block_number: self.block_number,
            events: vec![event],
        }
    }
}

/// Ledger held in process memory. Clones share the same chain.
#[derive(Clone, Default)]
pub struct MemoryLedger {
    state: Arc<RwLock<LedgerState>>,
    offline: Arc<AtomicBool>,
}

impl MemoryLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the node being unreachable; every call then fails with
    /// [`Error::LedgerUnavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(Error::LedgerUnavailable("node unreachable".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn add_record(&self, record: NewRecord, from: &str) -> Result<TransactionReceipt> {
        self.check_online()?;
        let mut state = self.state.write().await;

        let record_id = state.records.len() as RecordId;
        let receipt = state.mine(
            "addRecord",
            &[
                record.case_id.as_str(),
                record.exhibit_name.as_str(),
                record.description.as_str(),
                record.timestamp.as_str(),
                record.content_id.as_str(),
            ],
            LedgerEventKind::RecordAdded,
            Some(record_id),
            from,
            Some(record.case_id.clone()),
        );
        state.records.push(Record {
            record_id,
            case_id: record.case_id,
            exhibit_name: record.exhibit_name,
            description: record.description,
            timestamp: record.timestamp,
            content_id: record.content_id,
            added_by: from.to_string(),
        });

        debug!(
            record_id,
            by = %RedactedIdentity(from),
            block = receipt.block_number,
            "Record added"
        );
        Ok(receipt)
    }

    async fn get_record(&self, record_id: RecordId) -> Result<Record> {
        self.check_online()?;
        self.state
            .read()
            .await
            .records
            .get(record_id as usize)
            .cloned()
            .ok_or(Error::RecordNotFound(record_id))
    }

    async fn get_all_records(&self) -> Result<Vec<Record>> {
        self.check_online()?;
        Ok(self.state.read().await.records.clone())
    }

    async fn get_record_count(&self) -> Result<u64> {
        self.check_online()?;
        Ok(self.state.read().await.records.len() as u64)
    }

    async fn log_access(&self, record_id: RecordId, accessor: &str) -> Result<TransactionReceipt> {
        self.check_online()?;
        let mut state = self.state.write().await;
        if record_id as usize >= state.records.len() {
            return Err(Error::RecordNotFound(record_id));
        }
        let id_text = record_id.to_string();
        Ok(state.mine(
            "logAccess",
            &[id_text.as_str(), accessor],
            LedgerEventKind::RecordAccessed,
            Some(record_id),
            accessor,
            None,
        ))
    }

    async fn log_consent(&self, consent_hash: &str, from: &str) -> Result<TransactionReceipt> {
        self.check_online()?;
        let mut state = self.state.write().await;
        Ok(state.mine(
            "logConsent",
            &[consent_hash],
            LedgerEventKind::ConsentLogged,
            None,
            from,
            Some(consent_hash.to_string()),
        ))
    }

    async fn add_hospital_proof(
        &self,
        case_id: &str,
        content_id: &ContentId,
        from: &str,
    ) -> Result<TransactionReceipt> {
        self.check_online()?;
        let mut state = self.state.write().await;
        let receipt = state.mine(
            "addHospitalProof",
            &[case_id, content_id.as_str()],
            LedgerEventKind::ProofAdded,
            None,
            from,
            Some(case_id.to_string()),
        );
        state.proofs.push(HospitalProof {
            case_id: case_id.to_string(),
            content_id: content_id.clone(),
            added_by: from.to_string(),
            block_number: receipt.block_number,
            tx_hash: receipt.tx_hash.clone(),
        });

        debug!(case_id, by = %RedactedIdentity(from), block = receipt.block_number, "Proof added");
        Ok(receipt)
    }

    async fn get_hospital_proofs(&self, case_id: &str) -> Result<Vec<HospitalProof>> {
        self.check_online()?;
        Ok(self
            .state
            .read()
            .await
            .proofs
            .iter()
            .filter(|p| p.case_id == case_id)
            .cloned()
            .collect())
    }

    async fn events(&self) -> Result<Vec<LedgerEvent>> {
        self.check_online()?;
        Ok(self.state.read().await.events.clone())
    }
}
