//! User actions composed from the vault, the content store and the ledger.
//!
//! Submission order is fixed: seal, upload, then write the ledger record.
//! A failed upload therefore never leaves a ledger record pointing at
//! content that does not exist. Hospital proofs follow the same order.

use crate::config::VaultConfig;
use crate::error::{Error, Result};
use crate::ledger::{
    audit_trail, AuditEntry, HospitalProof, Ledger, NewRecord, Record, RecordId,
    TransactionReceipt,
};
use crate::logging::{Redacted, RedactedBytes, RedactedHex, RedactedIdentity};
use crate::session::Session;
use crate::store::{ContentId, ContentStore};
use crate::vault::{CleartextMetadata, EvidenceVault};
use chrono::{SecondsFormat, Utc};
use std::fmt;
use tracing::{info, warn};

/// Evidence entered by the user.
#[derive(Clone, Default)]
pub struct EvidenceSubmission {
    /// Case identifier.
    pub case_id: String,
    /// Exhibit name.
    pub exhibit_name: String,
    /// Free-text description; sealed, never written to the ledger.
    pub description: String,
    /// Optional attachment.
    pub file: Option<Vec<u8>>,
    /// RFC 3339 timestamp; the current time when absent.
    pub timestamp: Option<String>,
}

impl fmt::Debug for EvidenceSubmission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvidenceSubmission")
            .field("case_id", &self.case_id)
            .field("exhibit_name", &self.exhibit_name)
            .field("description", &Redacted(&self.description))
            .field("file", &self.file.as_deref().map(RedactedBytes))
            .field("timestamp", &self.timestamp)
            .finish()
    }
}

/// Outcome of a successful submission.
#[derive(Debug, Clone)]
pub struct SubmissionReceipt {
    /// Id assigned by the ledger.
    pub record_id: RecordId,
    /// Content id of the sealed metadata.
    pub metadata_content_id: ContentId,
    /// Content id of the sealed attachment, if one was submitted.
    pub file_content_id: Option<ContentId>,
    /// Ledger receipt of the `add_record` call.
    pub receipt: TransactionReceipt,
}

/// Which record to open, and whose key sealed it.
#[derive(Debug, Clone)]
pub struct ViewRequest {
    /// Ledger record id.
    pub record_id: RecordId,
    /// Identity that sealed the record. Defaults to the viewer's address.
    pub sealer_identity: Option<String>,
}

impl ViewRequest {
    /// Open `record_id` with the viewer's own key.
    pub fn new(record_id: RecordId) -> Self {
        Self {
            record_id,
            sealer_identity: None,
        }
    }

    /// Open `record_id` with the key of `identity`.
    pub fn sealed_by(record_id: RecordId, identity: impl Into<String>) -> Self {
        Self {
            record_id,
            sealer_identity: Some(identity.into()),
        }
    }
}

/// A record as shown to the viewer.
#[derive(Debug, Clone)]
pub struct ViewedEvidence {
    /// Ledger record.
    pub record: Record,
    /// Unsealed metadata; `None` for legacy plain records.
    pub metadata: Option<CleartextMetadata>,
    /// Unsealed attachment, if the metadata references one.
    pub file: Option<Vec<u8>>,
    /// Whether the access event reached the ledger.
    pub access_logged: bool,
}

/// Outcome of a successful proof upload.
#[derive(Debug, Clone)]
pub struct ProofReceipt {
    /// Content id of the sealed proof file.
    pub content_id: ContentId,
    /// Ledger receipt of the `add_hospital_proof` call.
    pub receipt: TransactionReceipt,
}

/// A hospital proof as shown to the viewer.
#[derive(Clone)]
pub struct ViewedProof {
    /// Ledger entry.
    pub proof: HospitalProof,
    /// Unsealed proof file.
    pub file: Vec<u8>,
}

impl fmt::Debug for ViewedProof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewedProof")
            .field("proof", &self.proof)
            .field("file", &RedactedBytes(&self.file))
            .finish()
    }
}

/// Orchestrates the submit, view and share actions for a session.
pub struct EvidenceWorkflow<L, S> {
    vault: EvidenceVault,
    ledger: L,
    store: S,
    sealed_description: String,
}

impl<L: Ledger, S: ContentStore> EvidenceWorkflow<L, S> {
    /// Create a workflow over `ledger` and `store`.
    pub fn new(config: &VaultConfig, ledger: L, store: S) -> Self {
        Self {
            vault: EvidenceVault::new(config),
            ledger,
            store,
            sealed_description: config.sealed_description.clone(),
        }
    }

    /// The ledger client.
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// The content store client.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The sealing engine.
    pub fn vault(&self) -> &EvidenceVault {
        &self.vault
    }

    /// Seal and pin a new piece of evidence, then anchor it on the ledger.
    pub async fn submit(
        &self,
        session: &Session,
        submission: EvidenceSubmission,
    ) -> Result<SubmissionReceipt> {
        if !session.role.can_submit_evidence() {
            return Err(Error::AccessDenied(format!(
                "{} may not submit evidence",
                session.role
            )));
        }

        let timestamp = submission
            .timestamp
            .unwrap_or_else(|| Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true));
        let mut metadata = CleartextMetadata::new(
            submission.case_id,
            submission.exhibit_name,
            submission.description,
            session.address.clone(),
            timestamp,
        );
        metadata.validate()?;

        let key = EvidenceVault::derive_key(&session.address)?;

        let file_content_id = match submission.file {
            Some(bytes) => {
                let sealed = self.vault.seal_file(&bytes, &key)?;
                Some(self.vault.upload_sealed(&sealed, &self.store).await?)
            }
            None => None,
        };
        metadata.file_content_id = file_content_id.clone();

        let sealed = self.vault.seal_metadata(&metadata, &key)?;
        let metadata_content_id = self.vault.upload_sealed(&sealed, &self.store).await?;

        let receipt = self
            .ledger
            .add_record(
                NewRecord {
                    case_id: metadata.case_id.clone(),
                    exhibit_name: metadata.exhibit_name.clone(),
                    description: self.sealed_description.clone(),
                    timestamp: metadata.timestamp.clone(),
                    content_id: metadata_content_id.clone(),
                },
                &session.address,
            )
            .await?;
        let record_id = receipt.record_id().ok_or_else(|| {
            Error::LedgerUnavailable("receipt carries no RecordAdded event".into())
        })?;

        info!(
            record_id,
            by = %RedactedIdentity(&session.address),
            content_id = %RedactedHex(metadata_content_id.as_str()),
            with_file = file_content_id.is_some(),
            "Evidence submitted"
        );

        Ok(SubmissionReceipt {
            record_id,
            metadata_content_id,
            file_content_id,
            receipt,
        })
    }

    /// Open a record, unsealing its metadata and attachment when sealed.
    ///
    /// The access is logged on the ledger. A failed access log is reported
    /// through [`ViewedEvidence::access_logged`] and never fails the view.
    pub async fn view(&self, session: &Session, request: ViewRequest) -> Result<ViewedEvidence> {
        if !session.role.can_view_evidence() {
            return Err(Error::AccessDenied(format!("{} may not view evidence", session.role)));
        }

        let record = self.ledger.get_record(request.record_id).await?;

        let (metadata, file) = if record.is_sealed(&self.sealed_description) {
            let identity = request.sealer_identity.as_deref().unwrap_or(&session.address);
            let key = EvidenceVault::derive_key(identity)?;

            let payload = self
                .vault
                .fetch_and_unseal(&record.content_id, &key, &self.store)
                .await?;
            let metadata = payload
                .as_metadata()
                .cloned()
                .ok_or_else(|| Error::MalformedPayload("expected metadata, found file".into()))?;

            let file = match &metadata.file_content_id {
                Some(id) => {
                    let payload = self.vault.fetch_and_unseal(id, &key, &self.store).await?;
                    let bytes = payload.as_file().map(<[u8]>::to_vec).ok_or_else(|| {
                        Error::MalformedPayload("expected file, found metadata".into())
                    })?;
                    Some(bytes)
                }
                None => None,
            };
            (Some(metadata), file)
        } else {
            (None, None)
        };

        let access_logged = match self
            .ledger
            .log_access(record.record_id, &session.address)
            .await
        {
            Ok(_) => true,
            Err(e) => {
                warn!(record_id = record.record_id, error = %e, "Failed to log access");
                false
            }
        };

        info!(
            record_id = record.record_id,
            by = %RedactedIdentity(&session.address),
            sealed = metadata.is_some(),
            access_logged,
            "Evidence viewed"
        );

        Ok(ViewedEvidence {
            record,
            metadata,
            file,
            access_logged,
        })
    }

    /// Every ledger record, without unsealing.
    pub async fn list(&self) -> Result<Vec<Record>> {
        self.ledger.get_all_records().await
    }

    /// Number of ledger records.
    pub async fn count(&self) -> Result<u64> {
        self.ledger.get_record_count().await
    }

    /// Newest-first audit trail of every ledger event.
    pub async fn audit_trail(&self) -> Result<Vec<AuditEntry>> {
        Ok(audit_trail(self.ledger.events().await?))
    }

    /// Record on the ledger that evidence for `case_id` was shared with
    /// `agency`, backed by `consent_hash`.
    pub async fn share(
        &self,
        session: &Session,
        case_id: &str,
        agency: &str,
        consent_hash: &str,
    ) -> Result<TransactionReceipt> {
        if !session.role.can_share_evidence() {
            return Err(Error::AccessDenied(format!("{} may not share evidence", session.role)));
        }
        let required = [
            ("caseId", case_id),
            ("agency", agency),
            ("consentHash", consent_hash),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(Error::InvalidInput(format!("{} is required", name)));
            }
        }

        let receipt = self.ledger.log_consent(consent_hash, &session.address).await?;
        info!(
            case_id,
            agency = %RedactedIdentity(agency),
            by = %RedactedIdentity(&session.address),
            block = receipt.block_number,
            "Evidence shared"
        );
        Ok(receipt)
    }

    /// Seal a medical proof file with the hospital's key, pin it, then
    /// anchor it against `case_id`.
    pub async fn upload_proof(
        &self,
        session: &Session,
        case_id: &str,
        file: Vec<u8>,
    ) -> Result<ProofReceipt> {
        if !session.role.can_upload_proof() {
            return Err(Error::AccessDenied(format!(
                "{} may not upload medical proof",
                session.role
            )));
        }
        if case_id.trim().is_empty() {
            return Err(Error::InvalidInput("caseId is required".into()));
        }
        if file.is_empty() {
            return Err(Error::InvalidInput("select a file first".into()));
        }

        let key = EvidenceVault::derive_key(&session.address)?;
        let sealed = self.vault.seal_file(&file, &key)?;
        let content_id = self.vault.upload_sealed(&sealed, &self.store).await?;

        let receipt = self
            .ledger
            .add_hospital_proof(case_id, &content_id, &session.address)
            .await?;

        info!(
            case_id,
            by = %RedactedIdentity(&session.address),
            content_id = %RedactedHex(content_id.as_str()),
            block = receipt.block_number,
            "Medical proof uploaded"
        );

        Ok(ProofReceipt {
            content_id,
            receipt,
        })
    }

    /// Unseal every proof anchored for `case_id`, oldest first.
    ///
    /// Each proof is opened with the key of `sealer_identity`, or of the
    /// hospital that uploaded it when `None`.
    pub async fn view_proofs(
        &self,
        session: &Session,
        case_id: &str,
        sealer_identity: Option<&str>,
    ) -> Result<Vec<ViewedProof>> {
        if !session.role.can_view_evidence() {
            return Err(Error::AccessDenied(format!(
                "{} may not view evidence",
                session.role
            )));
        }

        let proofs = self.ledger.get_hospital_proofs(case_id).await?;
        let mut viewed = Vec::with_capacity(proofs.len());
        for proof in proofs {
            let key = EvidenceVault::derive_key(sealer_identity.unwrap_or(&proof.added_by))?;
            let payload = self
                .vault
                .fetch_and_unseal(&proof.content_id, &key, &self.store)
                .await?;
            let file = payload.as_file().map(<[u8]>::to_vec).ok_or_else(|| {
                Error::MalformedPayload("expected file, found metadata".into())
            })?;
            viewed.push(ViewedProof { proof, file });
        }

        info!(
            case_id,
            by = %RedactedIdentity(&session.address),
            proofs = viewed.len(),
            "Medical proofs viewed"
        );
        Ok(viewed)
    }
}
