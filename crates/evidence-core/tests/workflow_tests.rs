//! End-to-end evidence workflows over persistent collaborators.

use evidence_core::config::VaultConfig;
use evidence_core::ledger::{Ledger, MemoryLedger, SqliteLedger};
use evidence_core::session::{Role, Session, SessionStore};
use evidence_core::store::{MemoryContentStore, SqliteContentStore};
use evidence_core::workflow::{EvidenceSubmission, EvidenceWorkflow, ViewRequest};
use evidence_core::Error;

const POLICE: &str = "0xA11CE0000000000000000000000000000000BEEF";
const HOSPITAL: &str = "0xB0B0000000000000000000000000000000000001";

fn submission(case_id: &str, exhibit: &str) -> EvidenceSubmission {
    EvidenceSubmission {
        case_id: case_id.into(),
        exhibit_name: exhibit.into(),
        description: format!("{} recovered at the scene", exhibit),
        file: None,
        timestamp: None,
    }
}

fn file_config(dir: &std::path::Path) -> VaultConfig {
    let mut config = VaultConfig::default();
    config.store.path = dir.join("blobs.db").to_string_lossy().into_owned();
    config.ledger.path = dir.join("ledger.db").to_string_lossy().into_owned();
    config.session.dir = dir.join("session");
    config
}

/// Submit as police, restart everything, then read back as another agency.
#[tokio::test]
async fn test_submit_restart_view() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = file_config(dir.path());
    let photo = vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0xff];

    let record_id = {
        let workflow = EvidenceWorkflow::new(
            &config,
            SqliteLedger::open(&config.ledger).expect("open ledger"),
            SqliteContentStore::open(&config.store).expect("open store"),
        );

        let sessions = SessionStore::from_config(&config.session);
        let session = Session::login(POLICE, Role::Police).expect("login");
        sessions.save(&session).await.expect("save session");

        let mut evidence = submission("CR-2025-17", "Knife");
        evidence.file = Some(photo.clone());
        let receipt = workflow.submit(&session, evidence).await.expect("submit");
        assert_eq!(receipt.receipt.block_number, 1);
        receipt.record_id
    };

    let workflow = EvidenceWorkflow::new(
        &config,
        SqliteLedger::open(&config.ledger).expect("reopen ledger"),
        SqliteContentStore::open(&config.store).expect("reopen store"),
    );

    let restored = SessionStore::from_config(&config.session)
        .load()
        .await
        .expect("load session")
        .expect("session present");
    assert_eq!(restored.role, Role::Police);

    let hospital = Session::login(HOSPITAL, Role::Hospital).expect("login");
    let viewed = workflow
        .view(&hospital, ViewRequest::sealed_by(record_id, POLICE.to_lowercase()))
        .await
        .expect("view");

    let metadata = viewed.metadata.expect("sealed metadata");
    assert_eq!(metadata.case_id, "CR-2025-17");
    assert_eq!(metadata.description, "Knife recovered at the scene");
    assert_eq!(viewed.file, Some(photo));
    assert!(viewed.access_logged);
    assert_eq!(viewed.record.description, config.sealed_description);
}

/// A hospital attaches proof to a police case; after a restart the court
/// reads it back and the police user is refused the upload.
#[tokio::test]
async fn test_hospital_proof_survives_restart() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = file_config(dir.path());
    let scan = b"%PDF-1.7 toxicology report".to_vec();

    {
        let workflow = EvidenceWorkflow::new(
            &config,
            SqliteLedger::open(&config.ledger).expect("open ledger"),
            SqliteContentStore::open(&config.store).expect("open store"),
        );
        let police = Session::login(POLICE, Role::Police).expect("login");
        workflow
            .submit(&police, submission("CR-2025-18", "Shirt"))
            .await
            .expect("submit");

        let err = workflow
            .upload_proof(&police, "CR-2025-18", scan.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AccessDenied(_)));

        let hospital = Session::login(HOSPITAL, Role::Hospital).expect("login");
        let receipt = workflow
            .upload_proof(&hospital, "CR-2025-18", scan.clone())
            .await
            .expect("upload proof");
        assert_eq!(receipt.receipt.block_number, 2);
    }

    let workflow = EvidenceWorkflow::new(
        &config,
        SqliteLedger::open(&config.ledger).expect("reopen ledger"),
        SqliteContentStore::open(&config.store).expect("reopen store"),
    );
    let court = Session::login(POLICE, Role::Court).expect("login");
    let proofs = workflow
        .view_proofs(&court, "CR-2025-18", None)
        .await
        .expect("view proofs");
    assert_eq!(proofs.len(), 1);
    assert_eq!(proofs[0].file, scan);
    assert_eq!(proofs[0].proof.added_by, HOSPITAL);
    assert_eq!(workflow.count().await.expect("count"), 1);

    let trail = workflow.audit_trail().await.expect("audit trail");
    assert_eq!(trail[0].label, "Proof Added");
    assert_eq!(trail[0].subject, "CR-2025-18");
}

#[tokio::test]
async fn test_audit_trail_over_sqlite() {
    let config = VaultConfig::in_memory();
    let workflow = EvidenceWorkflow::new(
        &config,
        SqliteLedger::open(&config.ledger).expect("open ledger"),
        SqliteContentStore::open(&config.store).expect("open store"),
    );
    let police = Session::login(POLICE, Role::Police).expect("login");

    workflow.submit(&police, submission("1", "Knife")).await.expect("submit");
    workflow.submit(&police, submission("2", "Glove")).await.expect("submit");
    workflow.view(&police, ViewRequest::new(1)).await.expect("view");
    workflow
        .share(&police, "2", "0xC0C0000000000000000000000000000000000002", "0xconsent")
        .await
        .expect("share");

    assert_eq!(workflow.count().await.expect("count"), 2);
    let records = workflow.list().await.expect("list");
    let cases: Vec<_> = records.iter().map(|r| r.case_id.as_str()).collect();
    assert_eq!(cases, vec!["1", "2"]);

    let trail = workflow.audit_trail().await.expect("audit trail");
    let summary: Vec<_> = trail
        .iter()
        .map(|e| (e.block_number, e.label.as_str(), e.subject.as_str()))
        .collect();
    assert_eq!(
        summary,
        vec![
            (4, "Consent Logged", "-"),
            (3, "Record Accessed", "1"),
            (2, "Record Added", "2"),
            (1, "Record Added", "1"),
        ]
    );
}

#[tokio::test]
async fn test_ledger_outage_is_retryable() {
    let ledger = MemoryLedger::new();
    let store = MemoryContentStore::default();
    let workflow =
        EvidenceWorkflow::new(&VaultConfig::in_memory(), ledger.clone(), store.clone());
    let police = Session::login(POLICE, Role::Police).expect("login");

    ledger.set_offline(true);
    let err = workflow.submit(&police, submission("9", "Phone")).await.unwrap_err();
    assert!(matches!(err, Error::LedgerUnavailable(_)));
    assert!(err.is_retryable());

    ledger.set_offline(false);
    let receipt = workflow.submit(&police, submission("9", "Phone")).await.expect("retry");
    assert_eq!(receipt.record_id, 0);
    assert_eq!(ledger.get_record_count().await.expect("count"), 1);
}

#[tokio::test]
async fn test_unknown_record() {
    let workflow = EvidenceWorkflow::new(
        &VaultConfig::in_memory(),
        MemoryLedger::new(),
        MemoryContentStore::default(),
    );
    let court = Session::login(POLICE, Role::Court).expect("login");
    let err = workflow.view(&court, ViewRequest::new(5)).await.unwrap_err();
    assert!(matches!(err, Error::RecordNotFound(5)));
    assert_eq!(err.user_message(), "No evidence found for this record.");
}
