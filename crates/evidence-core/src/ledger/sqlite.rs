//! SQLite-backed ledger for local deployments and tests.

use super::schema::{CREATE_SCHEMA, SCHEMA_VERSION};
use super::{
    transaction_hash, HospitalProof, Ledger, LedgerEvent, LedgerEventKind, NewRecord, Record,
    RecordId, TransactionReceipt,
};
use crate::config::LedgerConfig;
use crate::error::{Error, Result};
use crate::logging::RedactedIdentity;
use crate::store::ContentId;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Persistent append-only ledger. Clones share one connection.
#[derive(Clone)]
pub struct SqliteLedger {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteLedger {
    /// Open or create the ledger database described by `config`.
    pub fn open(config: &LedgerConfig) -> Result<Self> {
        let conn = if config.in_memory {
            Connection::open_in_memory()
        } else {
            if let Some(parent) = Path::new(&config.path).parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| Error::Storage(format!("failed to create directory: {}", e)))?;
            }
            Connection::open(&config.path)
        }
        .map_err(|e| Error::Storage(format!("failed to open ledger: {}", e)))?;

        conn.execute_batch(&CREATE_SCHEMA.replace('?', &SCHEMA_VERSION.to_string()))
            .map_err(|e| Error::Storage(format!("failed to create schema: {}", e)))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::LedgerUnavailable("ledger lock poisoned".into()))
    }
}

/// Append one block with one event inside `tx`.
fn mine(
    tx: &Transaction<'_>,
    method: &str,
    call_data: &[&str],
    kind: LedgerEventKind,
    record_id: Option<RecordId>,
    actor: &str,
    detail: Option<String>,
) -> Result<TransactionReceipt> {
    let last: i64 = tx
        .query_row("SELECT COALESCE(MAX(block_number), 0) FROM events", [], |row| {
            row.get(0)
        })
        .map_err(unavailable)?;
    let block_number = last as u64 + 1;
    let tx_hash = transaction_hash(block_number, method, call_data);

    tx.execute(
        r#"
        INSERT INTO events (block_number, kind, record_id, actor, tx_hash, detail, mined_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
        params![
            block_number as i64,
            kind.as_str(),
            record_id.map(|id| id as i64),
            actor,
            tx_hash,
            detail,
            chrono::Utc::now().timestamp(),
        ],
    )
    .map_err(unavailable)?;

    let event = LedgerEvent {
        kind,
        record_id,
        actor: actor.to_string(),
        block_number,
        tx_hash: tx_hash.clone(),
        detail,
    };
    Ok(TransactionReceipt {
        tx_hash,
        block_number,
        events: vec![event],
    })
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<Record> {
    let record_id: i64 = row.get(0)?;
    let content_id: String = row.get(5)?;
    Ok(Record {
        record_id: record_id as RecordId,
        case_id: row.get(1)?,
        exhibit_name: row.get(2)?,
        description: row.get(3)?,
        timestamp: row.get(4)?,
        content_id: ContentId::new(content_id),
        added_by: row.get(6)?,
    })
}

fn unavailable(e: rusqlite::Error) -> Error {
    Error::LedgerUnavailable(e.to_string())
}

fn proof_from_row(row: &Row<'_>) -> rusqlite::Result<HospitalProof> {
    let content_id: String = row.get(1)?;
    let block_number: i64 = row.get(3)?;
    Ok(HospitalProof {
        case_id: row.get(0)?,
        content_id: ContentId::new(content_id),
        added_by: row.get(2)?,
        block_number: block_number as u64,
        tx_hash: row.get(4)?,
    })
}

const SELECT_RECORD: &str = "SELECT record_id, case_id, exhibit_name, description, timestamp, \
                             content_id, added_by FROM records";

#[async_trait]
impl Ledger for SqliteLedger {
    async fn add_record(&self, record: NewRecord, from: &str) -> Result<TransactionReceipt> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(unavailable)?;

        let count: i64 = tx
            .query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))
            .map_err(unavailable)?;
        let record_id = count as RecordId;

        tx.execute(
            r#"
            INSERT INTO records
                (record_id, case_id, exhibit_name, description, timestamp, content_id, added_by)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                count,
                record.case_id,
                record.exhibit_name,
                record.description,
                record.timestamp,
                record.content_id.as_str(),
                from,
            ],
        )
        .map_err(unavailable)?;

        let receipt = mine(
            &tx,
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
        )?;
        tx.commit().map_err(unavailable)?;

        debug!(
            record_id,
            by = %RedactedIdentity(from),
            block = receipt.block_number,
            "Record added"
        );
        Ok(receipt)
    }

    async fn get_record(&self, record_id: RecordId) -> Result<Record> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("{} WHERE record_id = ?", SELECT_RECORD),
            params![record_id as i64],
            record_from_row,
        )
        .optional()
        .map_err(unavailable)?
        .ok_or(Error::RecordNotFound(record_id))
    }

    async fn get_all_records(&self) -> Result<Vec<Record>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!("{} ORDER BY record_id ASC", SELECT_RECORD))
            .map_err(unavailable)?;
        let rows = stmt.query_map([], record_from_row).map_err(unavailable)?;
        let records = rows.collect::<rusqlite::Result<Vec<_>>>().map_err(unavailable)?;
        Ok(records)
    }

    async fn get_record_count(&self) -> Result<u64> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))
            .map_err(unavailable)?;
        Ok(count as u64)
    }

    async fn log_access(&self, record_id: RecordId, accessor: &str) -> Result<TransactionReceipt> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(unavailable)?;

        let exists: Option<i64> = tx
            .query_row(
                "SELECT record_id FROM records WHERE record_id = ?",
                params![record_id as i64],
                |row| row.get(0),
            )
            .optional()
            .map_err(unavailable)?;
        if exists.is_none() {
            return Err(Error::RecordNotFound(record_id));
        }

        let id_text = record_id.to_string();
        let receipt = mine(
            &tx,
            "logAccess",
            &[id_text.as_str(), accessor],
            LedgerEventKind::RecordAccessed,
            Some(record_id),
            accessor,
            None,
        )?;
        tx.commit().map_err(unavailable)?;
        Ok(receipt)
    }

    async fn log_consent(&self, consent_hash: &str, from: &str) -> Result<TransactionReceipt> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(unavailable)?;
        let receipt = mine(
            &tx,
            "logConsent",
            &[consent_hash],
            LedgerEventKind::ConsentLogged,
            None,
            from,
            Some(consent_hash.to_string()),
        )?;
        tx.commit().map_err(unavailable)?;
        Ok(receipt)
    }

    async fn add_hospital_proof(
        &self,
        case_id: &str,
        content_id: &ContentId,
        from: &str,
    ) -> Result<TransactionReceipt> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(unavailable)?;
        let receipt = mine(
            &tx,
            "addHospitalProof",
            &[case_id, content_id.as_str()],
            LedgerEventKind::ProofAdded,
            None,
            from,
            Some(case_id.to_string()),
        )?;
        tx.execute(
            r#"
            INSERT INTO hospital_proofs (block_number, case_id, content_id, added_by, tx_hash)
            VALUES (?, ?, ?, ?, ?)
            "#,
            params![
                receipt.block_number as i64,
                case_id,
                content_id.as_str(),
                from,
                receipt.tx_hash,
            ],
        )
        .map_err(unavailable)?;
        tx.commit().map_err(unavailable)?;

        debug!(case_id, by = %RedactedIdentity(from), block = receipt.block_number, "Proof added");
        Ok(receipt)
    }

    async fn get_hospital_proofs(&self, case_id: &str) -> Result<Vec<HospitalProof>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT case_id, content_id, added_by, block_number, tx_hash \
                 FROM hospital_proofs WHERE case_id = ? ORDER BY block_number ASC",
            )
            .map_err(unavailable)?;
        let rows = stmt
            .query_map(params![case_id], proof_from_row)
            .map_err(unavailable)?;
        let proofs = rows.collect::<rusqlite::Result<Vec<_>>>().map_err(unavailable)?;
        Ok(proofs)
    }

    async fn events(&self) -> Result<Vec<LedgerEvent>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT kind, record_id, actor, block_number, tx_hash, detail \
                 FROM events ORDER BY block_number ASC",
            )
            .map_err(unavailable)?;

        let rows = stmt
            .query_map([], |row| {
                let kind: String = row.get(0)?;
                let record_id: Option<i64> = row.get(1)?;
                let actor: String = row.get(2)?;
                let block_number: i64 = row.get(3)?;
                let tx_hash: String = row.get(4)?;
                let detail: Option<String> = row.get(5)?;
                Ok((kind, record_id, actor, block_number, tx_hash, detail))
            })
            .map_err(unavailable)?;

        let mut events = Vec::new();
        for row in rows {
            let (kind, record_id, actor, block_number, tx_hash, detail) =
                row.map_err(unavailable)?;
            let kind = LedgerEventKind::parse(&kind)
                .ok_or_else(|| Error::Storage(format!("unknown event kind: {}", kind)))?;
            events.push(LedgerEvent {
                kind,
                record_id: record_id.map(|id| id as RecordId),
                actor,
                block_number: block_number as u64,
                tx_hash,
                detail,
            });
        }
        Ok(events)
    }
}
