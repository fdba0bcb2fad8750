//! Ledger database schema.

/// Schema version for migrations.
pub const SCHEMA_VERSION: u32 = 2;

/// SQL to create the ledger schema. `?` is replaced by [`SCHEMA_VERSION`].
pub const CREATE_SCHEMA: &str = r#"
-- Evidence records (append-only; record_id is the 0-based position)
CREATE TABLE IF NOT EXISTS records (
    record_id INTEGER PRIMARY KEY,
    case_id TEXT NOT NULL,
    exhibit_name TEXT NOT NULL,
    description TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    content_id TEXT NOT NULL,
    added_by TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_records_case ON records(case_id);

-- One row per mined block; every write is its own block
CREATE TABLE IF NOT EXISTS events (
    block_number INTEGER PRIMARY KEY,
    kind TEXT NOT NULL,
    record_id INTEGER,
    actor TEXT NOT NULL,
    tx_hash TEXT NOT NULL UNIQUE,
    detail TEXT,
    mined_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_events_record ON events(record_id);

-- Hospital medical proofs; block_number is the block that anchored them
CREATE TABLE IF NOT EXISTS hospital_proofs (
    block_number INTEGER PRIMARY KEY,
    case_id TEXT NOT NULL,
    content_id TEXT NOT NULL,
    added_by TEXT NOT NULL,
    tx_hash TEXT NOT NULL UNIQUE
);

CREATE INDEX IF NOT EXISTS idx_hospital_proofs_case ON hospital_proofs(case_id);

-- Guard against edits: the ledger never updates or deletes
CREATE TRIGGER IF NOT EXISTS records_no_update BEFORE UPDATE ON records
BEGIN SELECT RAISE(ABORT, 'records are append-only'); END;
CREATE TRIGGER IF NOT EXISTS records_no_delete BEFORE DELETE ON records
BEGIN SELECT RAISE(ABORT, 'records are append-only'); END;
CREATE TRIGGER IF NOT EXISTS events_no_update BEFORE UPDATE ON events
BEGIN SELECT RAISE(ABORT, 'events are append-only'); END;
CREATE TRIGGER IF NOT EXISTS events_no_delete BEFORE DELETE ON events
BEGIN SELECT RAISE(ABORT, 'events are append-only'); END;
CREATE TRIGGER IF NOT EXISTS hospital_proofs_no_update BEFORE UPDATE ON hospital_proofs
BEGIN SELECT RAISE(ABORT, 'hospital proofs are append-only'); END;
CREATE TRIGGER IF NOT EXISTS hospital_proofs_no_delete BEFORE DELETE ON hospital_proofs
BEGIN SELECT RAISE(ABORT, 'hospital proofs are append-only'); END;

PRAGMA user_version = ?;
"#;
