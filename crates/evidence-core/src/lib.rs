//! # Evidence Core
//!
//! Client-side encrypt-then-pin workflow for evidentiary records shared
//! between police, forensic and hospital users.
//!
//! Cleartext evidence (a metadata object and an optional binary file) is
//! sealed with a key derived from the author's wallet address, pinned to a
//! content-addressed store, and only the resulting content identifier is
//! anchored on an append-only ledger. Viewers re-derive the key, fetch the
//! ciphertext by identifier and unseal it locally.
//!
//! ## Security Model
//!
//! The session key is a SHA-256 hash of the lower-cased identity string.
//! It is reproducible across sessions without any key exchange, which also
//! means **confidentiality = secrecy of the identity string**. Anyone who
//! knows the address that sealed a payload can derive the key. The scheme
//! protects against casual browsing of the content store, not against an
//! adversary who knows the identity.
//!
//! What sealing does guarantee:
//!
//! - Integrity: payloads are sealed with ChaCha20-Poly1305, so a wrong key
//!   or a flipped byte fails with [`Error::DecryptionFailed`] instead of
//!   returning garbled cleartext
//! - Ordering: the ledger never references a content id that was not stored
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │        workflow  (session, roles)       │
//! ├─────────────────────────────────────────┤
//! │   vault    │    store    │   ledger     │
//! ├─────────────────────────────────────────┤
//! │        crypto        │     config       │
//! └─────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]
#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod config;
pub mod crypto;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod session;
pub mod store;
pub mod vault;
pub mod workflow;

pub use config::VaultConfig;
pub use error::{Error, Result};
pub use ledger::{HospitalProof, Ledger, Record, RecordId};
pub use session::{Role, Session};
pub use store::{ContentId, ContentStore};
pub use vault::{CleartextMetadata, EvidenceVault, Payload, SealedPayload};
pub use workflow::EvidenceWorkflow;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Version tag of the sealed payload format.
pub const SEAL_FORMAT_VERSION: &str = "evs1";

/// Description recorded on the ledger for records whose real description
/// lives inside the sealed metadata.
pub const SEALED_DESCRIPTION: &str = "Encrypted Evidence";
