//! The evidence vault: seal, unseal and the two thin store orchestrations.
//!
//! Sealing is a pure transform. Network and storage calls live in
//! [`EvidenceVault::upload_sealed`] and [`EvidenceVault::fetch_and_unseal`],
//! which take the store as an explicit parameter. The vault holds no
//! session, identity or key between calls.
//!
//! ```ignore
//! let vault = EvidenceVault::default();
//! let key = EvidenceVault::derive_key("0xCAFEBABE")?;
//! let sealed = vault.seal(&Payload::Metadata(metadata), &key)?;
//! let id = vault.upload_sealed(&sealed, &store).await?;
//! let payload = vault.fetch_and_unseal(&id, &key, &store).await?;
//! ```

mod framing;
mod payload;

pub use framing::SealedPayload;
pub use payload::{CleartextMetadata, Payload, PayloadKind};

use crate::config::{VaultConfig, DEFAULT_MAX_PAYLOAD_BYTES};
use crate::crypto::{self, random_bytes, SessionKey, SALT_SIZE};
use crate::error::{Error, Result};
use crate::logging::{RedactedBytes, RedactedHex};
use crate::store::{read_all, ContentId, ContentStore};
use framing::{associated_data, SealedParts};
use tracing::debug;
use zeroize::Zeroizing;

/// Stateless sealing engine.
#[derive(Debug, Clone)]
pub struct EvidenceVault {
    max_payload_bytes: usize,
}

impl Default for EvidenceVault {
    fn default() -> Self {
        Self {
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }
}

impl EvidenceVault {
    /// Create a vault with the limits from `config`.
    pub fn new(config: &VaultConfig) -> Self {
        Self {
            max_payload_bytes: config.max_payload_bytes,
        }
    }

    /// Derive the session key for `identity`. See [`crypto::derive_key`].
    pub fn derive_key(identity: &str) -> Result<SessionKey> {
        crypto::derive_key(identity)
    }

    /// Seal a payload under `key`.
    ///
    /// Metadata is encoded as canonical JSON first; file bytes are sealed
    /// as they are. A fresh salt and nonce are drawn for every call, so two
    /// seals of the same payload differ.
    pub fn seal(&self, payload: &Payload, key: &SessionKey) -> Result<SealedPayload> {
        let kind = payload.kind();
        let cleartext: Zeroizing<Vec<u8>> = match payload {
            Payload::Metadata(metadata) => Zeroizing::new(metadata.to_canonical_json()?),
            Payload::File(bytes) => Zeroizing::new(bytes.clone()),
        };

        if cleartext.len() > self.max_payload_bytes {
            return Err(Error::InvalidInput(format!(
                "payload of {} bytes exceeds limit of {}",
                cleartext.len(),
                self.max_payload_bytes
            )));
        }

        let salt: [u8; SALT_SIZE] = random_bytes();
        let payload_key = key.payload_key(&salt)?;
        let body =
            crypto::encrypt_with_random_nonce(&payload_key, &cleartext, &associated_data(kind))?;

        let sealed = SealedPayload::encode(&SealedParts { kind, salt, body });
        debug!(
            kind = ?kind,
            cleartext = %RedactedBytes(&cleartext),
            fingerprint = %RedactedHex(&sealed.fingerprint()),
            "Sealed payload"
        );
        Ok(sealed)
    }

    /// Unseal a payload with `key`.
    ///
    /// # Errors
    ///
    /// - [`Error::MalformedPayload`] if the string does not split into
    ///   version, kind, salt and cipher sections, or decrypted metadata is
    ///   not valid canonical JSON
    /// - [`Error::DecryptionFailed`] if the key is wrong or any sealed byte
    ///   was altered
    pub fn unseal(&self, sealed: &SealedPayload, key: &SessionKey) -> Result<Payload> {
        let parts = sealed.decode()?;
        let payload_key = key.payload_key(&parts.salt)?;
        let cleartext = crypto::decrypt_with_prepended_nonce(
            &payload_key,
            &parts.body,
            &associated_data(parts.kind),
        )?;

        match parts.kind {
            PayloadKind::Metadata => Ok(Payload::Metadata(CleartextMetadata::from_canonical_json(
                &cleartext,
            )?)),
            PayloadKind::File => Ok(Payload::File(cleartext.to_vec())),
        }
    }

    /// Seal metadata.
    pub fn seal_metadata(
        &self,
        metadata: &CleartextMetadata,
        key: &SessionKey,
    ) -> Result<SealedPayload> {
        self.seal(&Payload::Metadata(metadata.clone()), key)
    }

    /// Seal a file.
    pub fn seal_file(&self, bytes: &[u8], key: &SessionKey) -> Result<SealedPayload> {
        self.seal(&Payload::File(bytes.to_vec()), key)
    }

    /// Unseal a payload that must be metadata.
    pub fn unseal_metadata(
        &self,
        sealed: &SealedPayload,
        key: &SessionKey,
    ) -> Result<CleartextMetadata> {
        match self.unseal(sealed, key)? {
            Payload::Metadata(metadata) => Ok(metadata),
            Payload::File(_) => {
                Err(Error::MalformedPayload("expected metadata, found file".into()))
            }
        }
    }

    /// Unseal a payload that must be a file.
    pub fn unseal_file(&self, sealed: &SealedPayload, key: &SessionKey) -> Result<Vec<u8>> {
        match self.unseal(sealed, key)? {
            Payload::File(bytes) => Ok(bytes),
            Payload::Metadata(_) => {
                Err(Error::MalformedPayload("expected file, found metadata".into()))
            }
        }
    }

    /// Store a sealed payload and return its content id.
    ///
    /// Store failures surface as [`Error::StoreUnavailable`]; no retry.
    pub async fn upload_sealed<S>(&self, sealed: &SealedPayload, store: &S) -> Result<ContentId>
    where
        S: ContentStore + ?Sized,
    {
        let id = store
            .put(sealed.as_str().as_bytes().to_vec())
            .await
            .map_err(into_store_error)?;
        debug!(content_id = %RedactedHex(id.as_str()), "Uploaded sealed payload");
        Ok(id)
    }

    /// Fetch a sealed payload by id and unseal it.
    ///
    /// Store failures surface as [`Error::StoreUnavailable`]. Key or
    /// integrity failures, including stored bytes that no longer match
    /// their id, surface as [`Error::DecryptionFailed`] or
    /// [`Error::MalformedPayload`], so the caller can tell "network error"
    /// from "wrong key / corrupted evidence".
    pub async fn fetch_and_unseal<S>(
        &self,
        id: &ContentId,
        key: &SessionKey,
        store: &S,
    ) -> Result<Payload>
    where
        S: ContentStore + ?Sized,
    {
        let bytes = read_all(store, id).await.map_err(into_store_error)?;
        debug!(
            content_id = %RedactedHex(id.as_str()),
            size = bytes.len(),
            "Fetched sealed payload"
        );
        let sealed = SealedPayload::from_bytes(bytes)?;
        self.unseal(&sealed, key)
    }
}

/// Integrity failures keep their class so they are never retried.
fn into_store_error(e: Error) -> Error {
    match e {
        Error::StoreUnavailable(_) | Error::MalformedPayload(_) => e,
        other => Error::StoreUnavailable(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryContentStore;

    fn knife() -> CleartextMetadata {
        CleartextMetadata::new(
            "42",
            "Knife",
            "Found at scene",
            "0xCAFEBABE",
            "2025-01-01T00:00:00Z",
        )
    }

    #[test]
    fn test_metadata_round_trip() {
        let vault = EvidenceVault::default();
        let key = EvidenceVault::derive_key("0xCAFEBABE").expect("derive");

        let sealed = vault.seal_metadata(&knife(), &key).expect("seal");
        assert_eq!(sealed.kind(), Some(PayloadKind::Metadata));
        assert_eq!(vault.unseal_metadata(&sealed, &key).expect("unseal"), knife());
    }

    #[test]
    fn test_seal_is_randomized() {
        let vault = EvidenceVault::default();
        let key = EvidenceVault::derive_key("0xCAFEBABE").expect("derive");
        let a = vault.seal_metadata(&knife(), &key).expect("seal");
        let b = vault.seal_metadata(&knife(), &key).expect("seal");
        assert_ne!(a, b);
    }

    #[test]
    fn test_sealed_text_hides_cleartext() {
        let vault = EvidenceVault::default();
        let key = EvidenceVault::derive_key("0xCAFEBABE").expect("derive");
        let sealed = vault.seal_metadata(&knife(), &key).expect("seal");
        assert!(!sealed.as_str().contains("Knife"));
        assert!(!sealed.as_str().contains("Found at scene"));
    }

    #[test]
    fn test_key_mismatch() {
        let vault = EvidenceVault::default();
        let sealed = vault
            .seal_metadata(&knife(), &EvidenceVault::derive_key("0xAA").expect("derive"))
            .expect("seal");
        let err = vault
            .unseal(&sealed, &EvidenceVault::derive_key("0xBB").expect("derive"))
            .unwrap_err();
        assert!(matches!(err, Error::DecryptionFailed));
    }

    #[test]
    fn test_case_folded_identity_unseals() {
        let vault = EvidenceVault::default();
        let sealed = vault
            .seal_file(b"photo", &EvidenceVault::derive_key("0xABCDEF").expect("derive"))
            .expect("seal");
        let bytes = vault
            .unseal_file(&sealed, &EvidenceVault::derive_key("0xabcdef").expect("derive"))
            .expect("unseal");
        assert_eq!(bytes, b"photo");
    }

    #[test]
    fn test_binary_and_empty_files() {
        let vault = EvidenceVault::default();
        let key = EvidenceVault::derive_key("0xCAFEBABE").expect("derive");
        for data in [Vec::new(), vec![0xff, 0x00, 0xfe, 0x80], (0..=255u8).collect()] {
            let sealed = vault.seal_file(&data, &key).expect("seal");
            assert_eq!(vault.unseal_file(&sealed, &key).expect("unseal"), data);
        }
    }

    #[test]
    fn test_wrong_kind_helper() {
        let vault = EvidenceVault::default();
        let key = EvidenceVault::derive_key("0xCAFEBABE").expect("derive");
        let sealed = vault.seal_file(b"bytes", &key).expect("seal");
        assert!(matches!(
            vault.unseal_metadata(&sealed, &key),
            Err(Error::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_swapping_kind_tag_fails_authentication() {
        let vault = EvidenceVault::default();
        let key = EvidenceVault::derive_key("0xCAFEBABE").expect("derive");
        let sealed = vault.seal_metadata(&knife(), &key).expect("seal");
        let swapped =
            SealedPayload::from_encoded(sealed.as_str().replacen("evs1$m$", "evs1$f$", 1));
        assert!(matches!(vault.unseal(&swapped, &key), Err(Error::DecryptionFailed)));
    }

    #[test]
    fn test_not_a_cipher() {
        let vault = EvidenceVault::default();
        let key = EvidenceVault::derive_key("0xCAFEBABE").expect("derive");
        let err = vault
            .unseal(&SealedPayload::from_encoded("not-a-cipher"), &key)
            .unwrap_err();
        assert!(matches!(err, Error::MalformedPayload(_)));
    }

    #[test]
    fn test_payload_limit() {
        let mut config = VaultConfig::in_memory();
        config.max_payload_bytes = 8;
        let vault = EvidenceVault::new(&config);
        let key = EvidenceVault::derive_key("0xCAFEBABE").expect("derive");
        assert!(matches!(
            vault.seal_file(&[0u8; 9], &key),
            Err(Error::InvalidInput(_))
        ));
        assert!(vault.seal_file(&[0u8; 8], &key).is_ok());
    }

    #[tokio::test]
    async fn test_upload_and_fetch() {
        let vault = EvidenceVault::default();
        let store = MemoryContentStore::default();
        let key = EvidenceVault::derive_key("0xCAFEBABE").expect("derive");

        let sealed = vault.seal_metadata(&knife(), &key).expect("seal");
        let id = vault.upload_sealed(&sealed, &store).await.expect("upload");
        let payload = vault.fetch_and_unseal(&id, &key, &store).await.expect("fetch");
        assert_eq!(payload.as_metadata(), Some(&knife()));
    }

    #[tokio::test]
    async fn test_fetch_unknown_id_is_store_error() {
        let vault = EvidenceVault::default();
        let store = MemoryContentStore::default();
        let key = EvidenceVault::derive_key("0xCAFEBABE").expect("derive");

        let err = vault
            .fetch_and_unseal(&ContentId::new("bafkmissing"), &key, &store)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::StoreUnavailable(_)));
    }
}
