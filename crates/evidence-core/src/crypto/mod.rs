//! Cryptographic primitives for sealing evidence.
//!
//! - **SHA-256**: identity → session key, integrity fingerprints
//! - **HKDF-SHA256**: per-payload subkeys from the session key and a salt
//! - **ChaCha20-Poly1305**: authenticated encryption of payloads
//!
//! ## Known weakness
//!
//! [`derive_key`] is a bare hash of a public wallet address. There is no key
//! exchange and no secret input, so confidentiality rests entirely on the
//! secrecy of the identity string. Sessions can re-derive the key at any
//! time, which the sealing workflow depends on.

mod aead;

pub use aead::{
    decrypt, decrypt_with_prepended_nonce, encrypt, encrypt_with_random_nonce, Nonce, NONCE_SIZE,
    TAG_SIZE,
};

use crate::error::{Error, Result};
use hkdf::Hkdf;
use sha2::{Digest, Sha256};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Key size for ChaCha20-Poly1305 and for session keys.
pub const KEY_SIZE: usize = 32;

/// Salt size for per-payload subkey derivation.
pub const SALT_SIZE: usize = 16;

/// HKDF info string for payload subkeys.
const SEAL_KEY_INFO: &[u8] = b"evidence-core seal v1";

/// Symmetric key derived from an identity.
///
/// Zeroized on drop; never printed.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SessionKey([u8; KEY_SIZE]);

impl SessionKey {
    /// Create from raw bytes.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    ///
    /// # Security
    /// Handle with care - this exposes key material.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    /// Lowercase hex rendering, identical to the session key string the
    /// web dashboard derives for the same identity.
    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.0))
    }

    /// Derive the subkey used for one sealed payload.
    pub(crate) fn payload_key(&self, salt: &[u8; SALT_SIZE]) -> Result<Zeroizing<[u8; KEY_SIZE]>> {
        let okm = hkdf_derive(Some(salt), &self.0, SEAL_KEY_INFO, KEY_SIZE)?;
        let mut key = Zeroizing::new([0u8; KEY_SIZE]);
        key.copy_from_slice(&okm);
        Ok(key)
    }
}

impl PartialEq for SessionKey {
    fn eq(&self, other: &Self) -> bool {
        constant_time_eq(&self.0, &other.0)
    }
}

impl Eq for SessionKey {}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionKey([REDACTED])")
    }
}

/// Derive the session key for an identity.
///
/// Pure and deterministic: the identity is lower-cased and hashed with
/// SHA-256. Case differences fold to the same key. Fails with
/// [`Error::InvalidIdentity`] on an empty or whitespace-only identity.
pub fn derive_key(identity: &str) -> Result<SessionKey> {
    if identity.trim().is_empty() {
        return Err(Error::InvalidIdentity);
    }
    let normalized = Zeroizing::new(identity.to_lowercase());
    let digest = Sha256::digest(normalized.as_bytes());

    let mut key = [0u8; KEY_SIZE];
    key.copy_from_slice(&digest);
    Ok(SessionKey(key))
}

/// Derive keys using HKDF-SHA256.
pub fn hkdf_derive(
    salt: Option<&[u8]>,
    input_key_material: &[u8],
    info: &[u8],
    output_length: usize,
) -> Result<Zeroizing<Vec<u8>>> {
    let hkdf = Hkdf::<Sha256>::new(salt, input_key_material);
    let mut output = Zeroizing::new(vec![0u8; output_length]);
    hkdf.expand(info, &mut output)
        .map_err(|_| Error::InvalidInput("HKDF output length too large".into()))?;
    Ok(output)
}

/// Lowercase hex SHA-256 of arbitrary data.
pub fn data_hash(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Generate cryptographically secure random bytes.
pub fn random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    rand::RngCore::fill_bytes(&mut rand::rngs::OsRng, &mut bytes);
    bytes
}

/// Constant-time comparison of byte slices.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
