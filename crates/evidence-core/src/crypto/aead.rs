//! Authenticated encryption using ChaCha20-Poly1305.
//!
//! The Poly1305 tag is what lets `unseal` tell a wrong key or a tampered
//! payload apart from valid cleartext. Associated data binds the payload
//! kind and format version to the ciphertext.

use super::KEY_SIZE;
use crate::error::{Error, Result};
use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Key, Nonce as ChaNonce,
};
use rand::RngCore;
use zeroize::Zeroizing;

/// Size of nonce in bytes (96 bits).
pub const NONCE_SIZE: usize = 12;

/// Size of authentication tag in bytes (128 bits).
pub const TAG_SIZE: usize = 16;

/// A nonce for AEAD encryption.
///
/// Every payload is sealed under a fresh HKDF subkey, so a random nonce
/// never repeats under the same key in practice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Nonce([u8; NONCE_SIZE]);

impl Nonce {
    /// Create a new random nonce.
    pub fn random() -> Self {
        let mut bytes = [0u8; NONCE_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; NONCE_SIZE]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; NONCE_SIZE] {
        &self.0
    }
}

/// Encrypt `plaintext`, returning `ciphertext || tag`.
pub fn encrypt(
    key: &[u8; KEY_SIZE],
    nonce: &Nonce,
    plaintext: &[u8],
    associated_data: &[u8],
) -> Result<Vec<u8>> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));

    cipher
        .encrypt(
            ChaNonce::from_slice(nonce.as_bytes()),
            Payload {
                msg: plaintext,
                aad: associated_data,
            },
        )
        .map_err(|_| Error::InvalidInput("payload too large to encrypt".into()))
}

/// Decrypt `ciphertext || tag`.
///
/// Any authentication failure is reported as [`Error::DecryptionFailed`]
/// with no further detail.
pub fn decrypt(
    key: &[u8; KEY_SIZE],
    nonce: &Nonce,
    ciphertext: &[u8],
    associated_data: &[u8],
) -> Result<Zeroizing<Vec<u8>>> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));

    let plaintext = cipher
        .decrypt(
            ChaNonce::from_slice(nonce.as_bytes()),
            Payload {
                msg: ciphertext,
                aad: associated_data,
            },
        )
        .map_err(|_| Error::DecryptionFailed)?;

    Ok(Zeroizing::new(plaintext))
}

/// Encrypt with a random nonce, prepending it to output.
///
/// Output format: `nonce (12 bytes) || ciphertext || tag (16 bytes)`
pub fn encrypt_with_random_nonce(
    key: &[u8; KEY_SIZE],
    plaintext: &[u8],
    associated_data: &[u8],
) -> Result<Vec<u8>> {
    let nonce = Nonce::random();
    let ciphertext = encrypt(key, &nonce, plaintext, associated_data)?;

    let mut output = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    output.extend_from_slice(nonce.as_bytes());
    output.extend_from_slice(&ciphertext);
    Ok(output)
}

/// Decrypt data produced by [`encrypt_with_random_nonce`].
///
/// Input shorter than nonce + tag cannot be split into cipher components
/// and fails with [`Error::MalformedPayload`].
pub fn decrypt_with_prepended_nonce(
    key: &[u8; KEY_SIZE],
    data: &[u8],
    associated_data: &[u8],
) -> Result<Zeroizing<Vec<u8>>> {
    if data.len() < NONCE_SIZE + TAG_SIZE {
        return Err(Error::MalformedPayload(format!(
            "sealed body is {} bytes, need at least {}",
            data.len(),
            NONCE_SIZE + TAG_SIZE
        )));
    }

    let (nonce_bytes, ciphertext) = data.split_at(NONCE_SIZE);
    let nonce = Nonce::from_bytes(
        nonce_bytes
            .try_into()
            .map_err(|_| Error::MalformedPayload("invalid nonce".into()))?,
    );

    decrypt(key, &nonce, ciphertext, associated_data)
}
