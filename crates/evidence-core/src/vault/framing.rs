//! Text framing of sealed payloads.
//!
//! ```text
//! evs1 $ <kind> $ base64(salt) $ base64(nonce || ciphertext || tag)
//! ```
//!
//! Everything `unseal` needs besides the key travels inside the string.

use super::payload::PayloadKind;
use crate::crypto::{data_hash, NONCE_SIZE, SALT_SIZE, TAG_SIZE};
use crate::error::{Error, Result};
use crate::SEAL_FORMAT_VERSION;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Section separator. Not part of the base64 alphabet.
const SEPARATOR: char = '$';

/// A sealed payload in its self-describing text form.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SealedPayload(String);

/// The decoded sections of a [`SealedPayload`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SealedParts {
    pub kind: PayloadKind,
    pub salt: [u8; SALT_SIZE],
    /// `nonce || ciphertext || tag`
    pub body: Vec<u8>,
}

impl SealedPayload {
    /// Wrap an encoded string without validating it. Parsing happens in
    /// `unseal`, which reports [`Error::MalformedPayload`].
    pub fn from_encoded(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    /// Decode raw bytes fetched from a content store.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        String::from_utf8(bytes)
            .map(Self)
            .map_err(|_| Error::MalformedPayload("sealed payload is not text".into()))
    }

    /// The encoded string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Bytes handed to the content store.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0.into_bytes()
    }

    /// Hex SHA-256 of the encoded string.
    pub fn fingerprint(&self) -> String {
        data_hash(self.0.as_bytes())
    }

    /// Kind tag, if the header parses.
    pub fn kind(&self) -> Option<PayloadKind> {
        let mut sections = self.0.split(SEPARATOR);
        match (sections.next(), sections.next()) {
            (Some(SEAL_FORMAT_VERSION), Some(tag)) => PayloadKind::from_tag(tag),
            _ => None,
        }
    }

    pub(crate) fn encode(parts: &SealedParts) -> Self {
        Self(format!(
            "{version}{sep}{kind}{sep}{salt}{sep}{body}",
            version = SEAL_FORMAT_VERSION,
            kind = parts.kind.tag(),
            salt = BASE64.encode(parts.salt),
            body = BASE64.encode(&parts.body),
            sep = SEPARATOR,
        ))
    }

    pub(crate) fn decode(&self) -> Result<SealedParts> {
        let sections: Vec<&str> = self.0.split(SEPARATOR).collect();
        let [version, tag, salt, body] = sections.as_slice() else {
            return Err(malformed(format!(
                "expected 4 sections, found {}",
                sections.len()
            )));
        };

        if *version != SEAL_FORMAT_VERSION {
            return Err(malformed("unknown format version"));
        }
        let kind = PayloadKind::from_tag(tag).ok_or_else(|| malformed("unknown payload kind"))?;

        let salt_bytes = BASE64
            .decode(salt)
            .map_err(|e| malformed(format!("salt section: {}", e)))?;
        let salt: [u8; SALT_SIZE] = salt_bytes
            .try_into()
            .map_err(|_| malformed("salt has wrong length"))?;

        let body = BASE64
            .decode(body)
            .map_err(|e| malformed(format!("cipher section: {}", e)))?;
        if body.len() < NONCE_SIZE + TAG_SIZE {
            return Err(malformed("cipher section too short"));
        }

        Ok(SealedParts { kind, salt, body })
    }
}

/// Associated data authenticated alongside every payload.
pub(crate) fn associated_data(kind: PayloadKind) -> Vec<u8> {
    format!("{}{}{}", SEAL_FORMAT_VERSION, SEPARATOR, kind.tag()).into_bytes()
}

fn malformed(detail: impl Into<String>) -> Error {
    Error::MalformedPayload(detail.into())
}

impl fmt::Debug for SealedPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SealedPayload({} chars)", self.0.len())
    }
}

impl fmt::Display for SealedPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
