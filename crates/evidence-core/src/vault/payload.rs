//! Cleartext payload types and their canonical encoding.

use crate::error::{Error, Result};
use crate::store::ContentId;
use serde::{Deserialize, Serialize};

/// Evidence metadata sealed into the content store.
///
/// Encoded as JSON with camelCase keys. Unknown keys are rejected so that a
/// payload that decrypts but carries unexpected fields is never shown as
/// if it were complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CleartextMetadata {
    /// Case identifier (`crimeId` in older payloads).
    #[serde(alias = "crimeId")]
    pub case_id: String,
    /// Exhibit name, e.g. "Knife".
    pub exhibit_name: String,
    /// Free-text description.
    pub description: String,
    /// Identity of the author.
    pub officer: String,
    /// ISO 8601 / RFC 3339 timestamp.
    pub timestamp: String,
    /// Content id of the sealed attachment, if any.
    #[serde(rename = "fileHash", default, skip_serializing_if = "Option::is_none")]
    pub file_content_id: Option<ContentId>,
}

impl CleartextMetadata {
    /// Build metadata without an attachment.
    pub fn new(
        case_id: impl Into<String>,
        exhibit_name: impl Into<String>,
        description: impl Into<String>,
        officer: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            case_id: case_id.into(),
            exhibit_name: exhibit_name.into(),
            description: description.into(),
            officer: officer.into(),
            timestamp: timestamp.into(),
            file_content_id: None,
        }
    }

    /// Caller-side checks: every field non-empty, timestamp in RFC 3339.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("caseId", &self.case_id),
            ("exhibitName", &self.exhibit_name),
            ("description", &self.description),
            ("officer", &self.officer),
            ("timestamp", &self.timestamp),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(Error::InvalidInput(format!("{} is required", name)));
            }
        }
        chrono::DateTime::parse_from_rfc3339(&self.timestamp)
            .map_err(|e| Error::InvalidInput(format!("timestamp is not RFC 3339: {}", e)))?;
        Ok(())
    }

    /// Canonical JSON bytes.
    pub fn to_canonical_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parse canonical JSON bytes.
    ///
    /// Missing required fields, unknown fields and non-JSON input all fail
    /// with [`Error::MalformedPayload`].
    pub fn from_canonical_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| Error::MalformedPayload(format!("metadata: {}", e)))
    }
}

/// What a sealed payload carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    /// Structured metadata (JSON).
    Metadata,
    /// Raw file bytes.
    File,
}

impl PayloadKind {
    /// Tag used in the sealed framing.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Metadata => "m",
            Self::File => "f",
        }
    }

    /// Parse a framing tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "m" => Some(Self::Metadata),
            "f" => Some(Self::File),
            _ => None,
        }
    }
}

/// A cleartext payload: metadata or an arbitrary byte sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Evidence metadata.
    Metadata(CleartextMetadata),
    /// Binary attachment.
    File(Vec<u8>),
}

impl Payload {
    /// Kind of this payload.
    pub fn kind(&self) -> PayloadKind {
        match self {
            Self::Metadata(_) => PayloadKind::Metadata,
            Self::File(_) => PayloadKind::File,
        }
    }

    /// Metadata if this is a metadata payload.
    pub fn as_metadata(&self) -> Option<&CleartextMetadata> {
        match self {
            Self::Metadata(m) => Some(m),
            Self::File(_) => None,
        }
    }

    /// File bytes if this is a file payload.
    pub fn as_file(&self) -> Option<&[u8]> {
        match self {
            Self::File(bytes) => Some(bytes),
            Self::Metadata(_) => None,
        }
    }
}

impl From<CleartextMetadata> for Payload {
    fn from(metadata: CleartextMetadata) -> Self {
        Self::Metadata(metadata)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Self::File(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn test_json_keys_are_camel_case() {
        let json = String::from_utf8(knife().to_canonical_json().expect("encode")).expect("utf8");
        assert!(json.contains("\"caseId\":\"42\""));
        assert!(json.contains("\"exhibitName\":\"Knife\""));
        assert!(!json.contains("fileHash"));
    }

    #[test]
    fn test_field_order_does_not_matter() {
        let json = br#"{"timestamp":"2025-01-01T00:00:00Z","officer":"0xCAFEBABE",
            "description":"Found at scene","exhibitName":"Knife","caseId":"42"}"#;
        let parsed = CleartextMetadata::from_canonical_json(json).expect("parse");
        assert_eq!(parsed, knife());
    }

    #[test]
    fn test_legacy_crime_id_alias() {
        let json = br#"{"crimeId":"42","exhibitName":"Knife","description":"Found at scene",
            "officer":"0xCAFEBABE","timestamp":"2025-01-01T00:00:00Z"}"#;
        let parsed = CleartextMetadata::from_canonical_json(json).expect("parse");
        assert_eq!(parsed.case_id, "42");
    }

    #[test]
    fn test_extra_fields_rejected() {
        let json = br#"{"caseId":"42","exhibitName":"Knife","description":"d",
            "officer":"0x1","timestamp":"2025-01-01T00:00:00Z","victim":"redacted"}"#;
        let err = CleartextMetadata::from_canonical_json(json).unwrap_err();
        assert!(matches!(err, Error::MalformedPayload(_)));
    }

    #[test]
    fn test_missing_field_rejected() {
        let json = br#"{"caseId":"42","exhibitName":"Knife"}"#;
        let err = CleartextMetadata::from_canonical_json(json).unwrap_err();
        assert!(matches!(err, Error::MalformedPayload(_)));
    }

    #[test]
    fn test_file_hash_round_trips() {
        let mut meta = knife();
        meta.file_content_id = Some(ContentId::new("bafkdeadbeef"));
        let bytes = meta.to_canonical_json().expect("encode");
        assert!(String::from_utf8_lossy(&bytes).contains("\"fileHash\":\"bafkdeadbeef\""));
        assert_eq!(CleartextMetadata::from_canonical_json(&bytes).expect("parse"), meta);
    }

    #[test]
    fn test_validate() {
        assert!(knife().validate().is_ok());

        let mut blank = knife();
        blank.exhibit_name = "  ".into();
        assert!(matches!(blank.validate(), Err(Error::InvalidInput(_))));

        let mut bad_time = knife();
        bad_time.timestamp = "yesterday".into();
        assert!(matches!(bad_time.validate(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_kind_tags() {
        for kind in [PayloadKind::Metadata, PayloadKind::File] {
            assert_eq!(PayloadKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(PayloadKind::from_tag("x"), None);
    }
}
