use crate::models::ProfileRecord;
use sha2::{Digest, Sha256};

/// A history entry stored as JSON together with its SHA-256 checksum.
///
/// Entries whose checksum no longer matches are treated as absent, so a
/// corrupted entry is never served back to a client.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ValidatedCacheEntry {
    /// Serialized `ProfileRecord`.
    pub data: String,
    /// SHA-256 checksum of `data` (hex encoded).
    pub checksum: String,
}

impl ValidatedCacheEntry {
    /// Serializes a record and computes its checksum.
    pub fn seal(record: &ProfileRecord) -> Result<Self, serde_json::Error> {
        let data = serde_json::to_string(record)?;
        let checksum = Self::compute_checksum(&data);
        Ok(Self { data, checksum })
    }

    fn compute_checksum(data: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Returns true if the checksum matches.
    pub fn is_valid(&self) -> bool {
        Self::compute_checksum(&self.data) == self.checksum
    }

    /// Verifies and deserializes the record; `None` if tampered or unreadable.
    pub fn open(&self) -> Option<ProfileRecord> {
        if !self.is_valid() {
            // Checksum mismatch - entry corrupted
            tracing::warn!(
                "History entry validation failed: checksum mismatch. Expected: {}, Data length: {}",
                self.checksum,
                self.data.len()
            );
            return None;
        }

        match serde_json::from_str(&self.data) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!("History entry could not be decoded: {}", e);
                None
            }
        }
    }
}
