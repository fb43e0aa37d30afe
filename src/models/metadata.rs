//! Metadata record written once per generated QR code.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Suffix appended to the identifier to form the stored file name.
pub const FILE_SUFFIX: &str = "-qr-code.png";

/// Correlates a stored QR image with the request that produced it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct MetadataRecord {
    /// Unique identifier, shared with the stored object's key.
    pub id: Uuid,

    /// File name of the stored object (`<id>-qr-code.png`).
    pub file_name: String,

    /// Original request fields, stringified.
    pub request_data: BTreeMap<String, String>,

    /// Creation time.
    pub timestamp: DateTime<Utc>,
}

impl MetadataRecord {
    pub fn new(id: Uuid, request_data: BTreeMap<String, String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id,
            file_name: file_name_for(id),
            request_data,
            timestamp,
        }
    }

    /// Timestamp in the string form persisted by the stores.
    pub fn timestamp_string(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
    }
}

pub fn file_name_for(id: Uuid) -> String {
    format!("{id}{FILE_SUFFIX}")
}

/// Object key of the image inside the bucket: `<folder>/<file_name>`.
pub fn object_key(folder: &str, file_name: &str) -> String {
    format!("{}/{}", folder.trim_end_matches('/'), file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_and_key_share_identifier() {
        let id = Uuid::new_v4();
        let record = MetadataRecord::new(id, BTreeMap::new(), Utc::now());
        assert_eq!(record.file_name, format!("{id}-qr-code.png"));
        assert_eq!(
            object_key("qr-codes", &record.file_name),
            format!("qr-codes/{id}-qr-code.png")
        );
        assert_eq!(
            object_key("qr-codes/", &record.file_name),
            format!("qr-codes/{id}-qr-code.png")
        );
    }
}
