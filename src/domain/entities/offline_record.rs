use crate::domain::value_objects::{RecordId, RecordKind, RecordPayload};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// A locally persisted user action awaiting remote confirmation.
///
/// Serialized camelCase with `kind` stored as `type`, matching the data
/// already persisted by shipped clients under the offline storage keys.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OfflineRecord {
    pub id: RecordId,
    #[serde(rename = "type")]
    pub kind: RecordKind,
    pub payload: RecordPayload,
    pub created_at: i64,
    pub synced: bool,
}

impl OfflineRecord {
    pub fn new(kind: RecordKind, payload: RecordPayload) -> Self {
        let id = RecordId::generate(&kind);
        Self {
            id,
            kind,
            payload,
            created_at: Utc::now().timestamp_millis(),
            synced: false,
        }
    }

    pub fn mark_synced(&mut self) {
        self.synced = true;
    }
}
