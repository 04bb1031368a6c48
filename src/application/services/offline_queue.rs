use std::sync::Arc;

use tracing::{debug, warn};

use crate::application::ports::KeyValueStore;
use crate::domain::entities::OfflineRecord;
use crate::domain::value_objects::{RecordId, RecordKind, RecordPayload};

/// 全レコード集合のストレージキー
pub const OFFLINE_DATA_KEY: &str = "lunara_offline_data";
/// 未同期サブセットのストレージキー
pub const PENDING_SYNC_KEY: &str = "lunara_pending_sync";

/// Durable queue of user actions taken while the remote store was out of
/// reach. Sole owner of every stored record; records are kept in full under
/// [`OFFLINE_DATA_KEY`] and redundantly indexed under [`PENDING_SYNC_KEY`]
/// until a replay is confirmed.
///
/// A storage fault reads as "no data" and a failed write is skipped; neither
/// ever reaches the caller.
pub struct OfflineQueue {
    store: Arc<dyn KeyValueStore>,
}

impl OfflineQueue {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// オフラインレコードの保存
    pub async fn append(&self, kind: RecordKind, payload: RecordPayload) -> RecordId {
        let record = OfflineRecord::new(kind, payload);
        let id = record.id.clone();

        let mut all = self.load_records(OFFLINE_DATA_KEY).await;
        all.push(record.clone());
        self.store_records(OFFLINE_DATA_KEY, &all).await;

        let mut pending = self.load_records(PENDING_SYNC_KEY).await;
        pending.push(record);
        self.store_records(PENDING_SYNC_KEY, &pending).await;

        debug!(id = %id, "queued offline record");
        id
    }

    /// Every stored record, synced or not, in insertion order.
    pub async fn list_all(&self) -> Vec<OfflineRecord> {
        self.load_records(OFFLINE_DATA_KEY).await
    }

    /// Unsynced records, read from the pending index.
    pub async fn list_pending(&self) -> Vec<OfflineRecord> {
        self.load_records(PENDING_SYNC_KEY).await
    }

    pub async fn list_by_kind(&self, kind: &RecordKind) -> Vec<OfflineRecord> {
        self.list_all()
            .await
            .into_iter()
            .filter(|record| &record.kind == kind)
            .collect()
    }

    /// 同期済みマーク。対象が存在しない場合は何もしない（リトライの冪等性）。
    pub async fn mark_synced(&self, id: &RecordId) {
        let mut pending = self.load_records(PENDING_SYNC_KEY).await;
        let before = pending.len();
        pending.retain(|record| &record.id != id);
        if pending.len() != before {
            self.store_records(PENDING_SYNC_KEY, &pending).await;
        }

        let mut all = self.load_records(OFFLINE_DATA_KEY).await;
        let mut changed = false;
        for record in all.iter_mut() {
            if &record.id == id && !record.synced {
                record.mark_synced();
                changed = true;
            }
        }
        if changed {
            self.store_records(OFFLINE_DATA_KEY, &all).await;
        }
    }

    /// Deletes the record from both the full set and the pending index.
    pub async fn remove(&self, id: &RecordId) {
        let mut all = self.load_records(OFFLINE_DATA_KEY).await;
        all.retain(|record| &record.id != id);
        self.store_records(OFFLINE_DATA_KEY, &all).await;

        let mut pending = self.load_records(PENDING_SYNC_KEY).await;
        pending.retain(|record| &record.id != id);
        self.store_records(PENDING_SYNC_KEY, &pending).await;
    }

    /// 同期済みレコードの一括削除
    pub async fn garbage_collect(&self) {
        let all = self.load_records(OFFLINE_DATA_KEY).await;
        let remaining: Vec<OfflineRecord> = all.into_iter().filter(|r| !r.synced).collect();
        self.store_records(OFFLINE_DATA_KEY, &remaining).await;
    }

    pub async fn pending_count(&self) -> usize {
        self.list_pending().await.len()
    }

    pub async fn has_pending(&self) -> bool {
        self.pending_count().await > 0
    }

    async fn load_records(&self, key: &str) -> Vec<OfflineRecord> {
        let raw = match self.store.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(err) => {
                warn!(key, "offline store read failed: {err}");
                return Vec::new();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(records) => records,
            Err(err) => {
                warn!(key, "discarding corrupted offline data: {err}");
                Vec::new()
            }
        }
    }

    async fn store_records(&self, key: &str, records: &[OfflineRecord]) {
        let serialized = match serde_json::to_string(records) {
            Ok(serialized) => serialized,
            Err(err) => {
                warn!(key, "offline records not serializable: {err}");
                return;
            }
        };
        if let Err(err) = self.store.set(key, &serialized).await {
            warn!(key, "offline store write failed: {err}");
        }
    }
}
