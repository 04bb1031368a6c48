use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::application::ports::RemoteReplayer;
use crate::application::services::offline_queue::OfflineQueue;
use crate::domain::entities::{OfflineRecord, SyncReport};
use crate::infrastructure::connectivity::ConnectivityMonitor;
use crate::shared::config::SyncConfig;
use crate::shared::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncStatus {
    pub is_syncing: bool,
    pub last_sync: Option<i64>,
    pub sync_errors: u32,
}

/// Replays pending offline records against the remote store, one pass at a
/// time. At most one pass is in flight; a trigger while another pass runs
/// coalesces into an empty report.
pub struct SyncCoordinator {
    queue: Arc<OfflineQueue>,
    remote: Arc<dyn RemoteReplayer>,
    config: SyncConfig,
    status: Arc<RwLock<SyncStatus>>,
}

impl SyncCoordinator {
    pub fn new(
        queue: Arc<OfflineQueue>,
        remote: Arc<dyn RemoteReplayer>,
        config: SyncConfig,
    ) -> Self {
        Self {
            queue,
            remote,
            config,
            status: Arc::new(RwLock::new(SyncStatus {
                is_syncing: false,
                last_sync: None,
                sync_errors: 0,
            })),
        }
    }

    /// Replays every record pending at the start of the pass, sequentially
    /// and in snapshot order. Records appended mid-pass wait for the next
    /// trigger.
    pub async fn sync_pending(&self) -> Result<SyncReport, AppError> {
        {
            let mut status = self.status.write().await;
            if status.is_syncing {
                debug!("sync pass already in flight");
                return Ok(SyncReport::default());
            }
            status.is_syncing = true;
        }

        let snapshot = self.queue.list_pending().await;
        if snapshot.is_empty() {
            let mut status = self.status.write().await;
            status.is_syncing = false;
            return Ok(SyncReport::default());
        }

        let report = match self.replay_snapshot(&snapshot).await {
            Ok(report) => report,
            Err(err) => {
                // 想定外の失敗はスナップショット全件を失敗として報告する
                error!("sync pass aborted: {err}");
                SyncReport::new(0, snapshot.len() as u32)
            }
        };

        let mut status = self.status.write().await;
        status.is_syncing = false;
        status.last_sync = Some(Utc::now().timestamp());
        if report.failed > 0 {
            status.sync_errors = status.sync_errors.saturating_add(1);
        }

        info!(
            success = report.success,
            failed = report.failed,
            "sync pass finished"
        );
        Ok(report)
    }

    async fn replay_snapshot(&self, snapshot: &[OfflineRecord]) -> Result<SyncReport, AppError> {
        let mut success = 0u32;
        let mut failed = 0u32;

        for record in snapshot {
            match self.remote.replay(record).await {
                Ok(true) => {
                    self.queue.mark_synced(&record.id).await;
                    success += 1;
                }
                Ok(false) => {
                    failed += 1;
                }
                Err(err) => {
                    warn!(id = %record.id, "replay failed: {err}");
                    failed += 1;
                }
            }
        }

        if success > 0 {
            self.queue.garbage_collect().await;
        }

        Ok(SyncReport::new(success, failed))
    }

    pub async fn status(&self) -> SyncStatus {
        self.status.read().await.clone()
    }

    /// 再接続時の自動同期タスクを起動する。
    ///
    /// Waits for an offline-to-online transition with pending records, lets
    /// the connection settle for the configured delay, runs one pass, then
    /// acknowledges the monitor's sticky offline flag. Manual
    /// [`sync_pending`](Self::sync_pending) calls skip the delay.
    pub fn spawn_auto_sync(self: &Arc<Self>, monitor: Arc<ConnectivityMonitor>) -> JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            if !service.config.auto_sync {
                debug!("auto sync disabled by config");
                return;
            }

            let mut online = monitor.subscribe();
            loop {
                if online.changed().await.is_err() {
                    break;
                }
                if !*online.borrow_and_update() {
                    continue;
                }
                if !service.queue.has_pending().await {
                    monitor.reset_offline_flag().await;
                    continue;
                }

                // 再接続直後の不安定な回線を避けるため少し待つ
                tokio::time::sleep(Duration::from_secs(service.config.reconnect_settle_secs))
                    .await;

                if service.queue.has_pending().await {
                    match service.sync_pending().await {
                        Ok(report) => info!(
                            success = report.success,
                            failed = report.failed,
                            "auto sync pass finished"
                        ),
                        Err(e) => {
                            error!("Sync error: {}", e);
                            let mut status = service.status.write().await;
                            status.sync_errors += 1;
                        }
                    }
                }
                monitor.reset_offline_flag().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{RecordKind, RecordPayload};
    use crate::infrastructure::storage::MemoryKeyValueStore;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    fn kind(value: &str) -> RecordKind {
        RecordKind::new(value.to_string()).unwrap()
    }

    fn payload(value: serde_json::Value) -> RecordPayload {
        RecordPayload::new(value).unwrap()
    }

    fn test_config() -> SyncConfig {
        SyncConfig {
            auto_sync: true,
            reconnect_settle_secs: 0,
        }
    }

    fn new_queue() -> Arc<OfflineQueue> {
        Arc::new(OfflineQueue::new(Arc::new(MemoryKeyValueStore::new())))
    }

    struct ScriptedReplayer {
        reject_kind: Option<&'static str>,
        error_kind: Option<&'static str>,
        delay: Option<Duration>,
        calls: AtomicU32,
    }

    impl ScriptedReplayer {
        fn accepting_all() -> Self {
            Self {
                reject_kind: None,
                error_kind: None,
                delay: None,
                calls: AtomicU32::new(0),
            }
        }

        fn rejecting(kind: &'static str) -> Self {
            Self {
                reject_kind: Some(kind),
                ..Self::accepting_all()
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RemoteReplayer for ScriptedReplayer {
        async fn replay(&self, record: &OfflineRecord) -> Result<bool, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.error_kind == Some(record.kind.as_str()) {
                return Err(AppError::Sync("remote call failed".to_string()));
            }
            Ok(self.reject_kind != Some(record.kind.as_str()))
        }
    }

    #[tokio::test]
    async fn test_partial_failure_counts_and_gc() {
        let queue = new_queue();
        queue
            .append(kind("mood-entry"), payload(json!({"mood": "calm"})))
            .await;
        queue
            .append(kind("mood-entry"), payload(json!({"mood": "low"})))
            .await;
        queue
            .append(kind("cycle-entry"), payload(json!({"day": 2})))
            .await;

        let remote = Arc::new(ScriptedReplayer::rejecting("cycle-entry"));
        let coordinator = SyncCoordinator::new(queue.clone(), remote.clone(), test_config());

        let report = coordinator.sync_pending().await.unwrap();
        assert_eq!(report, SyncReport::new(2, 1));

        let pending = queue.list_pending().await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].kind.as_str(), "cycle-entry");

        // the two confirmed records were garbage collected out of full storage
        assert_eq!(queue.list_all().await.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_queue_short_circuits() {
        let queue = new_queue();
        let remote = Arc::new(ScriptedReplayer::accepting_all());
        let coordinator = SyncCoordinator::new(queue, remote.clone(), test_config());

        let report = coordinator.sync_pending().await.unwrap();
        assert_eq!(report, SyncReport::default());
        assert_eq!(remote.calls(), 0);
        assert!(!coordinator.status().await.is_syncing);
    }

    #[tokio::test]
    async fn test_replay_error_keeps_record_pending() {
        let queue = new_queue();
        queue
            .append(kind("meal-entry"), payload(json!({"kcal": 380})))
            .await;
        queue
            .append(kind("mood-entry"), payload(json!({"mood": "fine"})))
            .await;

        let remote = Arc::new(ScriptedReplayer {
            error_kind: Some("meal-entry"),
            ..ScriptedReplayer::accepting_all()
        });
        let coordinator = SyncCoordinator::new(queue.clone(), remote, test_config());

        let report = coordinator.sync_pending().await.unwrap();
        assert_eq!(report, SyncReport::new(1, 1));
        assert_eq!(queue.list_pending().await[0].kind.as_str(), "meal-entry");
        assert_eq!(coordinator.status().await.sync_errors, 1);
    }

    #[tokio::test]
    async fn test_concurrent_triggers_run_one_pass() {
        let queue = new_queue();
        for i in 0..3 {
            queue
                .append(kind("mood-entry"), payload(json!({"index": i})))
                .await;
        }

        let remote = Arc::new(ScriptedReplayer {
            delay: Some(Duration::from_millis(50)),
            ..ScriptedReplayer::accepting_all()
        });
        let coordinator = Arc::new(SyncCoordinator::new(
            queue.clone(),
            remote.clone(),
            test_config(),
        ));

        let first = tokio::spawn({
            let coordinator = coordinator.clone();
            async move { coordinator.sync_pending().await.unwrap() }
        });
        let second = tokio::spawn({
            let coordinator = coordinator.clone();
            async move { coordinator.sync_pending().await.unwrap() }
        });

        let (a, b) = (first.await.unwrap(), second.await.unwrap());
        assert_eq!(remote.calls(), 3);
        assert_eq!(a.processed() + b.processed(), 3);
        assert!(queue.list_pending().await.is_empty());
    }

    struct AppendingReplayer {
        queue: Arc<OfflineQueue>,
        appended: AtomicBool,
    }

    #[async_trait]
    impl RemoteReplayer for AppendingReplayer {
        async fn replay(&self, _record: &OfflineRecord) -> Result<bool, AppError> {
            if !self.appended.swap(true, Ordering::SeqCst) {
                self.queue
                    .append(kind("cycle-entry"), payload(json!({"day": 9})))
                    .await;
            }
            Ok(true)
        }
    }

    #[tokio::test]
    async fn test_mid_pass_appends_wait_for_next_pass() {
        let queue = new_queue();
        queue
            .append(kind("mood-entry"), payload(json!({"mood": "calm"})))
            .await;
        queue
            .append(kind("mood-entry"), payload(json!({"mood": "low"})))
            .await;

        let remote = Arc::new(AppendingReplayer {
            queue: queue.clone(),
            appended: AtomicBool::new(false),
        });
        let coordinator = SyncCoordinator::new(queue.clone(), remote, test_config());

        let report = coordinator.sync_pending().await.unwrap();
        assert_eq!(report, SyncReport::new(2, 0));

        let pending = queue.list_pending().await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].kind.as_str(), "cycle-entry");
    }

    #[tokio::test]
    async fn test_status_reflects_finished_pass() {
        let queue = new_queue();
        queue
            .append(kind("mood-entry"), payload(json!({"mood": "calm"})))
            .await;
        let coordinator = SyncCoordinator::new(
            queue,
            Arc::new(ScriptedReplayer::accepting_all()),
            test_config(),
        );

        coordinator.sync_pending().await.unwrap();

        let status = coordinator.status().await;
        assert!(!status.is_syncing);
        assert!(status.last_sync.is_some());
        assert_eq!(status.sync_errors, 0);
    }
}
