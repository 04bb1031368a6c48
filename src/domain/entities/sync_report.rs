use serde::{Deserialize, Serialize};

/// Aggregate outcome of one sync pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncReport {
    pub success: u32,
    pub failed: u32,
}

impl SyncReport {
    pub fn new(success: u32, failed: u32) -> Self {
        Self { success, failed }
    }

    pub fn processed(&self) -> u32 {
        self.success + self.failed
    }

    pub fn notice(&self) -> SyncNotice {
        match (self.success, self.failed) {
            (0, 0) => SyncNotice::UpToDate,
            (synced, 0) => SyncNotice::Completed { synced },
            (0, _) => SyncNotice::Failed,
            (synced, failed) => SyncNotice::CompletedWithFailures { synced, failed },
        }
    }
}

/// ユーザーへ通知する同期結果の区分
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncNotice {
    UpToDate,
    Completed { synced: u32 },
    CompletedWithFailures { synced: u32, failed: u32 },
    Failed,
}
