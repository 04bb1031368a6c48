// モジュール定義
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod shared;

pub use application::ports::{KeyValueStore, RemoteReplayer, StorageError};
pub use application::services::{OfflineQueue, SyncCoordinator, SyncStatus};
pub use domain::entities::{OfflineRecord, SyncNotice, SyncReport};
pub use domain::value_objects::{RecordId, RecordKind, RecordPayload};
pub use infrastructure::connectivity::{ConnectivityMonitor, ConnectivitySnapshot};
pub use infrastructure::storage::{MemoryKeyValueStore, SqliteKeyValueStore};
pub use shared::config::{AppConfig, DatabaseConfig, SyncConfig};
pub use shared::error::{AppError, Result};

/// ログ設定の初期化
pub fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lunara_offline=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
