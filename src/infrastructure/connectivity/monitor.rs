use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, watch};

/// Reachability of the remote store as reported by platform online/offline
/// events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectivitySnapshot {
    pub is_online: bool,
    pub was_offline: bool,
    pub last_online_at: Option<i64>,
}

/// Tracks connectivity transitions. `was_offline` is sticky: it stays set
/// after a reconnect until a consumer that acted on the transition calls
/// [`reset_offline_flag`](Self::reset_offline_flag).
pub struct ConnectivityMonitor {
    state: RwLock<ConnectivitySnapshot>,
    online_tx: watch::Sender<bool>,
}

impl ConnectivityMonitor {
    pub fn new(initially_online: bool) -> Self {
        let (online_tx, _) = watch::channel(initially_online);
        Self {
            state: RwLock::new(ConnectivitySnapshot {
                is_online: initially_online,
                was_offline: false,
                last_online_at: None,
            }),
            online_tx,
        }
    }

    /// プラットフォームのonlineイベント
    pub async fn handle_online(&self) {
        let mut state = self.state.write().await;
        if state.is_online {
            return;
        }
        state.is_online = true;
        state.was_offline = true;
        state.last_online_at = Some(Utc::now().timestamp_millis());
        self.online_tx.send_replace(true);
    }

    /// プラットフォームのofflineイベント
    pub async fn handle_offline(&self) {
        let mut state = self.state.write().await;
        if !state.is_online {
            return;
        }
        state.is_online = false;
        self.online_tx.send_replace(false);
    }

    /// Consumer acknowledgement of a reconnect it has acted on.
    pub async fn reset_offline_flag(&self) {
        self.state.write().await.was_offline = false;
    }

    pub async fn is_online(&self) -> bool {
        self.state.read().await.is_online
    }

    pub async fn snapshot(&self) -> ConnectivitySnapshot {
        self.state.read().await.clone()
    }

    /// Transition stream: `true` after an offline-to-online edge, `false`
    /// after the reverse. Only genuine transitions are published.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.online_tx.subscribe()
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(true)
    }
}
