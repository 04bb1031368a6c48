pub mod offline_queue;
pub mod sync_coordinator;

pub use offline_queue::OfflineQueue;
pub use sync_coordinator::{SyncCoordinator, SyncStatus};
