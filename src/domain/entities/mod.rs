pub mod offline_record;
pub mod sync_report;

pub use offline_record::OfflineRecord;
pub use sync_report::{SyncNotice, SyncReport};
