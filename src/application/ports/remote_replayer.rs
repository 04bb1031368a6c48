use async_trait::async_trait;

use crate::domain::entities::OfflineRecord;
use crate::shared::error::AppError;

/// Remote-call collaborator supplied by the embedding application.
///
/// `Ok(true)` confirms the record was accepted by the remote store.
/// `Ok(false)` means it was rejected and must stay pending; `Err` is a
/// failed call and is counted the same way.
#[async_trait]
pub trait RemoteReplayer: Send + Sync {
    async fn replay(&self, record: &OfflineRecord) -> Result<bool, AppError>;
}
