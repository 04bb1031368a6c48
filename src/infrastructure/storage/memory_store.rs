use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::application::ports::{KeyValueStore, StorageError};

/// In-memory stand-in for the durable medium, used by tests.
/// `set_faulty(true)` makes every operation fail, simulating a quota or
/// I/O fault.
#[derive(Default)]
pub struct MemoryKeyValueStore {
    entries: RwLock<HashMap<String, String>>,
    faulty: AtomicBool,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_faulty(&self, faulty: bool) {
        self.faulty.store(faulty, Ordering::SeqCst);
    }

    fn check_fault(&self) -> Result<(), StorageError> {
        if self.faulty.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable(
                "simulated storage fault".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.check_fault()?;
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check_fault()?;
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
