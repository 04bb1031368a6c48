pub mod key_value_store;
pub mod remote_replayer;

pub use key_value_store::{KeyValueStore, StorageError};
pub use remote_replayer::RemoteReplayer;
