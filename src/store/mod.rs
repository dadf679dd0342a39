mod memory;
mod tables;
mod wal_store;

pub use memory::MemoryStore;
pub use tables::Tables;
pub use wal_store::WalStore;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::model::Event;

/// Persistence seam for every service.
///
/// Reads go through `tables()`; writes go through `commit` only. A commit is
/// applied as a unit: either every event in the batch is durable and visible,
/// or none is.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    fn tables(&self) -> &RwLock<Tables>;

    /// Persist and apply one batch. Callers must not hold a read guard from
    /// `tables()` across this call.
    async fn commit(&self, batch: Vec<Event>) -> Result<(), StoreError>;
}

#[derive(Debug)]
pub enum StoreError {
    Wal(String),
    Unavailable,
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Wal(e) => write!(f, "WAL error: {e}"),
            StoreError::Unavailable => write!(f, "store unavailable"),
        }
    }
}

impl std::error::Error for StoreError {}
