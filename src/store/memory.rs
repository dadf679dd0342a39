use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::model::Event;

use super::{ResourceStore, StoreError, Tables};

/// Non-durable store for tests and benches.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    commits: AtomicU64,
    failing: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following commit fail with `StoreError::Unavailable`.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn commit_count(&self) -> u64 {
        self.commits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResourceStore for MemoryStore {
    fn tables(&self) -> &RwLock<Tables> {
        &self.tables
    }

    async fn commit(&self, batch: Vec<Event>) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable);
        }
        for event in &batch {
            tables.apply(event);
        }
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
