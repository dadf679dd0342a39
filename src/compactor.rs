use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::store::WalStore;

/// Rewrite the WAL as a snapshot once `threshold` commits accumulated.
/// Returns whether a compaction ran.
pub async fn compact_if_needed(store: &WalStore, threshold: u64) -> bool {
    let appends = store.appends_since_compact().await;
    if appends < threshold {
        return false;
    }
    match store.compact().await {
        Ok(()) => {
            info!("compacted WAL after {appends} commits");
            true
        }
        Err(e) => {
            warn!("WAL compaction failed: {e}");
            false
        }
    }
}

/// Background task that periodically checks whether the WAL needs compacting.
pub async fn run_compactor(store: Arc<WalStore>, threshold: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(30));
    loop {
        interval.tick().await;
        if !compact_if_needed(&store, threshold).await {
            debug!("compactor: nothing to do");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::*;
    use crate::store::ResourceStore;
    use std::path::PathBuf;
    use ulid::Ulid;

    fn test_wal_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("fieldbook_test_compactor");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        let _ = std::fs::remove_file(&path);
        path
    }

    #[tokio::test]
    async fn compacts_only_past_threshold() {
        let path = test_wal_path("threshold.wal");
        let store = WalStore::open(&path).unwrap();

        let live = Live {
            id: Ulid::new(),
            title: "Opening".into(),
            date: 0,
            status: LiveStatus::Scheduled,
            url: "https://example.org".into(),
        };
        store.commit(vec![Event::LiveCreated(live.clone())]).await.unwrap();
        for status in [LiveStatus::OnAir, LiveStatus::Replay] {
            store
                .commit(vec![Event::LiveUpdated(Live { status, ..live.clone() })])
                .await
                .unwrap();
        }

        assert!(!compact_if_needed(&store, 4).await);
        assert_eq!(store.appends_since_compact().await, 3);
        assert!(compact_if_needed(&store, 3).await);
        assert_eq!(store.appends_since_compact().await, 0);

        drop(store);
        let reopened = WalStore::open(&path).unwrap();
        let tables = reopened.tables().read().await;
        assert_eq!(tables.live(&live.id).map(|l| l.status), Some(LiveStatus::Replay));
    }
}
