use std::io;
use std::path::Path;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot, RwLock};
use tracing::info;

use crate::model::Event;
use crate::wal::Wal;

use super::{ResourceStore, StoreError, Tables};

enum WalCommand {
    Append {
        commit: Vec<Event>,
        response: oneshot::Sender<io::Result<()>>,
    },
    Compact {
        commits: Vec<Vec<Event>>,
        response: oneshot::Sender<io::Result<()>>,
    },
    AppendsSinceCompact {
        response: oneshot::Sender<u64>,
    },
}

/// Background task that owns the WAL file.
/// Commits arrive one at a time (the table write lock serializes them), so
/// each append is fsynced on its own before the caller applies it.
async fn wal_writer_loop(mut wal: Wal, mut rx: mpsc::Receiver<WalCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            WalCommand::Append { commit, response } => {
                let flush_start = std::time::Instant::now();
                let result = wal.append(&commit);
                metrics::histogram!(crate::observability::WAL_FLUSH_DURATION_SECONDS)
                    .record(flush_start.elapsed().as_secs_f64());
                let _ = response.send(result);
            }
            WalCommand::Compact { commits, response } => {
                let result = Wal::write_compact_file(wal.path(), &commits)
                    .and_then(|()| wal.swap_compact_file());
                let _ = response.send(result);
            }
            WalCommand::AppendsSinceCompact { response } => {
                let _ = response.send(wal.appends_since_compact());
            }
        }
    }
}

/// Durable store: tables rebuilt from the WAL at open, every commit appended
/// and fsynced before it becomes visible.
pub struct WalStore {
    tables: RwLock<Tables>,
    wal_tx: mpsc::Sender<WalCommand>,
}

impl WalStore {
    /// Replay the log at `path`, cut any torn tail, and start the writer task.
    /// Must be called from within a tokio runtime.
    pub fn open(path: &Path) -> io::Result<Self> {
        let replay = Wal::replay(path)?;
        let mut tables = Tables::new();
        for commit in &replay.commits {
            for event in commit {
                tables.apply(event);
            }
        }
        let (schools, teams, matches, agenda, lives) = tables.counts();
        info!(
            "replayed {} commits from {}: {schools} schools, {teams} teams, {matches} matches, {agenda} agenda events, {lives} lives",
            replay.commits.len(),
            path.display()
        );

        let wal = Wal::open(path, replay.intact_len)?;
        let (wal_tx, wal_rx) = mpsc::channel(1024);
        tokio::spawn(wal_writer_loop(wal, wal_rx));

        Ok(Self {
            tables: RwLock::new(tables),
            wal_tx,
        })
    }

    /// Rewrite the log as a snapshot of the current tables.
    /// Holds the read lock throughout so no commit lands between the
    /// snapshot and the swap.
    pub async fn compact(&self) -> Result<(), StoreError> {
        let tables = self.tables.read().await;
        let commits = tables.snapshot();
        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Compact { commits, response: tx })
            .await
            .map_err(|_| StoreError::Wal("WAL writer shut down".into()))?;
        let result = rx
            .await
            .map_err(|_| StoreError::Wal("WAL writer dropped response".into()))?
            .map_err(|e| StoreError::Wal(e.to_string()));
        drop(tables);
        result
    }

    pub async fn appends_since_compact(&self) -> u64 {
        let (tx, rx) = oneshot::channel();
        if self
            .wal_tx
            .send(WalCommand::AppendsSinceCompact { response: tx })
            .await
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }

    async fn wal_append(&self, commit: Vec<Event>) -> Result<(), StoreError> {
        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Append { commit, response: tx })
            .await
            .map_err(|_| StoreError::Wal("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| StoreError::Wal("WAL writer dropped response".into()))?
            .map_err(|e| StoreError::Wal(e.to_string()))
    }
}

#[async_trait]
impl ResourceStore for WalStore {
    fn tables(&self) -> &RwLock<Tables> {
        &self.tables
    }

    async fn commit(&self, batch: Vec<Event>) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }
        // The write lock spans the append so WAL order equals apply order.
        let mut tables = self.tables.write().await;
        self.wal_append(batch.clone()).await?;
        for event in &batch {
            tables.apply(event);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::*;
    use std::path::PathBuf;
    use ulid::Ulid;

    fn test_wal_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("fieldbook_test_store");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        let _ = std::fs::remove_file(&path);
        path
    }

    fn school(name: &str) -> School {
        School { id: Ulid::new(), name: name.into(), category: Category::Lycee }
    }

    #[tokio::test]
    async fn commits_survive_reopen() {
        let path = test_wal_path("reopen.wal");
        let s = school("Condorcet");
        let team = Team { id: Ulid::new(), name: "Condorcet 1".into(), school: s.id, roster: vec![] };
        {
            let store = WalStore::open(&path).unwrap();
            store.commit(vec![Event::SchoolCreated(s.clone())]).await.unwrap();
            store.commit(vec![Event::TeamCreated(team.clone())]).await.unwrap();
            assert_eq!(store.appends_since_compact().await, 2);
        }

        let store = WalStore::open(&path).unwrap();
        let tables = store.tables().read().await;
        assert_eq!(tables.school(&s.id), Some(&s));
        assert_eq!(tables.team(&team.id), Some(&team));
    }

    #[tokio::test]
    async fn empty_commit_writes_nothing() {
        let path = test_wal_path("empty_commit.wal");
        let store = WalStore::open(&path).unwrap();
        store.commit(Vec::new()).await.unwrap();
        assert_eq!(store.appends_since_compact().await, 0);
    }

    #[tokio::test]
    async fn compact_keeps_state_and_resets_counter() {
        let path = test_wal_path("compact_store.wal");
        let keep = school("Diderot");
        {
            let store = WalStore::open(&path).unwrap();
            store.commit(vec![Event::SchoolCreated(keep.clone())]).await.unwrap();
            for i in 0..20 {
                let tmp = school(&format!("churn {i}"));
                store.commit(vec![Event::SchoolCreated(tmp.clone())]).await.unwrap();
                store.commit(vec![Event::SchoolDeleted { id: tmp.id }]).await.unwrap();
            }
            let before = std::fs::metadata(&path).unwrap().len();
            store.compact().await.unwrap();
            assert_eq!(store.appends_since_compact().await, 0);
            let after = std::fs::metadata(&path).unwrap().len();
            assert!(after < before);
        }

        let store = WalStore::open(&path).unwrap();
        let tables = store.tables().read().await;
        assert_eq!(tables.schools_sorted(), vec![keep]);
    }

    #[tokio::test]
    async fn commits_after_a_torn_tail_survive_the_next_restart() {
        use std::io::Write;

        let path = test_wal_path("torn_restart.wal");
        {
            let store = WalStore::open(&path).unwrap();
            store.commit(vec![Event::SchoolCreated(school("Before crash"))]).await.unwrap();
        }
        {
            let mut f = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
            f.write_all(&[9, 0, 0, 0, 0xff, 0xfe]).unwrap();
        }
        {
            let store = WalStore::open(&path).unwrap();
            store.commit(vec![Event::SchoolCreated(school("After restart"))]).await.unwrap();
            assert_eq!(store.tables().read().await.schools_sorted().len(), 2);
        }

        let store = WalStore::open(&path).unwrap();
        let tables = store.tables().read().await;
        let names: Vec<_> = tables.schools_sorted().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["After restart".to_string(), "Before crash".to_string()]);
    }
}
