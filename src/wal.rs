use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use tracing::{error, warn};

use crate::model::Event;

/// Encode one commit as a `[len][bincode][crc32]` frame.
fn encode_commit(writer: &mut impl Write, commit: &[Event]) -> io::Result<()> {
    let payload =
        bincode::serialize(commit).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let len = u32::try_from(payload.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "commit too large"))?;
    let crc = crc32fast::hash(&payload);
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(&payload)?;
    writer.write_all(&crc.to_le_bytes())?;
    Ok(())
}

/// Intact prefix of a log, as read back at startup.
#[derive(Debug, Default)]
pub struct Replay {
    pub commits: Vec<Vec<Event>>,
    /// Byte length of the frames in `commits`. Anything past it is a torn
    /// or corrupt tail.
    pub intact_len: u64,
}

/// Append-only Write-Ahead Log.
///
/// Format per frame: `[u32: len][bincode: Vec<Event>][u32: crc32]`
/// - One frame is one commit; its events are replayed together or not at all.
/// - A truncated or corrupt tail (crash mid-write) is discarded on replay and
///   cut off by `open`, so new frames follow the last intact one.
/// - A failed append is truncated away before the error is returned. If that
///   truncation fails too, the log refuses appends until it is reopened.
pub struct Wal {
    file: File,
    path: PathBuf,
    len: u64,
    failed: bool,
    appends_since_compact: u64,
}

impl Wal {
    /// Open (or create) the WAL file at `path`, cutting it back to
    /// `intact_len` bytes (the length `replay` reported).
    pub fn open(path: &Path, intact_len: u64) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut len = file.metadata()?.len();
        if len > intact_len {
            warn!(
                "WAL {}: discarding {} bytes after the last intact commit",
                path.display(),
                len - intact_len
            );
            file.set_len(intact_len)?;
            file.sync_all()?;
            len = intact_len;
        }
        Ok(Self {
            file,
            path: path.to_path_buf(),
            len,
            failed: false,
            appends_since_compact: 0,
        })
    }

    /// Append one commit and fsync before returning. On error the file is
    /// left as it was before the call.
    pub fn append(&mut self, commit: &[Event]) -> io::Result<()> {
        if self.failed {
            return Err(io::Error::other("WAL unusable after a failed append; reopen it"));
        }
        let mut frame = Vec::new();
        encode_commit(&mut frame, commit)?;
        match self.write_frame(&frame) {
            Ok(()) => {
                self.len += frame.len() as u64;
                self.appends_since_compact += 1;
                Ok(())
            }
            Err(e) => {
                self.rollback();
                Err(e)
            }
        }
    }

    fn write_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        self.file.write_all(frame)?;
        self.file.sync_all()
    }

    /// Cut the file back to the end of the last acknowledged commit.
    fn rollback(&mut self) {
        let restored = self
            .file
            .set_len(self.len)
            .and_then(|()| self.file.sync_all());
        if let Err(e) = restored {
            error!(
                "WAL {}: cannot discard failed append: {e}; refusing further appends",
                self.path.display()
            );
            self.failed = true;
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the snapshot commits to a temp file next to the WAL and fsync.
    pub fn write_compact_file(path: &Path, commits: &[Vec<Event>]) -> io::Result<()> {
        let tmp_path = path.with_extension("wal.tmp");
        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        for commit in commits {
            encode_commit(&mut writer, commit)?;
        }
        writer.flush()?;
        writer.get_ref().sync_all()?;
        Ok(())
    }

    /// Rename the temp file over the WAL and reopen it for appending.
    pub fn swap_compact_file(&mut self) -> io::Result<()> {
        let tmp_path = self.path.with_extension("wal.tmp");
        fs::rename(&tmp_path, &self.path)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        self.len = file.metadata()?.len();
        self.file = file;
        self.failed = false;
        self.appends_since_compact = 0;
        Ok(())
    }

    /// Replace the log with `commits`.
    #[cfg(test)]
    pub fn compact(&mut self, commits: &[Vec<Event>]) -> io::Result<()> {
        Self::write_compact_file(&self.path, commits)?;
        self.swap_compact_file()
    }

    pub fn appends_since_compact(&self) -> u64 {
        self.appends_since_compact
    }

    /// Replay the log, returning every intact commit in order and the byte
    /// length they cover.
    pub fn replay(path: &Path) -> io::Result<Replay> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Replay::default()),
            Err(e) => return Err(e),
        };
        let mut reader = BufReader::new(file);
        let mut replay = Replay::default();

        loop {
            let mut len_buf = [0u8; 4];
            match reader.read_exact(&mut len_buf) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e),
            }
            let len = u32::from_le_bytes(len_buf) as usize;

            let mut payload = vec![0u8; len];
            match reader.read_exact(&mut payload) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e),
            }

            let mut crc_buf = [0u8; 4];
            match reader.read_exact(&mut crc_buf) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e),
            }
            if u32::from_le_bytes(crc_buf) != crc32fast::hash(&payload) {
                warn!(
                    "WAL {}: corrupt frame after {} commits, stopping replay",
                    path.display(),
                    replay.commits.len()
                );
                break;
            }

            match bincode::deserialize::<Vec<Event>>(&payload) {
                Ok(commit) => {
                    replay.commits.push(commit);
                    replay.intact_len += (len + 8) as u64;
                }
                Err(_) => break,
            }
        }

        Ok(replay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::*;
    use ulid::Ulid;

    fn tmp_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("fieldbook_test_wal");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        let _ = fs::remove_file(&path);
        path
    }

    fn reopen(path: &Path) -> Wal {
        let replay = Wal::replay(path).unwrap();
        Wal::open(path, replay.intact_len).unwrap()
    }

    fn school(name: &str) -> School {
        School {
            id: Ulid::new(),
            name: name.into(),
            category: Category::College,
        }
    }

    #[test]
    fn append_and_replay() {
        let path = tmp_path("append_and_replay.wal");
        let a = school("Jean Moulin");
        let b = school("Pasteur");
        let commits = vec![
            vec![Event::SchoolCreated(a.clone())],
            vec![Event::SchoolCreated(b.clone()), Event::SchoolDeleted { id: a.id }],
        ];

        {
            let mut wal = reopen(&path);
            for c in &commits {
                wal.append(c).unwrap();
            }
            assert_eq!(wal.appends_since_compact(), 2);
        }

        let replayed = Wal::replay(&path).unwrap().commits;
        assert_eq!(replayed, commits);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn truncated_commit_is_dropped_whole() {
        let path = tmp_path("truncation.wal");
        let first = vec![Event::SchoolCreated(school("Curie"))];

        {
            let mut wal = reopen(&path);
            wal.append(&first).unwrap();
        }

        // Second commit written only halfway, as after a crash mid-cascade.
        {
            let cascade = vec![
                Event::MatchDeleted { id: Ulid::new() },
                Event::TeamDeleted { id: Ulid::new() },
                Event::SchoolDeleted { id: Ulid::new() },
            ];
            let mut full = Vec::new();
            encode_commit(&mut full, &cascade).unwrap();
            let mut f = OpenOptions::new().append(true).open(&path).unwrap();
            f.write_all(&full[..full.len() / 2]).unwrap();
        }

        let replayed = Wal::replay(&path).unwrap().commits;
        assert_eq!(replayed, vec![first]);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn replay_nonexistent_file() {
        let path = tmp_path("nonexistent.wal");
        assert!(Wal::replay(&path).unwrap().commits.is_empty());
    }

    #[test]
    fn replay_corrupt_crc() {
        let path = tmp_path("corrupt_crc.wal");
        {
            let payload = bincode::serialize(&vec![Event::LiveDeleted { id: Ulid::new() }]).unwrap();
            let mut f = File::create(&path).unwrap();
            f.write_all(&(payload.len() as u32).to_le_bytes()).unwrap();
            f.write_all(&payload).unwrap();
            f.write_all(&0xDEADBEEFu32.to_le_bytes()).unwrap();
        }
        assert!(Wal::replay(&path).unwrap().commits.is_empty());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn compact_shrinks_and_accepts_appends() {
        let path = tmp_path("compact.wal");
        let keep = school("Montaigne");

        {
            let mut wal = reopen(&path);
            wal.append(&[Event::SchoolCreated(keep.clone())]).unwrap();
            for _ in 0..10 {
                let tmp = school("churn");
                wal.append(&[Event::SchoolCreated(tmp.clone())]).unwrap();
                wal.append(&[Event::SchoolDeleted { id: tmp.id }]).unwrap();
            }
        }
        let before = fs::metadata(&path).unwrap().len();

        let snapshot = vec![vec![Event::SchoolCreated(keep.clone())]];
        let later = vec![Event::SchoolUpdated(School {
            name: "Montaigne II".into(),
            ..keep.clone()
        })];
        {
            let mut wal = reopen(&path);
            wal.compact(&snapshot).unwrap();
            assert_eq!(wal.appends_since_compact(), 0);
            wal.append(&later).unwrap();
        }

        let after = fs::metadata(&path).unwrap().len();
        assert!(after < before, "compacted WAL should be smaller: {after} < {before}");
        let replayed = Wal::replay(&path).unwrap().commits;
        assert_eq!(replayed, vec![snapshot[0].clone(), later]);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn torn_tail_is_cut_before_new_appends() {
        let path = tmp_path("torn_tail.wal");
        let before = vec![Event::SchoolCreated(school("Before crash"))];
        {
            let mut wal = reopen(&path);
            wal.append(&before).unwrap();
        }
        let intact = fs::metadata(&path).unwrap().len();
        {
            let mut f = OpenOptions::new().append(true).open(&path).unwrap();
            f.write_all(&[0x2a, 0, 0, 0, 1, 2]).unwrap();
        }

        let after = vec![Event::SchoolCreated(school("After restart"))];
        {
            let replay = Wal::replay(&path).unwrap();
            assert_eq!(replay.intact_len, intact);
            let mut wal = Wal::open(&path, replay.intact_len).unwrap();
            assert_eq!(fs::metadata(&path).unwrap().len(), intact);
            wal.append(&after).unwrap();
        }

        assert_eq!(Wal::replay(&path).unwrap().commits, vec![before, after]);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn rollback_drops_partial_frame() {
        let path = tmp_path("rollback.wal");
        let first = vec![Event::SchoolCreated(school("Voltaire"))];
        let second = vec![Event::SchoolCreated(school("Rousseau"))];

        let mut wal = reopen(&path);
        wal.append(&first).unwrap();
        // Half a frame reached the file before the write failed.
        let mut torn = Vec::new();
        encode_commit(&mut torn, &[Event::LiveDeleted { id: Ulid::new() }]).unwrap();
        wal.file.write_all(&torn[..torn.len() / 2]).unwrap();
        wal.rollback();
        assert!(!wal.failed);
        wal.append(&second).unwrap();
        drop(wal);

        assert_eq!(Wal::replay(&path).unwrap().commits, vec![first, second]);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn failed_append_never_reaches_the_log() {
        let full = Path::new("/dev/full");
        if !full.exists() {
            return;
        }
        let path = tmp_path("after_failure.wal");
        let mut wal = Wal::open(full, 0).unwrap();
        let rejected = vec![Event::SchoolCreated(school("Rejected"))];
        assert!(wal.append(&rejected).is_err());
        assert_eq!(wal.appends_since_compact(), 0);

        // The device cannot be truncated, so the log stays closed to appends
        // even once it points at a healthy file.
        wal.file = OpenOptions::new().create(true).append(true).open(&path).unwrap();
        wal.len = 0;
        let accepted = vec![Event::SchoolCreated(school("Accepted"))];
        assert!(wal.append(&accepted).is_err());
        drop(wal);
        assert!(Wal::replay(&path).unwrap().commits.is_empty());

        let mut wal = reopen(&path);
        wal.append(&accepted).unwrap();
        drop(wal);
        assert_eq!(Wal::replay(&path).unwrap().commits, vec![accepted]);
        let _ = fs::remove_file(&path);
    }
}
