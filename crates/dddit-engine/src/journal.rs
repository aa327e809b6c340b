//! Write-ahead intent journal for commits.
//!
//! Before a commit writes anything it appends a `Begin` record naming the
//! blob keys it is about to create; each later write appends what it
//! produced. A commit that ends in neither `Completed` nor a clean
//! `Compensated` record is *pending*: its process died or its compensation
//! failed, and [`crate::VersionEngine::sweep_orphans`] can clean it up.
//!
//! On-disk format, one frame per record:
//! ```text
//! [4 bytes: payload length (little-endian u32)]
//! [4 bytes: CRC32 of payload (little-endian u32)]
//! [N bytes: payload (bincode-serialized IntentRecord)]
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};
use uuid::Uuid;

use dddit_graph::VertexId;
use dddit_meta::DocumentId;
use dddit_types::VersionKey;

use crate::error::{EngineError, EngineResult};

/// Header size: 4 bytes length + 4 bytes CRC.
const HEADER_SIZE: usize = 8;

/// Identifier of one commit attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CommitId(Uuid);

impl CommitId {
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One step of a commit, as journaled.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntentRecord {
    Begin {
        commit: CommitId,
        version: VersionKey,
        blob_keys: Vec<String>,
    },
    MetadataWritten {
        commit: CommitId,
        document: DocumentId,
    },
    VertexCreated {
        commit: CommitId,
        vertex: VertexId,
    },
    Completed {
        commit: CommitId,
    },
    Compensated {
        commit: CommitId,
        clean: bool,
    },
}

impl IntentRecord {
    pub fn commit(&self) -> CommitId {
        match self {
            Self::Begin { commit, .. }
            | Self::MetadataWritten { commit, .. }
            | Self::VertexCreated { commit, .. }
            | Self::Completed { commit }
            | Self::Compensated { commit, .. } => *commit,
        }
    }
}

/// What a pending commit may have left behind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingIntent {
    pub commit: CommitId,
    pub version: VersionKey,
    pub blob_keys: Vec<String>,
    pub document: Option<DocumentId>,
    pub vertex: Option<VertexId>,
    /// A compensation ran but did not finish cleanly.
    pub dirty_compensation: bool,
}

struct JournalWriter {
    writer: BufWriter<File>,
    offset: u64,
}

/// Append-only, crash-recoverable intent log.
///
/// Frames are flushed and synced on every append. Recovery reads front to
/// back, skips frames whose CRC does not match, and stops at a torn tail.
pub struct IntentJournal {
    path: PathBuf,
    writer: Mutex<JournalWriter>,
}

fn journal_error(e: impl fmt::Display) -> EngineError {
    EngineError::unavailable("journal", e)
}

impl IntentJournal {
    /// Open (or create) the journal file at `path`.
    pub fn open(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(journal_error)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)
            .map_err(journal_error)?;
        file.lock_exclusive().map_err(journal_error)?;
        let file_len = file.metadata().map_err(journal_error)?.len();
        let (_, offset) = read_frames(File::open(&path).map_err(journal_error)?)
            .map_err(journal_error)?;
        if offset < file_len {
            // Appends must land right after the last whole frame.
            warn!(
                path = %path.display(),
                file_len,
                truncated_to = offset,
                "dropping torn journal tail"
            );
            file.set_len(offset).map_err(journal_error)?;
            file.sync_all().map_err(journal_error)?;
        }
        file.unlock().map_err(journal_error)?;
        Ok(Self {
            path,
            writer: Mutex::new(JournalWriter {
                writer: BufWriter::new(file),
                offset,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current end-of-log offset.
    pub fn offset(&self) -> u64 {
        self.writer.lock().expect("journal mutex poisoned").offset
    }

    /// Append a record. Returns the byte offset it was written at.
    pub fn append(&self, record: &IntentRecord) -> EngineResult<u64> {
        let payload = bincode::serialize(record).map_err(journal_error)?;
        let length = payload.len() as u32;
        let crc = crc32fast::hash(&payload);

        let mut w = self.writer.lock().expect("journal mutex poisoned");
        // Other processes may append to the same file between our writes.
        let write = |w: &mut JournalWriter| -> io::Result<u64> {
            w.writer.get_ref().lock_exclusive()?;
            let result = (|| -> io::Result<u64> {
                let at = w.writer.get_ref().metadata()?.len();
                w.writer.write_all(&length.to_le_bytes())?;
                w.writer.write_all(&crc.to_le_bytes())?;
                w.writer.write_all(&payload)?;
                w.writer.flush()?;
                w.writer.get_ref().sync_data()?;
                Ok(at)
            })();
            w.writer.get_ref().unlock()?;
            result
        };
        let entry_offset = write(&mut *w).map_err(journal_error)?;
        w.offset = entry_offset + HEADER_SIZE as u64 + payload.len() as u64;

        debug!(offset = entry_offset, commit = %record.commit(), "journal append");
        Ok(entry_offset)
    }

    /// Read every intact record, oldest first.
    pub fn records(&self) -> EngineResult<Vec<IntentRecord>> {
        let file = File::open(&self.path).map_err(journal_error)?;
        let (records, _) = read_frames(file).map_err(journal_error)?;
        Ok(records)
    }

    /// Commits that neither completed nor compensated cleanly.
    pub fn pending(&self) -> EngineResult<Vec<PendingIntent>> {
        Ok(fold_pending(self.records()?))
    }

    /// Rewrite the journal keeping only records of pending commits.
    ///
    /// Returns how many records were dropped.
    pub fn compact(&self) -> EngineResult<usize> {
        let mut w = self.writer.lock().expect("journal mutex poisoned");
        let file = File::open(&self.path).map_err(journal_error)?;
        let (records, _) = read_frames(file).map_err(journal_error)?;
        let live: Vec<CommitId> = fold_pending(records.clone())
            .into_iter()
            .map(|p| p.commit)
            .collect();
        let kept: Vec<&IntentRecord> = records
            .iter()
            .filter(|r| live.contains(&r.commit()))
            .collect();

        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir).map_err(journal_error)?;
        let mut written = 0u64;
        for record in &kept {
            let payload = bincode::serialize(record).map_err(journal_error)?;
            let frame = [
                (payload.len() as u32).to_le_bytes(),
                crc32fast::hash(&payload).to_le_bytes(),
            ]
            .concat();
            tmp.write_all(&frame).map_err(journal_error)?;
            tmp.write_all(&payload).map_err(journal_error)?;
            written += (HEADER_SIZE + payload.len()) as u64;
        }
        tmp.as_file().sync_all().map_err(journal_error)?;
        tmp.persist(&self.path).map_err(|e| journal_error(e.error))?;

        let file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(journal_error)?;
        w.writer = BufWriter::new(file);
        w.offset = written;

        let dropped = records.len() - kept.len();
        debug!(kept = kept.len(), dropped, "journal compacted");
        Ok(dropped)
    }
}

/// Decode every intact frame. Also returns the offset just past the last
/// whole frame, which is where a torn tail begins.
fn read_frames(file: File) -> io::Result<(Vec<IntentRecord>, u64)> {
    let file_len = file.metadata()?.len();
    let mut file = BufReader::new(file);
    let mut records = Vec::new();
    let mut offset: u64 = 0;

    while offset + HEADER_SIZE as u64 <= file_len {
        file.seek(SeekFrom::Start(offset))?;
        let mut header = [0u8; HEADER_SIZE];
        file.read_exact(&mut header)?;
        let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        let expected_crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

        if length == 0 || offset + HEADER_SIZE as u64 + length as u64 > file_len {
            warn!(offset, length, file_len, "torn journal tail; stopping recovery");
            break;
        }

        let mut payload = vec![0u8; length as usize];
        file.read_exact(&mut payload)?;
        offset += HEADER_SIZE as u64 + length as u64;

        let actual_crc = crc32fast::hash(&payload);
        if actual_crc != expected_crc {
            warn!(
                offset,
                expected = expected_crc,
                actual = actual_crc,
                "CRC mismatch; skipping record"
            );
            continue;
        }
        match bincode::deserialize::<IntentRecord>(&payload) {
            Ok(record) => records.push(record),
            Err(e) => warn!(offset, error = %e, "undecodable journal record; skipping"),
        }
    }
    Ok((records, offset))
}

fn fold_pending(records: Vec<IntentRecord>) -> Vec<PendingIntent> {
    let mut open: BTreeMap<CommitId, PendingIntent> = BTreeMap::new();
    for record in records {
        match record {
            IntentRecord::Begin {
                commit,
                version,
                blob_keys,
            } => {
                open.insert(
                    commit,
                    PendingIntent {
                        commit,
                        version,
                        blob_keys,
                        document: None,
                        vertex: None,
                        dirty_compensation: false,
                    },
                );
            }
            IntentRecord::MetadataWritten { commit, document } => {
                if let Some(p) = open.get_mut(&commit) {
                    p.document = Some(document);
                }
            }
            IntentRecord::VertexCreated { commit, vertex } => {
                if let Some(p) = open.get_mut(&commit) {
                    p.vertex = Some(vertex);
                }
            }
            IntentRecord::Completed { commit } => {
                open.remove(&commit);
            }
            IntentRecord::Compensated { commit, clean } => {
                if clean {
                    open.remove(&commit);
                } else if let Some(p) = open.get_mut(&commit) {
                    p.dirty_compensation = true;
                }
            }
        }
    }
    open.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn journal() -> (tempfile::TempDir, IntentJournal) {
        let dir = tempfile::tempdir().unwrap();
        let journal = IntentJournal::open(dir.path().join("intents.log")).unwrap();
        (dir, journal)
    }

    fn begin(commit: CommitId, version: &str) -> IntentRecord {
        IntentRecord::Begin {
            commit,
            version: VersionKey::new("game", "charA", "main", version),
            blob_keys: vec![format!("meshes/game/charA/main/{version}/a.fbx")],
        }
    }

    #[test]
    fn append_and_read_back() {
        let (_dir, journal) = journal();
        let commit = CommitId::generate();
        let first = journal.append(&begin(commit, "v1")).unwrap();
        let second = journal.append(&IntentRecord::Completed { commit }).unwrap();
        assert_eq!(first, 0);
        assert!(second > first);
        assert_eq!(journal.records().unwrap().len(), 2);
    }

    #[test]
    fn completed_and_clean_commits_are_not_pending() {
        let (_dir, journal) = journal();
        let done = CommitId::generate();
        let undone = CommitId::generate();
        let dirty = CommitId::generate();
        let crashed = CommitId::generate();

        journal.append(&begin(done, "v1")).unwrap();
        journal.append(&IntentRecord::Completed { commit: done }).unwrap();
        journal.append(&begin(undone, "v2")).unwrap();
        journal
            .append(&IntentRecord::Compensated { commit: undone, clean: true })
            .unwrap();
        journal.append(&begin(dirty, "v3")).unwrap();
        journal
            .append(&IntentRecord::Compensated { commit: dirty, clean: false })
            .unwrap();
        journal.append(&begin(crashed, "v4")).unwrap();
        let document = DocumentId::generate();
        journal
            .append(&IntentRecord::MetadataWritten {
                commit: crashed,
                document: document.clone(),
            })
            .unwrap();
        journal
            .append(&IntentRecord::VertexCreated {
                commit: crashed,
                vertex: VertexId(12),
            })
            .unwrap();

        let pending = journal.pending().unwrap();
        assert_eq!(pending.len(), 2);
        let dirty_intent = pending.iter().find(|p| p.commit == dirty).unwrap();
        assert!(dirty_intent.dirty_compensation);
        let crashed_intent = pending.iter().find(|p| p.commit == crashed).unwrap();
        assert_eq!(crashed_intent.document, Some(document));
        assert_eq!(crashed_intent.vertex, Some(VertexId(12)));
        assert_eq!(crashed_intent.version.version, "v4");
    }

    #[test]
    fn torn_tail_is_ignored() {
        let (dir, journal) = journal();
        let a = CommitId::generate();
        journal.append(&begin(a, "v1")).unwrap();
        journal.append(&begin(CommitId::generate(), "v2")).unwrap();
        let len = journal.offset();
        drop(journal);

        let path = dir.path().join("intents.log");
        OpenOptions::new()
            .write(true)
            .open(&path)
            .unwrap()
            .set_len(len - 3)
            .unwrap();

        let journal = IntentJournal::open(&path).unwrap();
        let records = journal.records().unwrap();
        assert_eq!(records, vec![begin(a, "v1")]);
    }

    #[test]
    fn appends_after_torn_tail_survive() {
        let (dir, journal) = journal();
        let a = CommitId::generate();
        journal.append(&begin(a, "v1")).unwrap();
        let intact = journal.offset();
        journal.append(&begin(CommitId::generate(), "v2")).unwrap();
        let len = journal.offset();
        drop(journal);

        let path = dir.path().join("intents.log");
        OpenOptions::new()
            .write(true)
            .open(&path)
            .unwrap()
            .set_len(len - 3)
            .unwrap();

        let journal = IntentJournal::open(&path).unwrap();
        assert_eq!(journal.offset(), intact);
        assert_eq!(fs::metadata(&path).unwrap().len(), intact);

        let c = CommitId::generate();
        journal.append(&begin(c, "v3")).unwrap();
        drop(journal);

        let journal = IntentJournal::open(&path).unwrap();
        assert_eq!(journal.records().unwrap(), vec![begin(a, "v1"), begin(c, "v3")]);
        assert!(journal.pending().unwrap().iter().any(|p| p.commit == c));
    }

    #[test]
    fn crc_mismatch_skips_record() {
        let (dir, journal) = journal();
        let a = CommitId::generate();
        let b = CommitId::generate();
        journal.append(&begin(a, "v1")).unwrap();
        journal.append(&begin(b, "v2")).unwrap();
        drop(journal);

        let path = dir.path().join("intents.log");
        {
            let mut file = OpenOptions::new().read(true).write(true).open(&path).unwrap();
            file.seek(SeekFrom::Start(HEADER_SIZE as u64)).unwrap();
            let mut byte = [0u8; 1];
            file.read_exact(&mut byte).unwrap();
            byte[0] ^= 0xFF;
            file.seek(SeekFrom::Start(HEADER_SIZE as u64)).unwrap();
            file.write_all(&byte).unwrap();
        }

        let journal = IntentJournal::open(&path).unwrap();
        assert_eq!(journal.records().unwrap(), vec![begin(b, "v2")]);
    }

    #[test]
    fn compact_keeps_only_pending() {
        let (_dir, journal) = journal();
        let done = CommitId::generate();
        let open = CommitId::generate();
        journal.append(&begin(done, "v1")).unwrap();
        journal.append(&IntentRecord::Completed { commit: done }).unwrap();
        journal.append(&begin(open, "v2")).unwrap();

        assert_eq!(journal.compact().unwrap(), 2);
        assert_eq!(journal.records().unwrap(), vec![begin(open, "v2")]);

        journal.append(&IntentRecord::Completed { commit: open }).unwrap();
        assert!(journal.pending().unwrap().is_empty());
        assert_eq!(journal.records().unwrap().len(), 2);
    }
}
