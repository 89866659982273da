use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock, RwLockReadGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::memory::scan_map;
use crate::traits::{KeyRange, KvPair, KvStore, Page};

/// A single journaled key write.
///
/// Every `set` or `write_batch` call becomes one frame, so a batch is
/// recovered whole or not at all.
///
/// On-disk frame format:
/// ```text
/// [4 bytes: payload length (little-endian u32)]
/// [4 bytes: CRC32 of payload (little-endian u32)]
/// [N bytes: payload (bincode-serialized Vec<JournalEntry>)]
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// Flush/sync strategy for the journal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// `fsync` after every write call (safest, highest latency).
    EveryWrite,
    /// Flush to the OS page cache only.
    #[default]
    OsDefault,
}

/// Configuration for a [`JournalKvStore`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JournalConfig {
    pub sync_mode: SyncMode,
}

/// What recovery found when the journal was opened.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Frames applied to the index. A batch counts once.
    pub applied: usize,
    /// Frames skipped because of a CRC mismatch or undecodable payload.
    pub skipped: usize,
    /// Bytes of incomplete trailing frame cut off the end of the file.
    pub truncated_bytes: u64,
}

/// Header size: 4 bytes length + 4 bytes CRC.
const HEADER_SIZE: usize = 8;

struct JournalWriter {
    writer: BufWriter<File>,
    offset: u64,
}

/// Crash-recoverable ordered store.
///
/// Every `set` is appended to a journal file, framed with a length prefix and
/// a CRC32 checksum, and then applied to an in-memory `BTreeMap` index. On
/// open, the journal is replayed front-to-back to rebuild the index. Frames
/// that fail the CRC check are skipped; an incomplete trailing frame (a torn
/// write from a crash) is truncated so later appends stay aligned.
pub struct JournalKvStore {
    path: PathBuf,
    writer: Mutex<JournalWriter>,
    index: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
    config: JournalConfig,
    recovery: RecoveryReport,
}

impl JournalKvStore {
    /// Open (or create) a journal at `path` and replay it.
    pub fn open(path: &Path, config: JournalConfig) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;

        let (index, valid_len, mut recovery) = recover(path)?;
        let file_len = file.metadata()?.len();
        if valid_len < file_len {
            warn!(
                path = %path.display(),
                valid_len,
                file_len,
                "truncating incomplete journal tail"
            );
            file.set_len(valid_len)?;
            recovery.truncated_bytes = file_len - valid_len;
        }

        info!(
            path = %path.display(),
            keys = index.len(),
            applied = recovery.applied,
            skipped = recovery.skipped,
            "journal opened"
        );

        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(JournalWriter {
                writer: BufWriter::new(file),
                offset: valid_len,
            }),
            index: RwLock::new(index),
            config,
            recovery,
        })
    }

    /// Path to the journal file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current end of the journal in bytes.
    pub fn offset(&self) -> StoreResult<u64> {
        Ok(self
            .writer
            .lock()
            .map_err(|_| StoreError::Poisoned("journal writer"))?
            .offset)
    }

    /// Outcome of the replay performed by [`open`](Self::open).
    pub fn recovery_report(&self) -> &RecoveryReport {
        &self.recovery
    }

    /// Number of distinct keys in the index.
    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.read_index()?.len())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.read_index()?.is_empty())
    }

    fn read_index(&self) -> StoreResult<RwLockReadGuard<'_, BTreeMap<Vec<u8>, Vec<u8>>>> {
        self.index
            .read()
            .map_err(|_| StoreError::Poisoned("journal index"))
    }

    /// Append `entries` as one frame, flush, then publish them to the index.
    fn append(&self, entries: &[KvPair]) -> StoreResult<()> {
        let batch: Vec<JournalEntry> = entries
            .iter()
            .map(|(key, value)| JournalEntry {
                key: key.clone(),
                value: value.clone(),
            })
            .collect();
        let payload =
            bincode::serialize(&batch).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let length = u32::try_from(payload.len()).map_err(|_| {
            StoreError::Serialization(format!("journal frame too large: {} bytes", payload.len()))
        })?;
        let crc = crc32fast::hash(&payload);

        let mut w = self
            .writer
            .lock()
            .map_err(|_| StoreError::Poisoned("journal writer"))?;
        let start = w.offset;

        w.writer.write_all(&length.to_le_bytes())?;
        w.writer.write_all(&crc.to_le_bytes())?;
        w.writer.write_all(&payload)?;
        w.writer.flush()?;
        w.offset += (HEADER_SIZE + payload.len()) as u64;

        if matches!(self.config.sync_mode, SyncMode::EveryWrite) {
            w.writer.get_ref().sync_all()?;
        }

        // Publish while still holding the writer so index order matches
        // journal order.
        let mut index = self
            .index
            .write()
            .map_err(|_| StoreError::Poisoned("journal index"))?;
        for (key, value) in entries {
            index.insert(key.clone(), value.clone());
        }

        debug!(offset = start, entries = entries.len(), "journal append");
        Ok(())
    }
}

impl KvStore for JournalKvStore {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.read_index()?.get(key).cloned())
    }

    fn set(&self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        self.append(&[(key.to_vec(), value.to_vec())])
    }

    fn scan(&self, range: &KeyRange, page: Page) -> StoreResult<Vec<KvPair>> {
        let index = self.read_index()?;
        Ok(scan_map(&index, range, page))
    }

    fn has(&self, key: &[u8]) -> StoreResult<bool> {
        Ok(self.read_index()?.contains_key(key))
    }

    fn write_batch(&self, entries: &[KvPair]) -> StoreResult<()> {
        if entries.is_empty() {
            return Ok(());
        }
        self.append(entries)
    }
}

impl std::fmt::Debug for JournalKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JournalKvStore")
            .field("path", &self.path)
            .field("sync_mode", &self.config.sync_mode)
            .finish()
    }
}

/// Replay the journal into a fresh index.
///
/// Returns the index, the length of the valid prefix of the file, and a
/// report of applied and skipped frames.
fn recover(path: &Path) -> StoreResult<(BTreeMap<Vec<u8>, Vec<u8>>, u64, RecoveryReport)> {
    let mut file = BufReader::new(File::open(path)?);
    let file_len = file.get_ref().metadata()?.len();
    let mut index = BTreeMap::new();
    let mut report = RecoveryReport::default();
    let mut offset: u64 = 0;

    while offset + HEADER_SIZE as u64 <= file_len {
        file.seek(SeekFrom::Start(offset))?;

        let mut header = [0u8; HEADER_SIZE];
        match file.read_exact(&mut header) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e.into()),
        }

        let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        let expected_crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

        if length == 0 || offset + HEADER_SIZE as u64 + u64::from(length) > file_len {
            warn!(offset, length, file_len, "invalid journal frame length; stopping recovery");
            break;
        }

        let mut payload = vec![0u8; length as usize];
        match file.read_exact(&mut payload) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                warn!(offset, "truncated journal frame; stopping recovery");
                break;
            }
            Err(e) => return Err(e.into()),
        }

        let next = offset + HEADER_SIZE as u64 + u64::from(length);

        let actual_crc = crc32fast::hash(&payload);
        if actual_crc != expected_crc {
            warn!(
                offset,
                expected = expected_crc,
                actual = actual_crc,
                "CRC mismatch; skipping journal frame"
            );
            report.skipped += 1;
            offset = next;
            continue;
        }

        match bincode::deserialize::<Vec<JournalEntry>>(&payload) {
            Ok(batch) => {
                for entry in batch {
                    index.insert(entry.key, entry.value);
                }
                report.applied += 1;
            }
            Err(e) => {
                warn!(offset, error = %e, "failed to decode journal frame; skipping");
                report.skipped += 1;
            }
        }

        offset = next;
    }

    debug!(applied = report.applied, skipped = report.skipped, "journal recovery complete");
    Ok((index, offset, report))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(path: &Path) -> JournalKvStore {
        JournalKvStore::open(path, JournalConfig::default()).unwrap()
    }

    #[test]
    fn writes_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.journal");

        let store = open(&path);
        store.set(b"a", b"1").unwrap();
        store.set(b"b", b"2").unwrap();
        store.set(b"a", b"3").unwrap();
        drop(store);

        let store = open(&path);
        assert_eq!(store.get(b"a").unwrap(), Some(b"3".to_vec()));
        assert_eq!(store.get(b"b").unwrap(), Some(b"2".to_vec()));
        assert_eq!(store.len().unwrap(), 2);
        assert_eq!(store.recovery_report().applied, 3);
    }

    #[test]
    fn empty_journal_opens_clean() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(&dir.path().join("empty.journal"));
        assert!(store.is_empty().unwrap());
        assert_eq!(store.offset().unwrap(), 0);
        assert_eq!(*store.recovery_report(), RecoveryReport::default());
    }

    #[test]
    fn creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("j.journal");
        let store = open(&path);
        store.set(b"k", b"v").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn crc_mismatch_skips_only_the_damaged_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.journal");

        let store = open(&path);
        store.set(b"first", b"1").unwrap();
        store.set(b"second", b"2").unwrap();
        drop(store);

        {
            let mut file = OpenOptions::new().read(true).write(true).open(&path).unwrap();
            file.seek(SeekFrom::Start(HEADER_SIZE as u64)).unwrap();
            let mut buf = [0u8; 1];
            file.read_exact(&mut buf).unwrap();
            buf[0] ^= 0xFF;
            file.seek(SeekFrom::Start(HEADER_SIZE as u64)).unwrap();
            file.write_all(&buf).unwrap();
            file.sync_all().unwrap();
        }

        let store = open(&path);
        assert_eq!(store.get(b"first").unwrap(), None);
        assert_eq!(store.get(b"second").unwrap(), Some(b"2".to_vec()));
        assert_eq!(store.recovery_report().skipped, 1);
        assert_eq!(store.recovery_report().applied, 1);
    }

    #[test]
    fn torn_tail_is_truncated_and_appends_stay_readable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tail.journal");

        let store = open(&path);
        store.set(b"a", b"1").unwrap();
        store.set(b"b", b"2").unwrap();
        let total = store.offset().unwrap();
        drop(store);

        {
            let file = OpenOptions::new().write(true).open(&path).unwrap();
            file.set_len(total - 3).unwrap();
        }

        let store = open(&path);
        assert_eq!(store.get(b"a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(store.get(b"b").unwrap(), None);
        assert!(store.recovery_report().truncated_bytes > 0);

        store.set(b"c", b"3").unwrap();
        drop(store);

        let store = open(&path);
        assert_eq!(store.get(b"a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(store.get(b"c").unwrap(), Some(b"3".to_vec()));
        assert_eq!(store.recovery_report().truncated_bytes, 0);
    }

    #[test]
    fn batch_is_one_flush_and_fully_visible() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batch.journal");
        let store = JournalKvStore::open(
            &path,
            JournalConfig {
                sync_mode: SyncMode::EveryWrite,
            },
        )
        .unwrap();

        store
            .write_batch(&[
                (b"x1".to_vec(), b"a".to_vec()),
                (b"x2".to_vec(), b"b".to_vec()),
                (b"y1".to_vec(), b"c".to_vec()),
            ])
            .unwrap();

        let scanned = store.scan(&KeyRange::prefix(b"x"), Page::ALL).unwrap();
        assert_eq!(scanned.len(), 2);
        drop(store);

        let store = open(&path);
        assert_eq!(store.len().unwrap(), 3);
    }

    #[test]
    fn torn_batch_is_dropped_whole() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("torn-batch.journal");

        let store = open(&path);
        store.set(b"before", b"0").unwrap();
        store
            .write_batch(&[
                (b"\x11100".to_vec(), b"record".to_vec()),
                (b"\x13time100".to_vec(), b"record".to_vec()),
                (b"\x12seq".to_vec(), b"\x01".to_vec()),
            ])
            .unwrap();
        let total = store.offset().unwrap();
        drop(store);

        {
            let file = OpenOptions::new().write(true).open(&path).unwrap();
            file.set_len(total - 2).unwrap();
        }

        let store = open(&path);
        assert_eq!(store.get(b"before").unwrap(), Some(b"0".to_vec()));
        assert!(!store.has(b"\x11100").unwrap());
        assert!(!store.has(b"\x13time100").unwrap());
        assert!(!store.has(b"\x12seq").unwrap());
        assert_eq!(store.len().unwrap(), 1);
        assert!(store.recovery_report().truncated_bytes > 0);
    }

    #[test]
    fn batch_is_one_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frames.journal");

        let store = open(&path);
        store
            .write_batch(&[
                (b"a".to_vec(), b"1".to_vec()),
                (b"b".to_vec(), b"2".to_vec()),
            ])
            .unwrap();
        drop(store);

        let store = open(&path);
        assert_eq!(store.recovery_report().applied, 1);
        assert_eq!(store.len().unwrap(), 2);
    }

    #[test]
    fn offsets_grow_with_each_write() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(&dir.path().join("offsets.journal"));
        let a = store.offset().unwrap();
        store.set(b"k1", b"v").unwrap();
        let b = store.offset().unwrap();
        store.set(b"k2", b"v").unwrap();
        let c = store.offset().unwrap();
        assert_eq!(a, 0);
        assert!(b > a);
        assert!(c > b);
    }
}
