use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{StoreError, StoreResult};
use crate::traits::{KeyRange, KvPair, KvStore, Page};

/// In-memory, `BTreeMap`-based ordered store.
///
/// Intended for tests and embedding. Entries live behind a `RwLock`, so
/// concurrent readers never block each other.
pub struct InMemoryKvStore {
    entries: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl InMemoryKvStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.read()?.len())
    }

    /// Returns `true` if the store holds no keys.
    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.read()?.is_empty())
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, BTreeMap<Vec<u8>, Vec<u8>>>> {
        self.entries
            .read()
            .map_err(|_| StoreError::Poisoned("in-memory store"))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, BTreeMap<Vec<u8>, Vec<u8>>>> {
        self.entries
            .write()
            .map_err(|_| StoreError::Poisoned("in-memory store"))
    }
}

impl Default for InMemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KvStore for InMemoryKvStore {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.read()?.get(key).cloned())
    }

    fn set(&self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        self.write()?.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn scan(&self, range: &KeyRange, page: Page) -> StoreResult<Vec<KvPair>> {
        let map = self.read()?;
        Ok(scan_map(&map, range, page))
    }

    fn has(&self, key: &[u8]) -> StoreResult<bool> {
        Ok(self.read()?.contains_key(key))
    }

    fn write_batch(&self, entries: &[KvPair]) -> StoreResult<()> {
        let mut map = self.write()?;
        for (key, value) in entries {
            map.insert(key.clone(), value.clone());
        }
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.entries.read().map(|m| m.len()).ok();
        f.debug_struct("InMemoryKvStore")
            .field("key_count", &count)
            .finish()
    }
}

/// Windowed range scan over an ordered map. Shared by every backend that
/// keeps its index in a `BTreeMap`.
pub(crate) fn scan_map(
    map: &BTreeMap<Vec<u8>, Vec<u8>>,
    range: &KeyRange,
    page: Page,
) -> Vec<KvPair> {
    if range.is_empty() {
        return Vec::new();
    }
    page.apply(map.range::<[u8], _>(range.bounds()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}
