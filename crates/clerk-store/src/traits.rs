use std::ops::Bound;
use std::sync::Arc;

use crate::error::StoreResult;

/// A key and its value, as returned by scans.
pub type KvPair = (Vec<u8>, Vec<u8>);

/// Half-open key interval `[start, end)`. `end == None` means unbounded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyRange {
    pub start: Vec<u8>,
    pub end: Option<Vec<u8>>,
}

impl KeyRange {
    /// Every key that begins with `prefix`.
    pub fn prefix(prefix: &[u8]) -> Self {
        Self {
            start: prefix.to_vec(),
            end: prefix_end(prefix),
        }
    }

    /// Keys in `[start, end)`.
    pub fn between(start: impl Into<Vec<u8>>, end: impl Into<Vec<u8>>) -> Self {
        Self {
            start: start.into(),
            end: Some(end.into()),
        }
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        key >= self.start.as_slice() && self.end.as_deref().map_or(true, |end| key < end)
    }

    /// Borrowed bounds suitable for `BTreeMap::range`.
    pub fn bounds(&self) -> (Bound<&[u8]>, Bound<&[u8]>) {
        let end = match &self.end {
            Some(end) => Bound::Excluded(end.as_slice()),
            None => Bound::Unbounded,
        };
        (Bound::Included(self.start.as_slice()), end)
    }

    /// `true` when no key can fall inside the range.
    pub fn is_empty(&self) -> bool {
        matches!(&self.end, Some(end) if *end <= self.start)
    }
}

/// Smallest key strictly greater than every key starting with `prefix`.
///
/// Returns `None` when the prefix is empty or all `0xff`, in which case the
/// range is unbounded above.
pub fn prefix_end(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < u8::MAX {
            end.push(last + 1);
            return Some(end);
        }
    }
    None
}

/// Window over a scan: skip `offset` entries, then yield at most `limit`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Page {
    pub offset: usize,
    pub limit: Option<usize>,
}

impl Page {
    /// The whole range.
    pub const ALL: Self = Self {
        offset: 0,
        limit: None,
    };

    pub fn window(offset: usize, limit: usize) -> Self {
        Self {
            offset,
            limit: Some(limit),
        }
    }

    /// Apply the window to an ordered iterator.
    pub fn apply<I: Iterator>(self, iter: I) -> impl Iterator<Item = I::Item> {
        iter.skip(self.offset).take(self.limit.unwrap_or(usize::MAX))
    }
}

/// Ordered, byte-keyed store.
///
/// All implementations must satisfy these invariants:
/// - Keys iterate in lexicographic byte order.
/// - A scan reflects every `set` that returned before the scan started.
/// - There is no delete: the ledger built on top is append-only.
/// - All I/O errors are propagated, never silently ignored.
pub trait KvStore: Send + Sync {
    /// Read the value under `key`, or `Ok(None)` if absent.
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>>;

    /// Write `value` under `key`, replacing any previous value.
    fn set(&self, key: &[u8], value: &[u8]) -> StoreResult<()>;

    /// Entries in `range`, in key order, windowed by `page`.
    fn scan(&self, range: &KeyRange, page: Page) -> StoreResult<Vec<KvPair>>;

    /// Check whether `key` is present.
    fn has(&self, key: &[u8]) -> StoreResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Write several entries.
    ///
    /// Default implementation calls `set()` for each entry. Backends may
    /// override to flush once for the whole batch.
    fn write_batch(&self, entries: &[KvPair]) -> StoreResult<()> {
        entries.iter().try_for_each(|(k, v)| self.set(k, v))
    }
}

impl<T: KvStore + ?Sized> KvStore for &T {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn set(&self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        (**self).set(key, value)
    }

    fn scan(&self, range: &KeyRange, page: Page) -> StoreResult<Vec<KvPair>> {
        (**self).scan(range, page)
    }

    fn has(&self, key: &[u8]) -> StoreResult<bool> {
        (**self).has(key)
    }

    fn write_batch(&self, entries: &[KvPair]) -> StoreResult<()> {
        (**self).write_batch(entries)
    }
}

impl<T: KvStore + ?Sized> KvStore for Arc<T> {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn set(&self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        (**self).set(key, value)
    }

    fn scan(&self, range: &KeyRange, page: Page) -> StoreResult<Vec<KvPair>> {
        (**self).scan(range, page)
    }

    fn has(&self, key: &[u8]) -> StoreResult<bool> {
        (**self).has(key)
    }

    fn write_batch(&self, entries: &[KvPair]) -> StoreResult<()> {
        (**self).write_batch(entries)
    }
}
