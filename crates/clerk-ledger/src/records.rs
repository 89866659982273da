use std::ops::ControlFlow;

use clerk_store::{KeyRange, KvPair, KvStore, Page};
use clerk_types::{EventRecord, RecordTime};
use tracing::{debug, warn};

use crate::error::LedgerError;
use crate::keys;

/// Hard cap on records returned by one paginated query.
pub const MAX_PAGE_LIMIT: u64 = 50;

/// Records fetched per round trip by full iteration.
const ITERATION_CHUNK: usize = 256;

/// Admitted records under two indexes: by id and by record time.
///
/// Both index entries carry the full encoded record, so either index can
/// answer queries on its own.
pub struct RecordStore<'a, S: KvStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: KvStore + ?Sized> RecordStore<'a, S> {
    /// View the record indexes of `store`.
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Store a new record under both indexes.
    ///
    /// Fails with [`LedgerError::AlreadyExists`] if either index already
    /// holds an entry for it; nothing is written in that case.
    pub fn put(&self, record: &EventRecord) -> Result<(), LedgerError> {
        let id_key = keys::record_key(record.id);
        let time_key = keys::time_key(record.id, &record.record_time);

        if self.store.has(&id_key)? || self.store.has(&time_key)? {
            return Err(LedgerError::AlreadyExists { id: record.id });
        }

        let value = encode(record)?;
        self.store.set(&id_key, &value)?;
        self.store.set(&time_key, &value)?;

        debug!(id = record.id, record_time = %record.record_time, "event record stored");
        Ok(())
    }

    /// Read record `id` from the id index.
    pub fn get(&self, id: u64) -> Result<EventRecord, LedgerError> {
        let key = keys::record_key(id);
        let value = self.store.get(&key)?.ok_or(LedgerError::NotFound { id })?;
        decode(&value).map_err(|reason| LedgerError::Corrupt {
            key: keys::display_key(&key),
            reason,
        })
    }

    /// Check the id index for record `id`.
    pub fn exists(&self, id: u64) -> Result<bool, LedgerError> {
        Ok(self.store.has(&keys::record_key(id))?)
    }

    /// One page of the id index, in key order.
    ///
    /// `page` is 1-indexed and `limit` is clamped to [`MAX_PAGE_LIMIT`].
    /// Page 0 or limit 0 selects nothing.
    pub fn list_paged(&self, page: u64, limit: u64) -> Result<Vec<EventRecord>, LedgerError> {
        let Some(window) = page_window(page, limit) else {
            return Ok(Vec::new());
        };
        let entries = self.store.scan(&keys::record_range(), window)?;
        Ok(decode_entries(entries))
    }

    /// Records with `from <= record_time < to`, ascending by time.
    ///
    /// With `page == 0 && limit == 0` the whole range is returned unclamped;
    /// otherwise pagination works as in [`list_paged`](Self::list_paged).
    pub fn list_by_time_range(
        &self,
        from: &RecordTime,
        to: &RecordTime,
        page: u64,
        limit: u64,
    ) -> Result<Vec<EventRecord>, LedgerError> {
        let window = if page == 0 && limit == 0 {
            Page::ALL
        } else {
            match page_window(page, limit) {
                Some(window) => window,
                None => return Ok(Vec::new()),
            }
        };
        let entries = self.store.scan(&keys::time_range(from, to), window)?;
        Ok(decode_entries(entries))
    }

    /// Every readable record, in id-key order.
    pub fn all_records(&self) -> Result<Vec<EventRecord>, LedgerError> {
        let mut records = Vec::new();
        self.for_each_record(|record| {
            records.push(record);
            ControlFlow::Continue(())
        })?;
        Ok(records)
    }

    /// Visit records in id-key order until `f` breaks.
    pub fn for_each_record<F>(&self, mut f: F) -> Result<(), LedgerError>
    where
        F: FnMut(EventRecord) -> ControlFlow<()>,
    {
        let mut range = keys::record_range();
        loop {
            let chunk = self
                .store
                .scan(&range, Page::window(0, ITERATION_CHUNK))?;
            let exhausted = chunk.len() < ITERATION_CHUNK;
            let Some(last_key) = chunk.last().map(|(k, _)| k.clone()) else {
                return Ok(());
            };

            for record in decode_entries(chunk) {
                if f(record).is_break() {
                    return Ok(());
                }
            }

            if exhausted {
                return Ok(());
            }
            range = KeyRange {
                start: successor(last_key),
                end: range.end,
            };
        }
    }
}

/// Clamp and convert a 1-indexed page request into a scan window.
///
/// Returns `None` when the request cannot select anything.
fn page_window(page: u64, limit: u64) -> Option<Page> {
    let limit = limit.min(MAX_PAGE_LIMIT);
    if page == 0 || limit == 0 {
        return None;
    }
    let offset = (page - 1).checked_mul(limit)?;
    let offset = usize::try_from(offset).ok()?;
    Some(Page::window(offset, limit as usize))
}

/// Smallest key strictly greater than `key`.
fn successor(mut key: Vec<u8>) -> Vec<u8> {
    key.push(0);
    key
}

fn encode(record: &EventRecord) -> Result<Vec<u8>, LedgerError> {
    bincode::serialize(record).map_err(|e| LedgerError::Serialization(e.to_string()))
}

fn decode(value: &[u8]) -> Result<EventRecord, String> {
    bincode::deserialize(value).map_err(|e| e.to_string())
}

/// Decode scanned entries, dropping any that cannot be read. A single bad
/// entry must not hide the rest of the range.
fn decode_entries(entries: Vec<KvPair>) -> Vec<EventRecord> {
    entries
        .into_iter()
        .filter_map(|(key, value)| match decode(&value) {
            Ok(record) => Some(record),
            Err(reason) => {
                warn!(key = %keys::display_key(&key), %reason, "skipping unreadable event record");
                None
            }
        })
        .collect()
}
