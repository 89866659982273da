use std::collections::BTreeMap;
use std::sync::RwLock;

use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::{KeyRange, KvPair, KvStore, Page};

/// Write buffer over a parent store, one per state transition.
///
/// Reads see pending writes layered over the parent. Nothing reaches the
/// parent until [`commit`](Self::commit); dropping the buffer discards every
/// pending write. This is how a caller rolls back a transition in which a
/// ledger call failed halfway.
pub struct StagedKvStore<P: KvStore> {
    parent: P,
    pending: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl<P: KvStore> StagedKvStore<P> {
    pub fn new(parent: P) -> Self {
        Self {
            parent,
            pending: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of buffered writes.
    pub fn pending_len(&self) -> StoreResult<usize> {
        Ok(self
            .pending
            .read()
            .map_err(|_| StoreError::Poisoned("staged buffer"))?
            .len())
    }

    /// Apply every buffered write to the parent, in key order, as one batch.
    pub fn commit(self) -> StoreResult<P> {
        let pending = self
            .pending
            .into_inner()
            .map_err(|_| StoreError::Poisoned("staged buffer"))?;
        let batch: Vec<KvPair> = pending.into_iter().collect();
        debug!(writes = batch.len(), "committing staged writes");
        self.parent.write_batch(&batch)?;
        Ok(self.parent)
    }

    /// Drop every buffered write and hand back the untouched parent.
    pub fn discard(self) -> P {
        self.parent
    }
}

impl<P: KvStore> KvStore for StagedKvStore<P> {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        let pending = self
            .pending
            .read()
            .map_err(|_| StoreError::Poisoned("staged buffer"))?;
        match pending.get(key) {
            Some(value) => Ok(Some(value.clone())),
            None => self.parent.get(key),
        }
    }

    fn set(&self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        self.pending
            .write()
            .map_err(|_| StoreError::Poisoned("staged buffer"))?
            .insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn scan(&self, range: &KeyRange, page: Page) -> StoreResult<Vec<KvPair>> {
        if range.is_empty() {
            return Ok(Vec::new());
        }
        // The window can only be applied after merging; fetch enough of the
        // parent to cover it.
        let parent_page = Page {
            offset: 0,
            limit: page.limit.map(|l| l.saturating_add(page.offset)),
        };
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
            self.parent.scan(range, parent_page)?.into_iter().collect();

        let pending = self
            .pending
            .read()
            .map_err(|_| StoreError::Poisoned("staged buffer"))?;
        for (key, value) in pending.range::<[u8], _>(range.bounds()) {
            merged.insert(key.clone(), value.clone());
        }

        Ok(page.apply(merged.into_iter()).collect())
    }
}
