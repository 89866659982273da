use clerk_store::{KvStore, Page};
use tracing::{debug, warn};

use crate::error::LedgerError;
use crate::keys;

/// Replay protection: remembers every external sequence ever admitted.
///
/// Markers are permanent. There is no way to unmark a sequence, which is
/// what makes admission exactly-once for the life of the chain.
pub struct SequenceGuard<'a, S: KvStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: KvStore + ?Sized> SequenceGuard<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Mark `sequence` as admitted. Idempotent at the storage level.
    pub fn mark_used(&self, sequence: &str) -> Result<(), LedgerError> {
        validate_sequence(sequence)?;
        self.store
            .set(&keys::sequence_key(sequence), keys::SEQUENCE_MARKER)?;
        debug!(sequence, "sequence marked");
        Ok(())
    }

    pub fn is_used(&self, sequence: &str) -> Result<bool, LedgerError> {
        Ok(self.store.has(&keys::sequence_key(sequence))?)
    }

    /// Every marked sequence, in key order. Each call scans afresh.
    pub fn list_used(&self) -> Result<Vec<String>, LedgerError> {
        let entries = self.store.scan(&keys::sequence_range(), Page::ALL)?;
        Ok(entries
            .into_iter()
            .filter_map(|(key, _)| match keys::sequence_from_key(&key) {
                Some(sequence) => Some(sequence.to_string()),
                None => {
                    warn!(key = %keys::display_key(&key), "skipping unreadable sequence key");
                    None
                }
            })
            .collect())
    }
}

/// An empty sequence would collide with the bare index prefix.
pub(crate) fn validate_sequence(sequence: &str) -> Result<(), LedgerError> {
    if sequence.is_empty() {
        return Err(LedgerError::InvalidSequence(
            "sequence must not be empty".into(),
        ));
    }
    Ok(())
}
