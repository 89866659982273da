use clerk_store::KvStore;
use clerk_types::{EventRecord, RecordTime, SequenceId};
use tracing::{debug, error, info};

use crate::config::LedgerConfig;
use crate::error::LedgerError;
use crate::records::RecordStore;
use crate::sequence::{validate_sequence, SequenceGuard};
use crate::traits::{EventReader, EventWriter};

/// Exactly-once event ledger over an ordered key-value store.
///
/// Admission is a check-then-write with no lock of its own: it is only safe
/// because `admit` takes `&mut self`, so no other admission can interleave
/// between the sequence check and the writes. Callers that need a failed
/// transition to leave no trace run the ledger over a
/// [`StagedKvStore`](clerk_store::StagedKvStore) and commit only on success.
pub struct EventLedger<S: KvStore> {
    store: S,
    config: LedgerConfig,
}

impl<S: KvStore> EventLedger<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, LedgerConfig::default())
    }

    pub fn with_config(store: S, config: LedgerConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Give back the underlying store, e.g. to commit a staged transition.
    pub fn into_store(self) -> S {
        self.store
    }

    /// Sequence id for the log at `log_index` in `block_number`, using the
    /// configured log index unit.
    pub fn sequence_for(&self, block_number: u64, log_index: u64) -> SequenceId {
        SequenceId::from_log_position(block_number, log_index, self.config.log_index_unit)
    }

    pub(crate) fn sequences(&self) -> SequenceGuard<'_, S> {
        SequenceGuard::new(&self.store)
    }

    pub(crate) fn records(&self) -> RecordStore<'_, S> {
        RecordStore::new(&self.store)
    }
}

impl<S: KvStore> EventWriter for EventLedger<S> {
    fn admit(&mut self, record: &EventRecord, sequence: &str) -> Result<(), LedgerError> {
        validate_sequence(sequence)?;

        let guard = self.sequences();
        if guard.is_used(sequence)? {
            debug!(id = record.id, sequence, "rejecting replayed event");
            return Err(LedgerError::DuplicateEvent {
                sequence: sequence.to_string(),
            });
        }

        // The guard is only marked after the record lands, so a failed put
        // leaves the sequence free.
        if let Err(err) = self.records().put(record) {
            if matches!(err, LedgerError::AlreadyExists { .. }) {
                error!(
                    id = record.id,
                    sequence,
                    "event id already stored under a fresh sequence"
                );
            }
            return Err(err);
        }
        guard.mark_used(sequence)?;

        info!(id = record.id, sequence, contract = %record.contract, "event admitted");
        Ok(())
    }
}

impl<S: KvStore> EventReader for EventLedger<S> {
    fn get_record(&self, id: u64) -> Result<EventRecord, LedgerError> {
        self.records().get(id)
    }

    fn has_record(&self, id: u64) -> Result<bool, LedgerError> {
        self.records().exists(id)
    }

    fn has_sequence(&self, sequence: &str) -> Result<bool, LedgerError> {
        self.sequences().is_used(sequence)
    }

    fn list_records(&self, page: u64, limit: u64) -> Result<Vec<EventRecord>, LedgerError> {
        self.records().list_paged(page, limit)
    }

    fn list_records_by_time(
        &self,
        from: &RecordTime,
        to: &RecordTime,
        page: u64,
        limit: u64,
    ) -> Result<Vec<EventRecord>, LedgerError> {
        self.records().list_by_time_range(from, to, page, limit)
    }

    fn list_sequences(&self) -> Result<Vec<String>, LedgerError> {
        self.sequences().list_used()
    }

    fn all_records(&self) -> Result<Vec<EventRecord>, LedgerError> {
        self.records().all_records()
    }
}

impl<S: KvStore + std::fmt::Debug> std::fmt::Debug for EventLedger<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLedger")
            .field("store", &self.store)
            .field("log_index_unit", &self.config.log_index_unit)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::MAX_PAGE_LIMIT;
    use clerk_store::{InMemoryKvStore, JournalConfig, JournalKvStore, StagedKvStore};

    fn at(secs: i64) -> RecordTime {
        RecordTime::from_unix(secs, 0).unwrap()
    }

    fn record(id: u64) -> EventRecord {
        let data = format!("payload-{id}").into_bytes();
        EventRecord::new(id, "0xstatesender", data, at(1_000 + id as i64))
    }

    fn ledger() -> EventLedger<InMemoryKvStore> {
        EventLedger::new(InMemoryKvStore::new())
    }

    #[test]
    fn replayed_sequence_is_duplicate() {
        let mut ledger = ledger();
        ledger.admit(&record(100), "500000000000").unwrap();

        let err = ledger.admit(&record(101), "500000000000").unwrap_err();
        assert!(err.is_duplicate());
        assert!(!ledger.has_record(101).unwrap());
        assert!(ledger.has_record(100).unwrap());
    }

    #[test]
    fn id_collision_leaves_sequence_unmarked() {
        let mut ledger = ledger();
        ledger.admit(&record(200), "A").unwrap();

        let err = ledger.admit(&record(200), "B").unwrap_err();
        assert!(matches!(err, LedgerError::AlreadyExists { id: 200 }));
        assert!(!ledger.has_sequence("B").unwrap());
        assert!(ledger.has_sequence("A").unwrap());
    }

    #[test]
    fn list_records_caps_at_fifty() {
        let mut ledger = ledger();
        for id in 1..=75 {
            ledger.admit(&record(id), &id.to_string()).unwrap();
        }
        let page = ledger.list_records(1, 1000).unwrap();
        assert_eq!(page.len(), MAX_PAGE_LIMIT as usize);
    }

    #[test]
    fn admitted_record_is_readable_verbatim() {
        let mut ledger = ledger();
        let r = record(7).with_chain_id("137");
        ledger.admit(&r, "1").unwrap();
        assert_eq!(ledger.get_record(7).unwrap(), r);
        assert!(ledger.has_sequence("1").unwrap());
    }

    #[test]
    fn duplicate_does_not_write() {
        let mut ledger = ledger();
        ledger.admit(&record(1), "s").unwrap();
        let before = ledger.store().len().unwrap();
        let _ = ledger.admit(&record(2), "s");
        assert_eq!(ledger.store().len().unwrap(), before);
    }

    #[test]
    fn empty_sequence_rejected_before_any_write() {
        let mut ledger = ledger();
        let err = ledger.admit(&record(1), "").unwrap_err();
        assert!(matches!(err, LedgerError::InvalidSequence(_)));
        assert!(ledger.store().is_empty().unwrap());
    }

    #[test]
    fn each_sequence_admits_exactly_once() {
        let mut ledger = ledger();
        let mut admitted = 0;
        for attempt in 0..5u64 {
            for seq in ["10", "20", "30"] {
                let id = attempt * 100 + seq.parse::<u64>().unwrap();
                if ledger.admit(&record(id), seq).is_ok() {
                    admitted += 1;
                }
            }
        }
        assert_eq!(admitted, 3);
        assert_eq!(ledger.list_sequences().unwrap(), vec!["10", "20", "30"]);
        assert_eq!(ledger.all_records().unwrap().len(), 3);
    }

    #[test]
    fn time_queries_pass_through() {
        let mut ledger = ledger();
        for id in 1..=10 {
            ledger.admit(&record(id), &format!("seq-{id}")).unwrap();
        }
        let window = ledger
            .list_records_by_time(&at(1_003), &at(1_006), 0, 0)
            .unwrap();
        let ids: Vec<u64> = window.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3, 4, 5]);
    }

    #[test]
    fn sequence_for_uses_configured_unit() {
        let mut config = LedgerConfig::default();
        config.log_index_unit = 1_000;
        let ledger = EventLedger::with_config(InMemoryKvStore::new(), config);
        assert_eq!(ledger.sequence_for(5, 7).as_str(), "5007");
        assert_eq!(
            EventLedger::new(InMemoryKvStore::new()).sequence_for(5_000_000, 0).as_str(),
            "500000000000"
        );
    }

    #[test]
    fn staged_transition_rolls_back_failed_admission() {
        let base = InMemoryKvStore::new();
        {
            let mut ledger = EventLedger::new(&base);
            ledger.admit(&record(1), "first").unwrap();
        }

        // A transition that admits one event and then hits a collision is
        // discarded as a whole.
        let mut staged = EventLedger::new(StagedKvStore::new(&base));
        staged.admit(&record(2), "second").unwrap();
        assert!(staged.admit(&record(1), "third").is_err());
        staged.into_store().discard();

        let ledger = EventLedger::new(&base);
        assert!(!ledger.has_record(2).unwrap());
        assert!(!ledger.has_sequence("second").unwrap());

        // A clean transition commits.
        let mut staged = EventLedger::new(StagedKvStore::new(&base));
        staged.admit(&record(2), "second").unwrap();
        staged.into_store().commit().unwrap();
        assert!(ledger.has_record(2).unwrap());
        assert!(ledger.has_sequence("second").unwrap());
    }

    #[test]
    fn journal_backed_ledger_keeps_replay_protection_across_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clerk.journal");

        {
            let store = JournalKvStore::open(&path, JournalConfig::default()).unwrap();
            let mut ledger = EventLedger::new(store);
            ledger.admit(&record(42), "4200000").unwrap();
        }

        let store = JournalKvStore::open(&path, JournalConfig::default()).unwrap();
        let mut ledger = EventLedger::new(store);
        assert_eq!(ledger.get_record(42).unwrap(), record(42));
        let err = ledger.admit(&record(43), "4200000").unwrap_err();
        assert!(err.is_duplicate());
    }
}
