use clerk_types::{EventRecord, RecordTime};

use crate::error::LedgerError;

/// Write boundary: the single admission operation.
///
/// Takes `&mut self` so that only one transition can be admitting at a
/// time. Ordering between transitions is the scheduler's job.
pub trait EventWriter {
    /// Admit `record` under replay key `sequence`, exactly once.
    fn admit(&mut self, record: &EventRecord, sequence: &str) -> Result<(), LedgerError>;
}

/// Read boundary for downstream consumers. Reads never mutate state.
pub trait EventReader: Send + Sync {
    fn get_record(&self, id: u64) -> Result<EventRecord, LedgerError>;

    fn has_record(&self, id: u64) -> Result<bool, LedgerError>;

    fn has_sequence(&self, sequence: &str) -> Result<bool, LedgerError>;

    /// At most 50 records per page, in id-key order.
    fn list_records(&self, page: u64, limit: u64) -> Result<Vec<EventRecord>, LedgerError>;

    /// Records with `from <= record_time < to`. `page == 0 && limit == 0`
    /// means the whole range.
    fn list_records_by_time(
        &self,
        from: &RecordTime,
        to: &RecordTime,
        page: u64,
        limit: u64,
    ) -> Result<Vec<EventRecord>, LedgerError>;

    fn list_sequences(&self) -> Result<Vec<String>, LedgerError>;

    fn all_records(&self) -> Result<Vec<EventRecord>, LedgerError>;
}
