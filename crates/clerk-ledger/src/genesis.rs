use std::collections::HashSet;

use clerk_store::KvStore;
use clerk_types::EventRecord;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::LedgerError;
use crate::service::EventLedger;
use crate::traits::EventReader;

/// Full ledger contents, as carried in a chain genesis file.
///
/// Records and sequences are independent lists: a genesis exported from a
/// live chain pairs them only implicitly.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisState {
    #[serde(default)]
    pub event_records: Vec<EventRecord>,
    #[serde(default)]
    pub record_sequences: Vec<String>,
}

impl GenesisState {
    pub fn new(event_records: Vec<EventRecord>, record_sequences: Vec<String>) -> Self {
        Self {
            event_records,
            record_sequences,
        }
    }

    /// Reject states that could not have come from a valid ledger.
    pub fn validate(&self) -> Result<(), LedgerError> {
        let mut ids = HashSet::with_capacity(self.event_records.len());
        for record in &self.event_records {
            if !ids.insert(record.id) {
                return Err(LedgerError::InvalidGenesis(format!(
                    "duplicate event record id {}",
                    record.id
                )));
            }
        }

        let mut sequences = HashSet::with_capacity(self.record_sequences.len());
        for sequence in &self.record_sequences {
            if sequence.is_empty() {
                return Err(LedgerError::InvalidGenesis("empty record sequence".into()));
            }
            if !sequences.insert(sequence.as_str()) {
                return Err(LedgerError::InvalidGenesis(format!(
                    "duplicate record sequence {sequence}"
                )));
            }
        }
        Ok(())
    }

    pub fn from_json(text: &str) -> Result<Self, LedgerError> {
        serde_json::from_str(text).map_err(|e| LedgerError::Serialization(e.to_string()))
    }

    pub fn to_json_pretty(&self) -> Result<String, LedgerError> {
        serde_json::to_string_pretty(self).map_err(|e| LedgerError::Serialization(e.to_string()))
    }
}

/// Load a genesis state into a ledger.
///
/// The state is validated first, then checked against the ledger: a record
/// colliding with one already stored fails with
/// [`LedgerError::AlreadyExists`] before anything is written. Run over a
/// [`StagedKvStore`](clerk_store::StagedKvStore) to make the load a single
/// commit.
pub fn init_genesis<S: KvStore>(
    ledger: &mut EventLedger<S>,
    state: &GenesisState,
) -> Result<(), LedgerError> {
    state.validate()?;

    let records = ledger.records();
    for record in &state.event_records {
        if records.exists(record.id)? {
            return Err(LedgerError::AlreadyExists { id: record.id });
        }
    }

    for record in &state.event_records {
        records.put(record)?;
    }

    let sequences = ledger.sequences();
    for sequence in &state.record_sequences {
        sequences.mark_used(sequence)?;
    }

    info!(
        records = state.event_records.len(),
        sequences = state.record_sequences.len(),
        "genesis loaded"
    );
    Ok(())
}

/// Snapshot every record and sequence in the ledger.
pub fn export_genesis<S: KvStore>(ledger: &EventLedger<S>) -> Result<GenesisState, LedgerError> {
    Ok(GenesisState {
        event_records: ledger.all_records()?,
        record_sequences: ledger.list_sequences()?,
    })
}
