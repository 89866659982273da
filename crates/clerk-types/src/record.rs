use serde::{Deserialize, Serialize};

use crate::hash::TxHash;
use crate::time::RecordTime;

/// An external-chain event admitted into the ledger.
///
/// The `id` is assigned by the event source, never by the ledger. Once
/// admitted, a record is immutable: nothing in the ledger overwrites or
/// deletes it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Source-assigned unique identifier.
    pub id: u64,
    /// Address of the contract that emitted the event.
    pub contract: String,
    /// Opaque event payload.
    pub data: Vec<u8>,
    /// Transaction that carried the event on the external chain.
    pub tx_hash: TxHash,
    /// Position of the event log inside its block.
    pub log_index: u64,
    /// Identifier of the chain the record is destined for.
    pub chain_id: String,
    /// Consensus time at which the record was admitted.
    pub record_time: RecordTime,
}

impl EventRecord {
    /// A record with no transaction provenance attached yet.
    pub fn new(
        id: u64,
        contract: impl Into<String>,
        data: Vec<u8>,
        record_time: RecordTime,
    ) -> Self {
        Self {
            id,
            contract: contract.into(),
            data,
            tx_hash: TxHash::zero(),
            log_index: 0,
            chain_id: String::new(),
            record_time,
        }
    }

    /// Attach the source transaction hash and log index.
    pub fn with_tx(mut self, tx_hash: TxHash, log_index: u64) -> Self {
        self.tx_hash = tx_hash;
        self.log_index = log_index;
        self
    }

    pub fn with_chain_id(mut self, chain_id: impl Into<String>) -> Self {
        self.chain_id = chain_id.into();
        self
    }
}
