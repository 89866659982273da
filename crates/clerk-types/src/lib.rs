//! Foundation types for the clerk event ledger.
//!
//! Every other clerk crate depends on `clerk-types`.
//!
//! # Key Types
//!
//! - [`EventRecord`] -- An admitted external-chain event
//! - [`RecordTime`] -- Consensus timestamp with a byte-sortable encoding
//! - [`SequenceId`] -- Replay-protection key derived from a log position
//! - [`TxHash`] -- Hash of the emitting external transaction

pub mod error;
pub mod hash;
pub mod record;
pub mod sequence;
pub mod time;

pub use error::TypeError;
pub use hash::TxHash;
pub use record::EventRecord;
pub use sequence::{SequenceId, DEFAULT_LOG_INDEX_UNIT};
pub use time::{RecordTime, SORTABLE_TIME_LEN};
