//! Exactly-once ingestion ledger for external-chain events.
//!
//! This crate is the heart of clerk. It provides:
//! - A key codec laying out three indexes in one ordered keyspace
//! - [`SequenceGuard`] -- permanent replay-protection markers
//! - [`RecordStore`] -- records indexed by id and by record time
//! - [`EventLedger`] -- admission and queries behind the
//!   [`EventWriter`] / [`EventReader`] trait boundaries
//! - Genesis import and export
//!
//! The ledger verifies nothing about an event's authenticity; callers hand
//! it events they have already validated.

pub mod config;
pub mod error;
pub mod genesis;
pub mod keys;
pub mod records;
pub mod sequence;
pub mod service;
pub mod traits;

pub use config::{JournalSettings, LedgerConfig};
pub use error::LedgerError;
pub use genesis::{export_genesis, init_genesis, GenesisState};
pub use records::{RecordStore, MAX_PAGE_LIMIT};
pub use sequence::SequenceGuard;
pub use service::EventLedger;
pub use traits::{EventReader, EventWriter};
