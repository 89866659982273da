//! Ordered key-value storage for the clerk ledger.
//!
//! The ledger needs only four things from its storage: point reads, point
//! writes, existence checks, and ordered range scans over raw byte keys.
//! [`KvStore`] captures exactly that.
//!
//! # Backends
//!
//! - [`InMemoryKvStore`] -- `BTreeMap`-based store for tests and embedding
//! - [`JournalKvStore`] -- append-only CRC-framed journal replayed into an
//!   in-memory index on open
//! - [`StagedKvStore`] -- write buffer over any other store; commit or drop
//!
//! # Design Rules
//!
//! 1. Keys iterate in lexicographic byte order.
//! 2. There is no delete operation.
//! 3. Concurrent reads are always safe.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod journal;
pub mod memory;
pub mod staged;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use journal::{JournalConfig, JournalEntry, JournalKvStore, RecoveryReport, SyncMode};
pub use memory::InMemoryKvStore;
pub use staged::StagedKvStore;
pub use traits::{prefix_end, KeyRange, KvPair, KvStore, Page};
