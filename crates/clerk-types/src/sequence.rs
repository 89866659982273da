use std::fmt;

use serde::{Deserialize, Serialize};

/// Default spacing between consecutive blocks in the sequence space.
///
/// A block may carry at most this many logs before sequences collide.
pub const DEFAULT_LOG_INDEX_UNIT: u64 = 100_000;

/// Replay-protection key for an external event.
///
/// Conventionally `block_number * log_index_unit + log_index`, rendered in
/// decimal. The product is computed in 128 bits, so no `u64` block number can
/// overflow it.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SequenceId(String);

impl SequenceId {
    /// Wrap an already-derived sequence string.
    pub fn new(sequence: impl Into<String>) -> Self {
        Self(sequence.into())
    }

    /// Derive the sequence for the log at `log_index` in `block_number`.
    pub fn from_log_position(block_number: u64, log_index: u64, log_index_unit: u64) -> Self {
        let sequence =
            u128::from(block_number) * u128::from(log_index_unit) + u128::from(log_index);
        Self(sequence.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for SequenceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for SequenceId {
    fn from(sequence: String) -> Self {
        Self(sequence)
    }
}

impl From<&str> for SequenceId {
    fn from(sequence: &str) -> Self {
        Self(sequence.to_string())
    }
}

impl fmt::Debug for SequenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SequenceId({})", self.0)
    }
}

impl fmt::Display for SequenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
