use clerk_store::StoreError;

/// Errors produced by ledger operations.
///
/// Callers branch on the variant, never on the message: a
/// [`DuplicateEvent`](Self::DuplicateEvent) is a routine stale submission,
/// while [`AlreadyExists`](Self::AlreadyExists) means upstream id assignment
/// or stored state has gone wrong.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("event sequence {sequence} already admitted")]
    DuplicateEvent { sequence: String },

    #[error("event record {id} already exists")]
    AlreadyExists { id: u64 },

    #[error("event record {id} not found")]
    NotFound { id: u64 },

    #[error("corrupt value under key {key}: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("invalid sequence: {0}")]
    InvalidSequence(String),

    #[error("invalid genesis state: {0}")]
    InvalidGenesis(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl LedgerError {
    /// `true` for a replayed external event. Callers map this to their own
    /// "old transaction" error instead of treating it as a failure.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateEvent { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
