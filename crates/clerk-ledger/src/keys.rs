//! Storage key layout.
//!
//! One flat keyspace holds three indexes, each under its own single-byte
//! prefix:
//!
//! | Prefix | Suffix                         | Value               |
//! |--------|--------------------------------|---------------------|
//! | `0x11` | decimal id                     | encoded record      |
//! | `0x12` | raw sequence string            | `0x01` marker       |
//! | `0x13` | sortable timestamp + decimal id | encoded record      |
//!
//! Ids are decimal, not fixed-width, to stay byte-compatible with existing
//! state. The id index therefore iterates lexicographically: id `10` comes
//! before id `9`.

use clerk_store::KeyRange;
use clerk_types::RecordTime;

/// Prefix of the id index.
pub const RECORD_PREFIX: u8 = 0x11;
/// Prefix of the sequence markers.
pub const SEQUENCE_PREFIX: u8 = 0x12;
/// Prefix of the time index.
pub const RECORD_TIME_PREFIX: u8 = 0x13;

/// Value stored under every sequence key.
pub const SEQUENCE_MARKER: &[u8] = &[0x01];

/// Id-index key: prefix plus the decimal id.
pub fn record_key(id: u64) -> Vec<u8> {
    let id = id.to_string();
    let mut key = Vec::with_capacity(1 + id.len());
    key.push(RECORD_PREFIX);
    key.extend_from_slice(id.as_bytes());
    key
}

/// Start of the time-index slice for `record_time`; every record admitted at
/// that instant sorts at or after it.
pub fn time_prefix(record_time: &RecordTime) -> Vec<u8> {
    let mut key = vec![RECORD_TIME_PREFIX];
    key.extend_from_slice(&record_time.to_sortable_bytes());
    key
}

/// Time-index key for record `id` admitted at `record_time`.
pub fn time_key(id: u64, record_time: &RecordTime) -> Vec<u8> {
    let mut key = time_prefix(record_time);
    key.extend_from_slice(id.to_string().as_bytes());
    key
}

/// Marker key for an admitted sequence.
pub fn sequence_key(sequence: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + sequence.len());
    key.push(SEQUENCE_PREFIX);
    key.extend_from_slice(sequence.as_bytes());
    key
}

/// Recover the sequence string from a sequence key.
///
/// Returns `None` for keys outside the sequence index or with a non-UTF-8
/// suffix.
pub fn sequence_from_key(key: &[u8]) -> Option<&str> {
    match key.split_first() {
        Some((&SEQUENCE_PREFIX, rest)) => std::str::from_utf8(rest).ok(),
        _ => None,
    }
}

/// The whole id index.
pub fn record_range() -> KeyRange {
    KeyRange::prefix(&[RECORD_PREFIX])
}

/// The whole sequence index.
pub fn sequence_range() -> KeyRange {
    KeyRange::prefix(&[SEQUENCE_PREFIX])
}

/// Time-index entries with `from <= record_time < to`.
pub fn time_range(from: &RecordTime, to: &RecordTime) -> KeyRange {
    KeyRange::between(time_prefix(from), time_prefix(to))
}

/// Human-readable rendering of a key for logs and errors.
pub fn display_key(key: &[u8]) -> String {
    match key.split_first() {
        Some((prefix, rest)) if rest.is_ascii() => {
            format!("{prefix:#04x}/{}", String::from_utf8_lossy(rest))
        }
        _ => hex::encode(key),
    }
}
