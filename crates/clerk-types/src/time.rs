use std::fmt;

use chrono::{DateTime, Datelike, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Layout of the sortable byte encoding. Fixed width for years 0000..=9999.
const SORTABLE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.9f";

/// Length in bytes of [`RecordTime::to_sortable_bytes`].
pub const SORTABLE_TIME_LEN: usize = 29;

const MIN_YEAR: i32 = 0;
const MAX_YEAR: i32 = 9999;

/// Admission timestamp of an event record.
///
/// Always taken from block/consensus time so every replica derives the same
/// value. The sortable byte encoding is fixed-width, so comparing two
/// encodings byte-by-byte gives the same answer as comparing the times.
///
/// Only years 0000..=9999 are representable; anything else would break the
/// fixed-width guarantee.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "DateTime<Utc>", into = "DateTime<Utc>")]
pub struct RecordTime(DateTime<Utc>);

impl RecordTime {
    /// Wrap a UTC datetime, rejecting years outside the sortable range.
    pub fn new(at: DateTime<Utc>) -> Result<Self, TypeError> {
        let year = at.year();
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(TypeError::TimeOutOfRange(at.to_rfc3339()));
        }
        Ok(Self(at))
    }

    /// Build from unix seconds and a sub-second nanosecond component.
    pub fn from_unix(secs: i64, nanos: u32) -> Result<Self, TypeError> {
        let at = DateTime::from_timestamp(secs, nanos)
            .ok_or_else(|| TypeError::TimeOutOfRange(format!("{secs}s+{nanos}ns")))?;
        Self::new(at)
    }

    /// The unix epoch.
    pub fn epoch() -> Self {
        Self(DateTime::<Utc>::default())
    }

    /// Parse an RFC 3339 timestamp (any offset; normalized to UTC).
    pub fn parse_rfc3339(s: &str) -> Result<Self, TypeError> {
        let at = DateTime::parse_from_rfc3339(s)
            .map_err(|e| TypeError::InvalidTimestamp(format!("{s}: {e}")))?;
        Self::new(at.with_timezone(&Utc))
    }

    /// Fixed-width, byte-sortable encoding used in storage keys.
    pub fn to_sortable_bytes(&self) -> Vec<u8> {
        self.0.format(SORTABLE_FORMAT).to_string().into_bytes()
    }

    /// Decode the output of [`to_sortable_bytes`](Self::to_sortable_bytes).
    pub fn from_sortable_bytes(bytes: &[u8]) -> Result<Self, TypeError> {
        if bytes.len() != SORTABLE_TIME_LEN {
            return Err(TypeError::InvalidLength {
                expected: SORTABLE_TIME_LEN,
                actual: bytes.len(),
            });
        }
        let text = std::str::from_utf8(bytes)
            .map_err(|e| TypeError::InvalidTimestamp(e.to_string()))?;
        let naive = NaiveDateTime::parse_from_str(text, SORTABLE_FORMAT)
            .map_err(|e| TypeError::InvalidTimestamp(format!("{text}: {e}")))?;
        Self::new(naive.and_utc())
    }

    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    pub fn unix_seconds(&self) -> i64 {
        self.0.timestamp()
    }
}

impl TryFrom<DateTime<Utc>> for RecordTime {
    type Error = TypeError;

    fn try_from(at: DateTime<Utc>) -> Result<Self, Self::Error> {
        Self::new(at)
    }
}

impl From<RecordTime> for DateTime<Utc> {
    fn from(time: RecordTime) -> Self {
        time.0
    }
}

impl fmt::Debug for RecordTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordTime({})", self.0.format(SORTABLE_FORMAT))
    }
}

impl fmt::Display for RecordTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true))
    }
}
