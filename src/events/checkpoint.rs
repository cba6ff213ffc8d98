//! Event-stream watermark.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::nvlist::AttributeList;

/// Key of the sequence id in an event.
pub const EVENT_ID_KEY: &str = "eid";
/// Key of the `[seconds, nanoseconds]` time array in an event.
pub const EVENT_TIME_KEY: &str = "time";

/// Position in the event stream: `(sequence, seconds, nanoseconds)`.
///
/// Ordering looks at the time only; the sequence id is carried along. The
/// all-zero value means "absent or unparsable". It is never newer than
/// anything, which also makes a real event with sequence 0 at the epoch
/// indistinguishable from a missing checkpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Sequence id.
    pub sequence: u64,
    /// Whole seconds.
    pub seconds: i64,
    /// Nanoseconds.
    pub nanos: i64,
}

impl Checkpoint {
    /// The absent/unparsable sentinel.
    pub const ZERO: Self = Self {
        sequence: 0,
        seconds: 0,
        nanos: 0,
    };

    /// Creates a checkpoint.
    #[must_use]
    pub const fn new(sequence: u64, seconds: i64, nanos: i64) -> Self {
        Self {
            sequence,
            seconds,
            nanos,
        }
    }

    /// Returns true for the all-zero sentinel.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.sequence == 0 && self.seconds == 0 && self.nanos == 0
    }

    /// Strict time comparison. Ties and the zero sentinel are never newer.
    #[must_use]
    pub fn is_newer_than(&self, other: &Self) -> bool {
        if self.is_zero() {
            return false;
        }
        (self.seconds, self.nanos).cmp(&(other.seconds, other.nanos)) == Ordering::Greater
    }

    /// Extracts the checkpoint from an event.
    ///
    /// Requires a `uint64` under [`EVENT_ID_KEY`] and an `int64_array` of
    /// length 2 under [`EVENT_TIME_KEY`]; anything else yields [`Checkpoint::ZERO`].
    #[must_use]
    pub fn parse(event: &AttributeList) -> Self {
        let Some(sequence) = event.get(EVENT_ID_KEY).and_then(|v| v.as_uint64()) else {
            return Self::ZERO;
        };
        match event.get(EVENT_TIME_KEY).and_then(|v| v.as_int64_array()) {
            Some(&[seconds, nanos]) => Self::new(sequence, seconds, nanos),
            _ => Self::ZERO,
        }
    }

    /// Wall-clock time of the checkpoint, if representable.
    #[must_use]
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        let nanos = u32::try_from(self.nanos).ok()?;
        DateTime::from_timestamp(self.seconds, nanos)
    }
}

impl From<(u64, i64, i64)> for Checkpoint {
    fn from((sequence, seconds, nanos): (u64, i64, i64)) -> Self {
        Self::new(sequence, seconds, nanos)
    }
}

impl From<Checkpoint> for (u64, i64, i64) {
    fn from(cp: Checkpoint) -> Self {
        (cp.sequence, cp.seconds, cp.nanos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(sequence: u64, time: &[i64]) -> AttributeList {
        let mut list = AttributeList::new();
        list.add_uint64(EVENT_ID_KEY, sequence).unwrap();
        list.add_int64_array(EVENT_TIME_KEY, time).unwrap();
        list
    }

    #[test]
    fn ordering_ignores_sequence() {
        let cp = Checkpoint::from;
        assert!(cp((7, 5, 10)).is_newer_than(&cp((7, 5, 9))));
        assert!(!cp((7, 5, 9)).is_newer_than(&cp((7, 5, 9))));
        assert!(!cp((7, 4, 999)).is_newer_than(&cp((9, 5, 0))));
        assert!(cp((1, 6, 0)).is_newer_than(&cp((9, 5, 999))));
    }

    #[test]
    fn zero_is_never_newer() {
        assert!(!Checkpoint::ZERO.is_newer_than(&Checkpoint::new(0, -5, 0)));
        assert!(Checkpoint::new(0, 0, 1).is_newer_than(&Checkpoint::ZERO));
        assert!(Checkpoint::default().is_zero());
    }

    #[test]
    fn parse_well_formed_event() {
        assert_eq!(Checkpoint::parse(&event(7, &[100, 200])), Checkpoint::new(7, 100, 200));
    }

    #[test]
    fn parse_malformed_events_yield_zero() {
        assert!(Checkpoint::parse(&AttributeList::new()).is_zero());
        assert!(Checkpoint::parse(&event(7, &[100])).is_zero());
        assert!(Checkpoint::parse(&event(7, &[100, 200, 300])).is_zero());

        let mut wrong_id = AttributeList::new();
        wrong_id.add_int64(EVENT_ID_KEY, 7).unwrap();
        wrong_id.add_int64_array(EVENT_TIME_KEY, &[1, 2]).unwrap();
        assert!(Checkpoint::parse(&wrong_id).is_zero());

        let mut wrong_time = AttributeList::new();
        wrong_time.add_uint64(EVENT_ID_KEY, 7).unwrap();
        wrong_time.add_uint64_array(EVENT_TIME_KEY, &[1, 2]).unwrap();
        assert!(Checkpoint::parse(&wrong_time).is_zero());
    }

    #[test]
    fn tuple_round_trip_and_timestamp() {
        let cp = Checkpoint::from((3, 1_700_000_000, 500));
        let tuple: (u64, i64, i64) = cp.into();
        assert_eq!(tuple, (3, 1_700_000_000, 500));
        let ts = cp.timestamp().unwrap();
        assert_eq!(ts.timestamp(), 1_700_000_000);
        assert_eq!(ts.timestamp_subsec_nanos(), 500);
        assert!(Checkpoint::new(0, 0, -1).timestamp().is_none());
    }

    #[test]
    fn serde_shape() {
        let json = serde_json::to_value(Checkpoint::new(7, 100, 200)).unwrap();
        assert_eq!(json, serde_json::json!({ "sequence": 7, "seconds": 100, "nanos": 200 }));
        let back: Checkpoint = serde_json::from_value(json).unwrap();
        assert_eq!(back, Checkpoint::new(7, 100, 200));
    }
}
