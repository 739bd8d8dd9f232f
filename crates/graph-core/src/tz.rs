//! UTC offset sources for calendar-aligned computations
//!
//! Time grid alignment and work period shading run on local wall-clock
//! time. The engine never reads the host zone implicitly; callers pass one
//! of these sources.

use chrono::{DateTime, Datelike, FixedOffset, Local, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};

/// Earliest UTC timestamp calendar computations accept.
///
/// Both bounds sit a few thousand years inside chrono's date range so local
/// offsets and grid alignment never step outside it.
pub const MIN_TIMESTAMP: i64 = -8_000_000_000_000;
/// Latest UTC timestamp calendar computations accept
pub const MAX_TIMESTAMP: i64 = 8_000_000_000_000;

/// Whether `ts` lies in `[MIN_TIMESTAMP, MAX_TIMESTAMP]`
pub fn in_calendar_range(ts: i64) -> bool {
    (MIN_TIMESTAMP..=MAX_TIMESTAMP).contains(&ts)
}

/// Wall-clock for a UTC timestamp in seconds
pub fn naive_utc(ts: i64) -> NaiveDateTime {
    DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.naive_utc())
        .unwrap_or_default()
}

/// Strategy trait for time zone rules
pub trait UtcOffsetSource: Send + Sync {
    /// Offset east of UTC, seconds, at a UTC instant
    fn offset_at(&self, utc: i64) -> i32;

    /// Whether daylight saving time is in effect at a UTC instant
    fn is_dst(&self, _utc: i64) -> bool {
        false
    }

    /// Local wall-clock time of a UTC instant
    fn local(&self, utc: i64) -> NaiveDateTime {
        naive_utc(utc.saturating_add(i64::from(self.offset_at(utc))))
    }

    /// UTC instant of a local wall-clock time.
    ///
    /// Wall-clock times skipped by a forward jump resolve past the gap;
    /// repeated times resolve to the later instant.
    fn to_utc(&self, local: NaiveDateTime) -> i64 {
        let wall = local.and_utc().timestamp();
        let guess = wall.saturating_sub(i64::from(self.offset_at(wall)));
        wall.saturating_sub(i64::from(self.offset_at(guess)))
    }
}

impl UtcOffsetSource for FixedOffset {
    fn offset_at(&self, _utc: i64) -> i32 {
        self.local_minus_utc()
    }
}

impl UtcOffsetSource for Local {
    fn offset_at(&self, utc: i64) -> i32 {
        Local.offset_from_utc_datetime(&naive_utc(utc)).local_minus_utc()
    }

    fn is_dst(&self, utc: i64) -> bool {
        // Standard time is the smaller of the winter and summer offsets.
        let year_start = naive_utc(utc)
            .date()
            .with_ordinal(1)
            .map(|d| d.and_hms_opt(12, 0, 0).unwrap_or_default().and_utc().timestamp())
            .unwrap_or(utc);
        let january = self.offset_at(year_start);
        let july = self.offset_at(year_start + 181 * 86_400);
        self.offset_at(utc) > january.min(july)
    }
}

/// One change of the UTC offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetTransition {
    /// UTC instant the new offset starts at
    pub at: i64,
    pub offset: i32,
    pub dst: bool,
}

/// Offset rules given as an explicit list of transitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TransitionTable {
    /// Offset before the first transition
    pub initial_offset: i32,
    /// Sorted by `at`
    pub transitions: Vec<OffsetTransition>,
}

impl TransitionTable {
    pub fn new(initial_offset: i32) -> Self {
        Self {
            initial_offset,
            transitions: Vec::new(),
        }
    }

    pub fn with_transition(mut self, at: i64, offset: i32, dst: bool) -> Self {
        self.transitions.push(OffsetTransition { at, offset, dst });
        self.transitions.sort_by_key(|t| t.at);
        self
    }

    fn active(&self, utc: i64) -> Option<&OffsetTransition> {
        let idx = self.transitions.partition_point(|t| t.at <= utc);
        idx.checked_sub(1).map(|i| &self.transitions[i])
    }
}

impl UtcOffsetSource for TransitionTable {
    fn offset_at(&self, utc: i64) -> i32 {
        self.active(utc).map_or(self.initial_offset, |t| t.offset)
    }

    fn is_dst(&self, utc: i64) -> bool {
        self.active(utc).is_some_and(|t| t.dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};

    fn cet_2024() -> TransitionTable {
        // 2024-03-31 01:00 UTC -> CEST, 2024-10-27 01:00 UTC -> CET
        TransitionTable::new(3600)
            .with_transition(1_711_846_800, 7200, true)
            .with_transition(1_729_990_800, 3600, false)
    }

    #[test]
    fn test_fixed_offset() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        assert_eq!(tz.offset_at(0), 7200);
        assert_eq!(tz.local(0).hour(), 2);
        assert!(!tz.is_dst(0));
    }

    #[test]
    fn test_transition_table_offsets() {
        let tz = cet_2024();
        assert_eq!(tz.offset_at(1_711_846_799), 3600);
        assert_eq!(tz.offset_at(1_711_846_800), 7200);
        assert!(tz.is_dst(1_711_846_800));
        assert_eq!(tz.offset_at(1_729_990_800), 3600);
        assert!(!tz.is_dst(1_729_990_800));
    }

    #[test]
    fn test_to_utc_round_trip() {
        let tz = cet_2024();
        let local = NaiveDate::from_ymd_opt(2024, 7, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let utc = tz.to_utc(local);
        assert_eq!(tz.local(utc), local);
    }

    #[test]
    fn test_to_utc_in_gap_moves_forward() {
        let tz = cet_2024();
        // 02:30 local does not exist on 2024-03-31.
        let local = NaiveDate::from_ymd_opt(2024, 3, 31)
            .unwrap()
            .and_hms_opt(2, 30, 0)
            .unwrap();
        let utc = tz.to_utc(local);
        assert_eq!(tz.local(utc).hour(), 3);
    }
}
