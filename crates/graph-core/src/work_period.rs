//! Weekly working-time schedule, e.g. `"1-5,09:00-18:00;6-7,10:00-14:00"`

use crate::{GraphError, Result, UtcOffsetSource};
use chrono::{Datelike, Duration, NaiveTime};
use serde::{Deserialize, Serialize};

/// One `days,time-time` entry; days are 1 (Monday) through 7 (Sunday)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkPeriod {
    pub day_from: u32,
    pub day_to: u32,
    /// Minutes after local midnight
    pub start_minute: u32,
    /// Minutes after local midnight, up to 1440
    pub end_minute: u32,
}

impl WorkPeriod {
    pub fn covers(&self, weekday: u32) -> bool {
        (self.day_from..=self.day_to).contains(&weekday)
    }
}

fn parse_clock(text: &str) -> Option<u32> {
    let (hours, minutes) = text.split_once(':')?;
    if hours.is_empty() || hours.len() > 2 || minutes.len() != 2 {
        return None;
    }
    let hours: u32 = hours.parse().ok()?;
    let minutes: u32 = minutes.parse().ok()?;

    match (hours, minutes) {
        (24, 0) => Some(24 * 60),
        (0..=23, 0..=59) => Some(hours * 60 + minutes),
        _ => None,
    }
}

fn parse_entry(entry: &str) -> Option<WorkPeriod> {
    let (days, times) = entry.split_once(',')?;
    let (day_from, day_to) = match days.split_once('-') {
        Some((from, to)) => (from.parse().ok()?, to.parse().ok()?),
        None => {
            let day = days.parse().ok()?;
            (day, day)
        }
    };

    if !(1..=7).contains(&day_from) || !(1..=7).contains(&day_to) || day_from > day_to {
        return None;
    }

    let (start, end) = times.split_once('-')?;
    let start_minute = parse_clock(start)?;
    let end_minute = parse_clock(end)?;

    if start_minute >= end_minute {
        return None;
    }

    Some(WorkPeriod {
        day_from,
        day_to,
        start_minute,
        end_minute,
    })
}

/// Parsed working-time schedule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct WorkPeriods {
    pub periods: Vec<WorkPeriod>,
}

impl WorkPeriods {
    pub fn parse(text: &str) -> Result<Self> {
        let periods = text
            .split(';')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| parse_entry(entry).ok_or_else(|| GraphError::InvalidWorkPeriod(text.to_string())))
            .collect::<Result<Vec<_>>>()?;

        if periods.is_empty() {
            return Err(GraphError::InvalidWorkPeriod(text.to_string()));
        }

        Ok(Self { periods })
    }

    /// Working intervals overlapping `[from, to)`, merged and clipped, as UTC timestamps
    pub fn intervals(&self, from: i64, to: i64, offsets: &dyn UtcOffsetSource) -> Vec<(i64, i64)> {
        if to <= from {
            return Vec::new();
        }

        let start_day = offsets.local(from).date();
        let first_day = start_day.pred_opt().unwrap_or(start_day);
        let last_day = offsets.local(to).date();

        let mut spans = Vec::new();
        let mut day = first_day;
        while day <= last_day {
            let weekday = day.weekday().number_from_monday();
            let midnight = day.and_time(NaiveTime::MIN);

            for period in self.periods.iter().filter(|p| p.covers(weekday)) {
                let wall = |minute: u32| midnight.checked_add_signed(Duration::minutes(i64::from(minute)));
                let (Some(start), Some(end)) = (wall(period.start_minute), wall(period.end_minute)) else {
                    continue;
                };
                let (start, end) = (offsets.to_utc(start).max(from), offsets.to_utc(end).min(to));
                if start < end {
                    spans.push((start, end));
                }
            }

            match day.succ_opt() {
                Some(next) => day = next,
                None => break,
            }
        }

        spans.sort_unstable();

        let mut merged: Vec<(i64, i64)> = Vec::with_capacity(spans.len());
        for (start, end) in spans {
            match merged.last_mut() {
                Some(last) if start <= last.1 => last.1 = last.1.max(end),
                _ => merged.push((start, end)),
            }
        }

        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    // 2024-01-01 00:00:00 UTC, a Monday
    const MONDAY: i64 = 1_704_067_200;

    #[test]
    fn test_parse() {
        let periods = WorkPeriods::parse("1-5,09:00-18:00;6-7,10:00-14:00").unwrap();
        assert_eq!(periods.periods.len(), 2);
        assert_eq!(periods.periods[0].start_minute, 9 * 60);
        assert_eq!(periods.periods[1].day_from, 6);

        let single = WorkPeriods::parse("3,00:00-24:00").unwrap();
        assert_eq!(single.periods[0].end_minute, 1440);
    }

    #[test]
    fn test_parse_invalid() {
        for bad in ["", "8-9,09:00-18:00", "1-5,18:00-09:00", "1-5,25:00-26:00", "5-1,09:00-10:00", "1-5"] {
            assert!(WorkPeriods::parse(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn test_intervals_at_calendar_limits() {
        let periods = WorkPeriods::parse("1-7,00:00-24:00").unwrap();
        let utc = FixedOffset::east_opt(0).unwrap();

        let last_day = chrono::NaiveDate::MAX.and_time(NaiveTime::MIN).and_utc().timestamp();
        assert!(periods.intervals(last_day, last_day + 3600, &utc).is_empty());

        let first_day = chrono::NaiveDate::MIN.and_time(NaiveTime::MIN).and_utc().timestamp();
        let spans = periods.intervals(first_day, first_day + 3600, &utc);
        assert_eq!(spans, vec![(first_day, first_day + 3600)]);

        assert!(periods.intervals(i64::MAX - 10, i64::MAX, &utc).is_empty());
    }

    #[test]
    fn test_intervals_utc() {
        let periods = WorkPeriods::parse("1-5,09:00-18:00").unwrap();
        let utc = FixedOffset::east_opt(0).unwrap();

        // Monday 00:00 .. Wednesday 00:00
        let spans = periods.intervals(MONDAY, MONDAY + 2 * 86_400, &utc);
        assert_eq!(
            spans,
            vec![
                (MONDAY + 9 * 3600, MONDAY + 18 * 3600),
                (MONDAY + 86_400 + 9 * 3600, MONDAY + 86_400 + 18 * 3600),
            ]
        );
    }

    #[test]
    fn test_intervals_clipped_and_weekend_skipped() {
        let periods = WorkPeriods::parse("1-5,09:00-18:00").unwrap();
        let utc = FixedOffset::east_opt(0).unwrap();

        // Monday 12:00 .. Monday 13:00 is fully inside working time
        let spans = periods.intervals(MONDAY + 12 * 3600, MONDAY + 13 * 3600, &utc);
        assert_eq!(spans, vec![(MONDAY + 12 * 3600, MONDAY + 13 * 3600)]);

        // Saturday and Sunday
        let saturday = MONDAY + 5 * 86_400;
        assert!(periods.intervals(saturday, saturday + 2 * 86_400, &utc).is_empty());
    }

    #[test]
    fn test_intervals_merge_adjacent_days() {
        let periods = WorkPeriods::parse("1-7,00:00-24:00").unwrap();
        let utc = FixedOffset::east_opt(0).unwrap();
        let spans = periods.intervals(MONDAY, MONDAY + 3 * 86_400, &utc);
        assert_eq!(spans, vec![(MONDAY, MONDAY + 3 * 86_400)]);
    }

    #[test]
    fn test_intervals_local_offset() {
        let periods = WorkPeriods::parse("1-5,09:00-18:00").unwrap();
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        let spans = periods.intervals(MONDAY, MONDAY + 86_400, &plus_two);
        assert_eq!(spans, vec![(MONDAY + 7 * 3600, MONDAY + 16 * 3600)]);
    }
}
