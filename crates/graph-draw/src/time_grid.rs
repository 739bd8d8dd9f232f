//! # time_grid
//!
//! Time axis: selection of the main/sub grid interval and placement of the
//! calendar-aligned, labelled ticks.

use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use graph_core::{
    SEC_PER_DAY, SEC_PER_HOUR, SEC_PER_MIN, SEC_PER_MONTH, SEC_PER_WEEK, SEC_PER_YEAR,
    UtcOffsetSource, in_calendar_range,
};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Main and sub grid interval, seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeGrid {
    pub main: i64,
    pub sub: i64,
}

/// Candidate `(main, sub)` pairs, fine to coarse
pub const INTERVAL_TABLE: [(i64, i64); 29] = [
    (SEC_PER_MIN, 1),
    (SEC_PER_MIN, 5),
    (SEC_PER_MIN, 10),
    (SEC_PER_MIN, 30),
    (SEC_PER_HOUR, SEC_PER_MIN),
    (SEC_PER_HOUR, SEC_PER_MIN * 2),
    (SEC_PER_HOUR, SEC_PER_MIN * 5),
    (SEC_PER_HOUR, SEC_PER_MIN * 15),
    (SEC_PER_HOUR, SEC_PER_MIN * 30),
    (SEC_PER_DAY, SEC_PER_HOUR),
    (SEC_PER_DAY, SEC_PER_HOUR * 3),
    (SEC_PER_DAY, SEC_PER_HOUR * 6),
    (SEC_PER_DAY, SEC_PER_HOUR * 12),
    (SEC_PER_WEEK, SEC_PER_DAY),
    (SEC_PER_WEEK, SEC_PER_DAY * 3),
    (SEC_PER_MONTH, SEC_PER_WEEK),
    (SEC_PER_MONTH, SEC_PER_WEEK * 2),
    (SEC_PER_YEAR, SEC_PER_MONTH),
    (SEC_PER_YEAR, SEC_PER_MONTH * 3),
    (SEC_PER_YEAR, SEC_PER_MONTH * 4),
    (SEC_PER_YEAR, SEC_PER_MONTH * 6),
    (SEC_PER_YEAR * 5, SEC_PER_YEAR),
    (SEC_PER_YEAR * 10, SEC_PER_YEAR * 2),
    (SEC_PER_YEAR * 15, SEC_PER_YEAR * 3),
    (SEC_PER_YEAR * 20, SEC_PER_YEAR * 5),
    (SEC_PER_YEAR * 30, SEC_PER_YEAR * 10),
    (SEC_PER_YEAR * 40, SEC_PER_YEAR * 20),
    (SEC_PER_YEAR * 60, SEC_PER_YEAR * 30),
    (SEC_PER_YEAR * 80, SEC_PER_YEAR * 40),
];

/// Grid whose sub interval is closest to `cell_width` pixels.
///
/// Ties keep the finer pair. Only pairs within five years of the target
/// qualify; beyond that the coarsest pair is used.
pub fn select_interval(pixel_width: usize, time_span: i64, cell_width: f64) -> TimeGrid {
    let target = cell_width * time_span as f64 / pixel_width.max(1) as f64;

    let mut distance = (SEC_PER_YEAR * 5) as f64;
    let (main, sub) = INTERVAL_TABLE[INTERVAL_TABLE.len() - 1];
    let mut grid = TimeGrid { main, sub };

    for &(main, sub) in &INTERVAL_TABLE {
        let candidate = (sub as f64 - target).abs();
        if candidate < distance {
            distance = candidate;
            grid = TimeGrid { main, sub };
        }
    }

    grid
}

// ============================================================================
// CALENDAR STEPS
// ============================================================================

/// Calendar unit a grid interval is counted in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Years(u32),
    Months(u32),
    Weeks(i64),
    Days(i64),
    Hours(i64),
    Minutes(i64),
    Seconds(i64),
}

impl Step {
    fn of(interval: i64) -> Self {
        let interval = interval.max(1);
        if interval >= SEC_PER_YEAR {
            Self::Years((interval / SEC_PER_YEAR) as u32)
        } else if interval >= SEC_PER_MONTH {
            Self::Months((interval / SEC_PER_MONTH) as u32)
        } else if interval >= SEC_PER_WEEK {
            Self::Weeks(interval / SEC_PER_WEEK)
        } else if interval >= SEC_PER_DAY {
            Self::Days(interval / SEC_PER_DAY)
        } else if interval >= SEC_PER_HOUR {
            Self::Hours(interval / SEC_PER_HOUR)
        } else if interval >= SEC_PER_MIN {
            Self::Minutes(interval / SEC_PER_MIN)
        } else {
            Self::Seconds(interval)
        }
    }

    /// strftime pattern of the tick label
    fn format(&self, main: bool) -> &'static str {
        match self {
            Self::Years(_) => "%Y",
            Self::Months(_) if main => "%m-%d",
            Self::Months(_) => "%b",
            Self::Weeks(_) | Self::Days(_) => "%m-%d",
            Self::Hours(_) => "%H:%M",
            Self::Minutes(_) if main => "%H:%M:%S",
            Self::Minutes(_) => "%H:%M",
            Self::Seconds(_) => "%H:%M:%S",
        }
    }

    /// Last boundary of this step at or before `utc`
    fn align(&self, utc: i64, offsets: &dyn UtcOffsetSource) -> i64 {
        let local = offsets.local(utc);
        let midnight = |date: NaiveDate| offsets.to_utc(date.and_time(NaiveTime::MIN));

        match *self {
            Self::Years(n) => {
                let year = local.year() - local.year().rem_euclid(n.max(1) as i32);
                NaiveDate::from_ymd_opt(year, 1, 1).map_or(utc, midnight)
            }
            Self::Months(n) => {
                let back = local.month0() % n.max(1);
                local
                    .date()
                    .with_day(1)
                    .and_then(|d| d.checked_sub_months(Months::new(back)))
                    .map_or(utc, midnight)
            }
            Self::Weeks(n) => {
                let week = i64::from(local.iso_week().week());
                let back_days = ((week - 1) % n.max(1)) * 7 + i64::from(local.weekday().num_days_from_sunday());
                local
                    .date()
                    .checked_sub_signed(Duration::days(back_days))
                    .map_or(utc, midnight)
            }
            Self::Days(n) => {
                let back_days = i64::from(local.day0()) % n.max(1);
                local
                    .date()
                    .checked_sub_signed(Duration::days(back_days))
                    .map_or(utc, midnight)
            }
            Self::Hours(n) => {
                let back = (i64::from(local.hour()) % n.max(1)) * SEC_PER_HOUR
                    + i64::from(local.minute()) * SEC_PER_MIN
                    + i64::from(local.second());
                utc - back
            }
            Self::Minutes(n) => {
                let back = (i64::from(local.minute()) % n.max(1)) * SEC_PER_MIN + i64::from(local.second());
                utc - back
            }
            Self::Seconds(n) => utc - i64::from(local.second()) % n.max(1),
        }
    }

    /// Next boundary after `utc`; date units step on the wall clock
    fn advance(&self, utc: i64, offsets: &dyn UtcOffsetSource) -> i64 {
        let local = offsets.local(utc);
        let wall = |shifted: Option<NaiveDateTime>| shifted.map_or(i64::MAX, |dt| offsets.to_utc(dt));

        match *self {
            Self::Years(n) => wall(local.checked_add_months(Months::new(12 * n))),
            Self::Months(n) => wall(local.checked_add_months(Months::new(n))),
            Self::Weeks(n) => wall(local.checked_add_signed(Duration::weeks(n))),
            Self::Days(n) => wall(local.checked_add_signed(Duration::days(n))),
            Self::Hours(n) => utc.saturating_add(n * SEC_PER_HOUR),
            Self::Minutes(n) => utc.saturating_add(n * SEC_PER_MIN),
            Self::Seconds(n) => utc.saturating_add(n),
        }
    }
}

// ============================================================================
// TICKS
// ============================================================================

/// Labelled vertical grid line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeTick {
    pub clock: i64,
    /// Plot-relative x
    pub x: f64,
    pub main: bool,
    pub label: String,
}

/// Start and end labels of the time axis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodLabels {
    pub start: String,
    pub end: String,
}

fn format_local(utc: i64, pattern: &str, offsets: &dyn UtcOffsetSource) -> String {
    offsets.local(utc).format(pattern).to_string()
}

/// Window start and end labels, with dates when the window crosses a year
pub fn period_labels(from: i64, to: i64, offsets: &dyn UtcOffsetSource) -> PeriodLabels {
    let pattern = if offsets.local(from).year() != offsets.local(to).year() {
        "%Y-%m-%d"
    } else {
        "%m-%d %H:%M"
    };

    PeriodLabels {
        start: format_local(from, pattern, offsets),
        end: format_local(to, pattern, offsets),
    }
}

/// Ticks of a grid over `[from, to)`.
///
/// Ticks sit on calendar boundaries of the local time. A tick is main when
/// it coincides with the main grid; a monthly main grid marks every tick
/// that starts a new month. Sub grids between one hour and one day realign
/// once after a switch to daylight saving time. Ticks closer than
/// `1.5 * label_width` pixels to the window start or the right edge are
/// dropped. Windows reaching past the calendar range get no ticks.
pub fn time_ticks(
    grid: TimeGrid,
    from: i64,
    to: i64,
    size_x: usize,
    label_width: f64,
    offsets: &dyn UtcOffsetSource,
) -> Vec<TimeTick> {
    let period = to.saturating_sub(from);
    if period <= 0
        || size_x == 0
        || grid.sub <= 0
        || grid.main <= 0
        || !in_calendar_range(from)
        || !in_calendar_range(to)
    {
        return Vec::new();
    }

    let main_step = Step::of(grid.main);
    let sub_step = Step::of(grid.sub);
    let size_x = size_x as f64;
    let margin = label_width * 1.5;
    let compensate = SEC_PER_HOUR < grid.sub && grid.sub < SEC_PER_DAY;

    let mut main = main_step.align(from, offsets);
    let mut sub = sub_step.align(from, offsets);

    let mut prev_dst = offsets.is_dst(sub);
    let mut prev_offset = offsets.offset_at(sub);
    let mut dst_offset = 0_i64;
    let mut do_align = false;

    let mut prev_month = offsets.local(from).month();
    let mut prev_time = from;
    let mut ticks = Vec::new();

    loop {
        let next = sub_step.advance(sub, offsets);
        if next <= sub || next == i64::MAX {
            break;
        }
        sub = next;

        if compensate {
            if do_align {
                let hours = grid.sub / SEC_PER_HOUR;
                if i64::from(offsets.local(sub).hour()) % hours != 0 {
                    sub += dst_offset;
                }
                do_align = false;
            }

            let dst = offsets.is_dst(sub);
            let offset = offsets.offset_at(sub);
            if dst && dst != prev_dst {
                dst_offset = i64::from(prev_offset - offset);
                do_align = grid.sub > dst_offset.abs();
                trace!(clock = sub, dst_offset, "daylight saving switch on time axis");
            }
            prev_dst = dst;
            prev_offset = offset;
        }

        if main < sub {
            main = main_step.advance(main, offsets);
        }

        let is_main = if grid.main == SEC_PER_MONTH {
            let month = offsets.local(sub).month();
            let changed = month != prev_month;
            prev_month = month;
            changed
        } else {
            main == sub
        };

        let delta_x = (sub - prev_time) as f64 * size_x / period as f64;
        let position = (sub - from) as f64 * size_x / period as f64;

        if prev_time != from || delta_x > margin {
            if position > size_x - margin {
                break;
            }

            let pattern = if is_main {
                main_step.format(true)
            } else {
                sub_step.format(false)
            };

            ticks.push(TimeTick {
                clock: sub,
                x: position,
                main: is_main,
                label: format_local(sub, pattern, offsets),
            });
        }

        prev_time = sub;
    }

    ticks
}
