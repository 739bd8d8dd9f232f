//! Parsing of time unit, update interval and retention strings

use crate::{GraphError, Result, SEC_PER_DAY, SEC_PER_HOUR, SEC_PER_MIN, SEC_PER_WEEK, SEC_PER_YEAR};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static TIME_UNIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?<int>\d+)(?<suffix>[smhdw])?$").expect("static pattern"));

static FLEXIBLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?<delay>\d+[smhdw]?)/(?<period>[1-7](-[1-7])?,\d{1,2}:\d{2}-\d{1,2}:\d{2})$")
        .expect("static pattern")
});

static SCHEDULING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(md|wd|h|m|s)\d[0-9a-z/,\-]*$").expect("static pattern"));

/// Convert `"90d"`, `"30s"` or `"600"` to seconds
pub fn parse_time_unit(field: &'static str, value: &str) -> Result<i64> {
    let value = value.trim();
    let caps = TIME_UNIT
        .captures(value)
        .ok_or_else(|| GraphError::invalid_interval(field, value))?;

    let int: i64 = caps["int"]
        .parse()
        .map_err(|_| GraphError::invalid_interval(field, value))?;

    let multiplier = match caps.name("suffix").map(|m| m.as_str()) {
        None | Some("s") => 1,
        Some("m") => SEC_PER_MIN,
        Some("h") => SEC_PER_HOUR,
        Some("d") => SEC_PER_DAY,
        Some("w") => SEC_PER_WEEK,
        Some(_) => return Err(GraphError::invalid_interval(field, value)),
    };

    int.checked_mul(multiplier)
        .ok_or_else(|| GraphError::invalid_interval(field, value))
}

/// Flexible update interval active during a weekly period
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlexibleInterval {
    pub delay: i64,
    pub period: String,
}

/// Parsed item update interval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateInterval {
    pub delay: i64,
    pub flexible: Vec<FlexibleInterval>,
    pub has_scheduling: bool,
}

impl UpdateInterval {
    /// Parse `"<delay>[;<flexible>|<scheduling>]..."`
    pub fn parse(value: &str) -> Result<Self> {
        let mut parts = value.trim().split(';');
        let delay = parse_time_unit("delay", parts.next().unwrap_or_default())?;

        let mut flexible = Vec::new();
        let mut has_scheduling = false;

        for part in parts {
            let part = part.trim();
            if let Some(caps) = FLEXIBLE.captures(part) {
                flexible.push(FlexibleInterval {
                    delay: parse_time_unit("delay", &caps["delay"])?,
                    period: caps["period"].to_string(),
                });
            } else if SCHEDULING.is_match(part) {
                has_scheduling = true;
            } else {
                return Err(GraphError::invalid_interval("delay", value));
            }
        }

        // A zero delay only makes sense with custom intervals.
        if delay == 0 && flexible.iter().all(|f| f.delay == 0) && !has_scheduling {
            return Err(GraphError::invalid_interval("delay", value));
        }

        Ok(Self {
            delay,
            flexible,
            has_scheduling,
        })
    }

    /// Delay used for gap detection: the base delay, or the shortest
    /// flexible delay when polling only happens in flexible periods
    pub fn effective_delay(&self) -> i64 {
        if self.delay != 0 || self.flexible.is_empty() {
            return self.delay;
        }

        self.flexible
            .iter()
            .map(|f| f.delay)
            .fold(SEC_PER_YEAR, i64::min)
    }
}

/// Storage retention of one series, seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Retention {
    pub history: i64,
    pub trends: i64,
}

impl Retention {
    pub fn parse(history: &str, trends: &str) -> Result<Self> {
        Ok(Self {
            history: parse_time_unit("history", history)?,
            trends: parse_time_unit("trends", trends)?,
        })
    }
}
