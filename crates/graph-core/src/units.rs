//! Value formatting with unit prefixes (K, M, G, ...)

use chrono::DateTime;

use crate::{KIBIBYTE, SEC_PER_DAY, SEC_PER_HOUR, SEC_PER_MIN, SEC_PER_MONTH, SEC_PER_YEAR};

/// Prefixes indexed by power of the unit base
pub const POWER_TABLE: [&str; 9] = ["", "K", "M", "G", "T", "P", "E", "Z", "Y"];

/// Decimals kept for values printed without a prefix
pub const ROUNDOFF_UNSUFFIXED: usize = 4;
/// Decimals kept for values printed with a prefix
pub const ROUNDOFF_SUFFIXED: usize = 2;

const BLACKLIST: [&str; 4] = ["%", "ms", "rpm", "RPM"];

/// Significant decimal digits of an `f64`
const FLOAT_DIG: f64 = 15.0;

// ============================================================================
// STRATEGY PATTERN: Value Formatters
// ============================================================================

/// Strategy trait for axis and legend value formatting
pub trait ValueFormatter: Send + Sync {
    fn format(&self, value: f64) -> String;
}

/// Formatter applying unit prefixes, optionally at a fixed power
#[derive(Debug, Clone, Default)]
pub struct UnitFormatter {
    pub units: String,
    /// Fixed prefix power; chosen per value when `None`
    pub power: Option<usize>,
}

impl UnitFormatter {
    pub fn new(units: impl Into<String>) -> Self {
        Self {
            units: units.into(),
            power: None,
        }
    }

    pub fn with_power(mut self, power: usize) -> Self {
        self.power = Some(power);
        self
    }
}

impl ValueFormatter for UnitFormatter {
    fn format(&self, value: f64) -> String {
        convert_units(value, &self.units, self.power)
    }
}

/// Base used for unit prefixes
pub fn unit_base(units: &str) -> f64 {
    if matches!(units, "B" | "Bps") {
        KIBIBYTE
    } else {
        1000.0
    }
}

/// Round to `decimals` places and drop trailing zeros
pub fn format_float(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let mut text = format!("{:.*}", decimals, value);
    if text.contains('.') {
        let trimmed = text.trim_end_matches('0').trim_end_matches('.').len();
        text.truncate(trimmed);
    }

    if text == "-0" {
        text = "0".to_string();
    }

    text
}

// ============================================================================
// TIME UNITS
// ============================================================================

/// Duration in at most three significant parts, e.g. `"1d 2h 3m"` or `"1.5ms"`
pub fn convert_units_s(value: f64) -> String {
    let value_abs = value.abs();
    let mut whole = value_abs.floor();
    let mut parts: Vec<(f64, &str)> = Vec::new();
    // Level of the most significant part: 0 years, 1 months, 2 days ...
    let mut start: Option<usize> = None;

    let mut years = (whole / SEC_PER_YEAR as f64).floor();
    if years > 0.0 {
        whole -= years * SEC_PER_YEAR as f64;
        start = Some(0);
    }

    let months = (whole / SEC_PER_MONTH as f64).floor();
    if months == 12.0 {
        years += 1.0;
    } else if start.is_none() || years.log10().ceil() <= FLOAT_DIG {
        if months > 0.0 {
            parts.push((months, "m"));
            whole -= months * SEC_PER_MONTH as f64;
            start.get_or_insert(1);
        }

        let smaller = [(SEC_PER_DAY, "d"), (SEC_PER_HOUR, "h"), (SEC_PER_MIN, "m")];
        for (level, (seconds, suffix)) in (2..).zip(smaller) {
            let count = (whole / seconds as f64).floor();
            if count > 0.0 {
                parts.push((count, suffix));
                whole -= count * seconds as f64;
                start.get_or_insert(level);
            }

            if start.is_some_and(|start| level - start >= 2) {
                break;
            }
        }

        if start.is_none_or(|start| start >= 3) {
            parts.push((whole, "s"));

            if start.is_none_or(|start| start >= 4) {
                parts.push((value_abs.fract() * 1000.0, "ms"));
            }
        }
    }

    if years > 0.0 {
        parts.insert(0, (years, "y"));
    }

    let text: Vec<String> = parts
        .into_iter()
        .map(|(count, suffix)| (format_float(count, ROUNDOFF_SUFFIXED), suffix))
        .filter(|(count, _)| count != "0")
        .map(|(count, suffix)| format!("{count}{suffix}"))
        .collect();

    if text.is_empty() {
        "0".to_string()
    } else {
        let sign = if value < 0.0 { "-" } else { "" };
        format!("{sign}{}", text.join(" "))
    }
}

/// Uptime as `"N days, hh:mm:ss"`; the clock part is dropped once the
/// value has more digits than an `f64` holds exactly
pub fn convert_units_uptime(value: f64) -> String {
    let value = value.round();
    let mut rest = value.abs();
    let mut text = if value < 0.0 { "-".to_string() } else { String::new() };

    let days = (rest / SEC_PER_DAY as f64).floor();
    if days != 0.0 {
        let plural = if days == 1.0 { "day" } else { "days" };
        text.push_str(&format!("{} {plural}", format_float(days, 0)));
    }

    if rest < 10f64.powf(FLOAT_DIG) {
        if days != 0.0 {
            text.push_str(", ");
        }

        rest -= days * SEC_PER_DAY as f64;
        let hours = (rest / SEC_PER_HOUR as f64).floor();
        rest -= hours * SEC_PER_HOUR as f64;
        let minutes = (rest / SEC_PER_MIN as f64).floor();
        let seconds = rest - minutes * SEC_PER_MIN as f64;

        text.push_str(&format!("{hours:02}:{minutes:02}:{seconds:02}"));
    }

    text
}

/// Timestamp as a UTC `"%Y-%m-%d %H:%M:%S"` date; the bare number when it
/// is outside the calendar range
pub fn convert_units_unixtime(value: f64) -> String {
    DateTime::from_timestamp(value.floor() as i64, 0)
        .filter(|_| value.is_finite())
        .map(|date| date.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| format_float(value, ROUNDOFF_UNSUFFIXED))
}

// ============================================================================
// PREFIXED UNITS
// ============================================================================

/// Format a value with its units, e.g. `1536 B` -> `"1.5 KB"`.
///
/// `s`, `uptime` and `unixtime` get their own time formats and ignore `power`.
pub fn convert_units(value: f64, units: &str, power: Option<usize>) -> String {
    match units {
        "s" => return convert_units_s(value),
        "uptime" => return convert_units_uptime(value),
        "unixtime" => return convert_units_unixtime(value),
        _ => {}
    }

    let (units, blacklisted) = match units.strip_prefix('!') {
        Some(stripped) => (stripped, true),
        None => (units, BLACKLIST.contains(&units)),
    };

    let suffix = |result: String, unit_str: &str| {
        if unit_str.is_empty() {
            result
        } else {
            format!("{result} {unit_str}")
        }
    };

    if blacklisted || value.abs() < 1.0 {
        return suffix(format_float(value, ROUNDOFF_UNSUFFIXED), units);
    }

    let base = unit_base(units);

    let (result, prefix) = match power {
        Some(power) => {
            let power = if power < POWER_TABLE.len() && value != 0.0 {
                power
            } else {
                0
            };
            let decimals = if power == 0 { ROUNDOFF_UNSUFFIXED } else { ROUNDOFF_SUFFIXED };
            (format_float(value / base.powi(power as i32), decimals), POWER_TABLE[power])
        }
        None => {
            let mut chosen = (String::new(), "");
            for (power, prefix) in POWER_TABLE.iter().enumerate() {
                let scaled = value / base.powi(power as i32);
                let decimals = if power == 0 { ROUNDOFF_UNSUFFIXED } else { ROUNDOFF_SUFFIXED };
                chosen = (format_float(scaled, decimals), *prefix);

                if chosen.0.parse::<f64>().map_or(true, |v| v.abs() < base) {
                    break;
                }
            }
            chosen
        }
    };

    let unit_str = if result == "0" {
        units.to_string()
    } else {
        format!("{prefix}{units}")
    };

    suffix(result, &unit_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(1.5, 2), "1.5");
        assert_eq!(format_float(2.0, 4), "2");
        assert_eq!(format_float(0.123456, 4), "0.1235");
        assert_eq!(format_float(-0.00001, 2), "0");
    }

    #[test]
    fn test_decimal_prefixes() {
        assert_eq!(convert_units(1_500.0, "bps", None), "1.5 Kbps");
        assert_eq!(convert_units(2_000_000.0, "", None), "2 M");
        assert_eq!(convert_units(999.0, "", None), "999");
    }

    #[test]
    fn test_binary_prefixes() {
        assert_eq!(convert_units(1536.0, "B", None), "1.5 KB");
        assert_eq!(convert_units(1024.0 * 1024.0, "Bps", None), "1 MBps");
    }

    #[test]
    fn test_blacklisted_units() {
        assert_eq!(convert_units(1500.0, "%", None), "1500 %");
        assert_eq!(convert_units(2500.0, "!items", None), "2500 items");
    }

    #[test]
    fn test_fixed_power() {
        assert_eq!(convert_units(500.0, "B", Some(1)), "0.49 KB");
        assert_eq!(convert_units(0.5, "B", Some(1)), "0.5 B");
    }

    #[test]
    fn test_seconds() {
        assert_eq!(convert_units(0.0015, "s", None), "1.5ms");
        assert_eq!(convert_units(0.0, "s", None), "0");
        assert_eq!(convert_units(45.0, "s", None), "45s");
        assert_eq!(convert_units(90_061.0, "s", None), "1d 1h 1m");
        assert_eq!(convert_units(-3_725.0, "s", None), "-1h 2m 5s");
        assert_eq!(convert_units((SEC_PER_YEAR + SEC_PER_MONTH) as f64, "s", None), "1y 1m");
    }

    #[test]
    fn test_seconds_ignore_power() {
        let formatter = UnitFormatter::new("s").with_power(1);
        assert_eq!(formatter.format(120.0), "2m");
    }

    #[test]
    fn test_uptime() {
        assert_eq!(convert_units(90_061.0, "uptime", None), "1 day, 01:01:01");
        assert_eq!(convert_units(3_661.0, "uptime", None), "01:01:01");
        assert_eq!(convert_units(2.0 * SEC_PER_DAY as f64, "uptime", None), "2 days, 00:00:00");
        assert_eq!(convert_units(-61.0, "uptime", None), "-00:01:01");
    }

    #[test]
    fn test_unixtime() {
        assert_eq!(convert_units(1.7e9, "unixtime", None), "2023-11-14 22:13:20");
        assert_eq!(convert_units(0.0, "unixtime", None), "1970-01-01 00:00:00");
        assert_eq!(convert_units(1e300, "unixtime", None), format_float(1e300, ROUNDOFF_UNSUFFIXED));
    }

    #[test]
    fn test_formatter_strategy() {
        let formatter = UnitFormatter::new("B").with_power(2);
        assert_eq!(formatter.format(3.0 * 1024.0 * 1024.0), "3 MB");
    }
}
