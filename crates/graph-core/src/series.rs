//! Series descriptors, sample rows and pixel-column buckets

use crate::AxisSide;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static LOG_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(event)?log(rt)?\[").expect("static pattern"));

// ============================================================================
// SERIES ATTRIBUTES
// ============================================================================

/// Which aggregate of a column is plotted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CalcFunction {
    Min,
    #[default]
    Avg,
    Max,
    /// Min/max band plus the average line
    All,
}

impl CalcFunction {
    /// Legend label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Min => "min",
            Self::Avg => "avg",
            Self::Max => "max",
            Self::All => "all",
        }
    }
}

/// Whether a series takes part in calculated axis extremes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CalcType {
    #[default]
    Simple,
    Sum,
}

/// Draw style of a series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DrawStyle {
    #[default]
    Line,
    FilledRegion,
    BoldLine,
    Dot,
    DashedLine,
    GradientLine,
    BoldDot,
}

impl DrawStyle {
    /// Styles that fill down to a baseline and must survive clipping
    pub fn is_area(&self) -> bool {
        matches!(self, Self::FilledRegion | Self::GradientLine)
    }
}

/// Collection method of the monitored item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// Polled on a schedule
    #[default]
    Polled,
    /// Pushed by an active agent
    ActiveAgent,
    /// Pushed by a sender at arbitrary times
    Trapper,
}

/// Storage a series was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    History,
    Trends,
}

impl DataSource {
    pub fn label(&self) -> &'static str {
        match self {
            Self::History => "history",
            Self::Trends => "trends",
        }
    }
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ============================================================================
// SERIES DESCRIPTOR
// ============================================================================

fn default_color() -> String {
    "Dark Green".to_string()
}

fn default_delay() -> String {
    "1m".to_string()
}

fn default_history() -> String {
    "90d".to_string()
}

fn default_trends() -> String {
    "365d".to_string()
}

/// One monitored metric selected for a graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesDescriptor {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub key: String,
    /// Unit string, optionally `"short,long"`
    #[serde(default)]
    pub units: String,
    #[serde(default)]
    pub calc_fnc: CalcFunction,
    #[serde(default)]
    pub calc_type: CalcType,
    #[serde(default)]
    pub draw_style: DrawStyle,
    #[serde(default)]
    pub axis_side: AxisSide,
    #[serde(default)]
    pub item_kind: ItemKind,
    /// Update interval, e.g. `"30s"` or `"0;10s/1-5,09:00-18:00"`
    #[serde(default = "default_delay")]
    pub delay: String,
    /// History retention, e.g. `"90d"`
    #[serde(default = "default_history")]
    pub history: String,
    /// Trend retention, `"0"` disables trends
    #[serde(default = "default_trends")]
    pub trends: String,
    #[serde(default = "default_color")]
    pub color: String,
}

impl SeriesDescriptor {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            host: String::new(),
            key: String::new(),
            units: String::new(),
            calc_fnc: CalcFunction::default(),
            calc_type: CalcType::default(),
            draw_style: DrawStyle::default(),
            axis_side: AxisSide::default(),
            item_kind: ItemKind::default(),
            delay: default_delay(),
            history: default_history(),
            trends: default_trends(),
            color: default_color(),
        }
    }

    pub fn with_side(mut self, side: AxisSide) -> Self {
        self.axis_side = side;
        self
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = units.into();
        self
    }

    pub fn with_calc_fnc(mut self, calc_fnc: CalcFunction) -> Self {
        self.calc_fnc = calc_fnc;
        self
    }

    pub fn with_draw_style(mut self, draw_style: DrawStyle) -> Self {
        self.draw_style = draw_style;
        self
    }

    pub fn with_delay(mut self, delay: impl Into<String>) -> Self {
        self.delay = delay.into();
        self
    }

    pub fn with_kind(mut self, kind: ItemKind, key: impl Into<String>) -> Self {
        self.item_kind = kind;
        self.key = key.into();
        self
    }

    /// Short unit (part before the first comma)
    pub fn short_units(&self) -> &str {
        self.units.split_once(',').map_or(self.units.as_str(), |(short, _)| short)
    }

    /// Long unit caption (part after the first comma), empty if absent
    pub fn long_units(&self) -> &str {
        self.units.split_once(',').map_or("", |(_, long)| long)
    }

    /// Byte based units scale by 1024
    pub fn is_binary_units(&self) -> bool {
        matches!(self.short_units(), "B" | "Bps")
    }

    /// Items whose samples arrive irregularly and are always drawn connected
    pub fn draws_continuously(&self) -> bool {
        match self.item_kind {
            ItemKind::Trapper => true,
            ItemKind::ActiveAgent => LOG_KEY.is_match(&self.key),
            ItemKind::Polled => false,
        }
    }

    /// Legend caption
    pub fn caption(&self, single_host: bool) -> String {
        if single_host || self.host.is_empty() {
            self.name.clone()
        } else {
            format!("{}: {}", self.host, self.name)
        }
    }
}

// ============================================================================
// SAMPLES AND BUCKETS
// ============================================================================

/// One aggregated sample as returned by the history or trend store
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleRow {
    /// Unix timestamp, seconds
    pub clock: i64,
    /// Number of raw values aggregated; 0 means no data
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

impl SampleRow {
    pub fn new(clock: i64, count: u64, min: f64, max: f64, avg: f64) -> Self {
        Self { clock, count, min, max, avg }
    }

    /// Single raw value
    pub fn point(clock: i64, value: f64) -> Self {
        Self::new(clock, 1, value, value, value)
    }
}

/// One pixel column of one series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct ColumnBucket {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    /// Unix timestamp, fractional after interpolation
    pub clock: f64,
    pub shift_min: f64,
    pub shift_max: f64,
    pub shift_avg: f64,
}

impl ColumnBucket {
    pub fn has_data(&self) -> bool {
        self.count > 0
    }

    /// Plotted value for a calculation function (`All` plots the average)
    pub fn value(&self, calc: CalcFunction) -> f64 {
        match calc {
            CalcFunction::Min => self.min,
            CalcFunction::Max => self.max,
            CalcFunction::Avg | CalcFunction::All => self.avg,
        }
    }

    /// Stack shift matching [`ColumnBucket::value`]
    pub fn shift(&self, calc: CalcFunction) -> f64 {
        match calc {
            CalcFunction::Min => self.shift_min,
            CalcFunction::Max => self.shift_max,
            CalcFunction::Avg | CalcFunction::All => self.shift_avg,
        }
    }

    pub fn clear_shift(&mut self) {
        self.shift_min = 0.0;
        self.shift_max = 0.0;
        self.shift_avg = 0.0;
    }
}

/// Resampled columns of one series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesColumns {
    pub buckets: Vec<ColumnBucket>,
    /// Unweighted mean of the non-gap averages, before gap filling
    pub avg_orig: Option<f64>,
    pub source: DataSource,
}

impl SeriesColumns {
    pub fn empty(size_x: usize, source: DataSource) -> Self {
        Self {
            buckets: vec![ColumnBucket::default(); size_x],
            avg_orig: None,
            source,
        }
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Whether any sample fell inside the window
    pub fn has_data(&self) -> bool {
        self.avg_orig.is_some()
    }

    /// Value of the last column holding data
    pub fn last_value(&self, calc: CalcFunction) -> Option<f64> {
        self.buckets
            .iter()
            .rev()
            .find(|b| b.has_data())
            .map(|b| b.value(calc))
    }

    /// Smallest column minimum
    pub fn min_value(&self) -> Option<f64> {
        if !self.has_data() {
            return None;
        }
        self.buckets.iter().map(|b| b.min).reduce(f64::min)
    }

    /// Largest column maximum
    pub fn max_value(&self) -> Option<f64> {
        if !self.has_data() {
            return None;
        }
        self.buckets.iter().map(|b| b.max).reduce(f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_units_split() {
        let series = SeriesDescriptor::new("1", "Free space").with_units("B,Bytes free");
        assert_eq!(series.short_units(), "B");
        assert_eq!(series.long_units(), "Bytes free");
        assert!(series.is_binary_units());

        let plain = SeriesDescriptor::new("2", "Load").with_units("%");
        assert_eq!(plain.short_units(), "%");
        assert_eq!(plain.long_units(), "");
        assert!(!plain.is_binary_units());
    }

    #[test]
    fn test_draws_continuously() {
        let trapper = SeriesDescriptor::new("1", "t").with_kind(ItemKind::Trapper, "custom.key");
        assert!(trapper.draws_continuously());

        let log = SeriesDescriptor::new("2", "l").with_kind(ItemKind::ActiveAgent, "logrt[/var/log/app.log]");
        assert!(log.draws_continuously());

        let eventlog = SeriesDescriptor::new("3", "e").with_kind(ItemKind::ActiveAgent, "eventlog[System]");
        assert!(eventlog.draws_continuously());

        let active = SeriesDescriptor::new("4", "a").with_kind(ItemKind::ActiveAgent, "system.cpu.load");
        assert!(!active.draws_continuously());

        let polled = SeriesDescriptor::new("5", "p").with_kind(ItemKind::Polled, "log[x]");
        assert!(!polled.draws_continuously());
    }

    #[test]
    fn test_descriptor_defaults_from_json() {
        let series: SeriesDescriptor =
            serde_json::from_str(r#"{"id":"42","name":"CPU load","axis_side":"right"}"#).unwrap();
        assert_eq!(series.axis_side, AxisSide::Right);
        assert_eq!(series.calc_fnc, CalcFunction::Avg);
        assert_eq!(series.delay, "1m");
        assert_eq!(series.trends, "365d");
    }

    #[test]
    fn test_bucket_value_by_function() {
        let bucket = ColumnBucket {
            count: 2,
            min: 1.0,
            max: 9.0,
            avg: 4.0,
            shift_max: 3.0,
            ..Default::default()
        };
        assert_eq!(bucket.value(CalcFunction::Min), 1.0);
        assert_eq!(bucket.value(CalcFunction::Max), 9.0);
        assert_eq!(bucket.value(CalcFunction::All), 4.0);
        assert_eq!(bucket.shift(CalcFunction::Max), 3.0);
    }

    #[test]
    fn test_last_value_skips_gaps() {
        let mut columns = SeriesColumns::empty(3, DataSource::History);
        columns.buckets[0] = ColumnBucket { count: 1, avg: 5.0, ..Default::default() };
        columns.buckets[1] = ColumnBucket { count: 1, avg: 7.0, ..Default::default() };
        columns.buckets[2] = ColumnBucket { count: 0, avg: 7.0, ..Default::default() };
        columns.avg_orig = Some(6.0);
        assert_eq!(columns.last_value(CalcFunction::Avg), Some(7.0));
    }
}
