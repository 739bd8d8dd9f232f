//! # graph-core
//!
//! Core domain types for the line graph engine.
//! Series descriptors, sample rows and pixel-column buckets, plus the
//! overflow-safe numeric helpers every later stage builds on.

pub mod error;
pub mod interval;
pub mod math;
pub mod series;
pub mod tz;
pub mod units;
pub mod work_period;

pub use error::*;
pub use interval::*;
pub use series::*;
pub use tz::*;
pub use work_period::*;

use serde::{Deserialize, Serialize};

// ============================================================================
// TIME CONSTANTS
// ============================================================================

pub const SEC_PER_MIN: i64 = 60;
pub const SEC_PER_HOUR: i64 = 3_600;
pub const SEC_PER_DAY: i64 = 86_400;
pub const SEC_PER_WEEK: i64 = 7 * SEC_PER_DAY;
/// Nominal month used by the time grid table.
pub const SEC_PER_MONTH: i64 = 30 * SEC_PER_DAY;
/// Nominal year used by the time grid table.
pub const SEC_PER_YEAR: i64 = 365 * SEC_PER_DAY;

/// Binary unit base (`B`, `Bps`).
pub const KIBIBYTE: f64 = 1024.0;

// ============================================================================
// GRAPH-WIDE ENUMS
// ============================================================================

/// Vertical axis a series is plotted against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AxisSide {
    #[default]
    Left,
    Right,
}

impl AxisSide {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }

    /// Both sides, main side first
    pub fn all() -> &'static [Self] {
        &[Self::Left, Self::Right]
    }
}

impl std::fmt::Display for AxisSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Graph presentation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GraphKind {
    #[default]
    Normal,
    Stacked,
}

impl GraphKind {
    pub fn is_stacked(&self) -> bool {
        matches!(self, Self::Stacked)
    }
}

/// How one bound of the vertical axes is obtained
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum AxisBoundMode {
    #[default]
    Calculated,
    Fixed(f64),
    /// Last value of a designated item; `None` when the item has no value,
    /// in which case the bound is calculated from the data.
    ItemValue(Option<f64>),
}

impl AxisBoundMode {
    pub fn is_calculated(&self) -> bool {
        matches!(self, Self::Calculated)
    }

    /// Bound imposed by the operator, if any
    pub fn imposed(&self) -> Option<f64> {
        match self {
            Self::Calculated => None,
            Self::Fixed(value) => Some(*value),
            Self::ItemValue(value) => *value,
        }
    }
}

// ============================================================================
// ENGINE TUNING
// ============================================================================

/// Tuning constants of the engine.
///
/// The skip constants are environment specific and meant to be calibrated
/// per installation; the defaults match long-standing production values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Target width of one time grid cell, px
    pub cell_width: f64,
    /// Minimum height of one value grid row, px
    pub cell_height_min: f64,
    /// Allowed gap between samples, in columns, before a line breaks
    pub max_skip_cell: f64,
    /// Allowed gap between samples, in update intervals, before a line breaks
    pub max_skip_delay: f64,
    /// Trend aggregation period, seconds
    pub trend_diff_limit: i64,
    /// Rendered width of a time tick label, px
    pub label_width: f64,
    /// Maximum number of trigger lines drawn
    pub max_trigger_lines: usize,
    /// Work period shading is skipped above this window, seconds
    pub work_period_max_span: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cell_width: 30.0,
            cell_height_min: 30.0,
            max_skip_cell: 16.0,
            max_skip_delay: 4.0,
            trend_diff_limit: SEC_PER_HOUR,
            label_width: 11.0,
            max_trigger_lines: 3,
            work_period_max_span: 3 * SEC_PER_MONTH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_bound_mode_imposed() {
        assert_eq!(AxisBoundMode::Calculated.imposed(), None);
        assert_eq!(AxisBoundMode::Fixed(5.0).imposed(), Some(5.0));
        assert_eq!(AxisBoundMode::ItemValue(None).imposed(), None);
        assert_eq!(AxisBoundMode::ItemValue(Some(2.5)).imposed(), Some(2.5));
    }

    #[test]
    fn test_engine_config_partial_deserialize() {
        let config: EngineConfig = serde_json::from_str(r#"{"max_skip_cell": 8}"#).unwrap();
        assert_eq!(config.max_skip_cell, 8.0);
        assert_eq!(config.max_skip_delay, 4.0);
        assert_eq!(config.trend_diff_limit, 3600);
    }

    #[test]
    fn test_axis_bound_mode_serde() {
        let mode: AxisBoundMode = serde_json::from_str(r#"{"mode":"fixed","value":10.0}"#).unwrap();
        assert_eq!(mode, AxisBoundMode::Fixed(10.0));
    }
}
