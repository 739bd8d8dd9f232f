//! # overlay
//!
//! Horizontal threshold lines drawn across the plot: the per-side percentile
//! line of normal graphs and the trigger lines of alerting rules.

use crate::scale::AxisScale;
use graph_core::math::safe_mul;
use graph_core::units::convert_units;
use graph_core::{AxisSide, GraphKind, SeriesColumns, SeriesDescriptor};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

// ============================================================================
// INPUTS
// ============================================================================

/// Percentile line requested for one axis side
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentileLine {
    /// Percent in `(0, 100]`; zero or less disables the line
    pub percent: f64,
}

/// Threshold of an alerting rule bound to one axis side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerLine {
    #[serde(default)]
    pub side: AxisSide,
    pub value: f64,
    pub color: String,
    pub description: String,
    /// Comparison shown in the legend, e.g. `"[> 90]"`
    #[serde(default)]
    pub constant: String,
}

// ============================================================================
// OVERLAYS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OverlayKind {
    Percentile { percent: f64 },
    Trigger,
}

/// A horizontal line at a value of one axis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdOverlay {
    pub kind: OverlayKind,
    pub side: AxisSide,
    pub value: f64,
    /// Image row of the line
    pub y: f64,
    /// Trigger colour; percentile lines use the side's theme colour
    pub color: Option<String>,
    /// Legend text
    pub legend: String,
}

// ============================================================================
// CALCULATIONS
// ============================================================================

/// Nearest-rank percentile; `None` for no values or a non-positive percent
pub fn percentile(values: &[f64], percent: f64) -> Option<f64> {
    if values.is_empty() || percent <= 0.0 || !percent.is_finite() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = (percent / 100.0 * sorted.len() as f64).ceil() as usize;
    sorted.get(rank.clamp(1, sorted.len()) - 1).copied()
}

/// Image row of a value on an axis spanning `[min, max]`
pub fn value_to_pixel_y(value: f64, min: f64, max: f64, size_y: f64, shift_y: f64) -> f64 {
    let offset = if (max - min).is_infinite() {
        safe_mul(&[size_y, value / 10.0 - min / 10.0, 1.0 / (max / 10.0 - min / 10.0)])
    } else {
        safe_mul(&[size_y, value - min, 1.0 / (max - min)])
    };

    size_y + shift_y - offset
}

/// Plotted values of all columns with data, per axis side
fn values_by_side(series: &[SeriesDescriptor], columns: &[SeriesColumns]) -> BTreeMap<AxisSide, Vec<f64>> {
    let mut values: BTreeMap<AxisSide, Vec<f64>> = BTreeMap::new();

    for (descriptor, columns) in series.iter().zip(columns) {
        let side = values.entry(descriptor.axis_side).or_default();
        side.extend(
            columns
                .buckets
                .iter()
                .filter(|b| b.has_data())
                .map(|b| b.value(descriptor.calc_fnc)),
        );
    }

    values
}

/// Percentile value of each configured side, `None` where it is undefined
pub fn percentile_values(
    series: &[SeriesDescriptor],
    columns: &[SeriesColumns],
    lines: &BTreeMap<AxisSide, PercentileLine>,
) -> BTreeMap<AxisSide, Option<f64>> {
    let values = values_by_side(series, columns);

    lines
        .iter()
        .map(|(side, line)| {
            let value = values.get(side).and_then(|v| percentile(v, line.percent));
            (*side, value)
        })
        .collect()
}

/// Legend text of a percentile line
pub fn percentile_legend(side: AxisSide, percent: f64, value: Option<f64>, units: &str) -> String {
    let value = value.map_or_else(|| "-".to_string(), |v| convert_units(v, units, None));
    format!("{percent}th percentile: {value} ({side})")
}

/// Percentile lines of a normal graph.
///
/// A line is drawn for every side with a positive percent, an axis and a
/// non-zero percentile value.
pub fn percentile_overlays(
    kind: GraphKind,
    lines: &BTreeMap<AxisSide, PercentileLine>,
    values: &BTreeMap<AxisSide, Option<f64>>,
    scales: &BTreeMap<AxisSide, AxisScale>,
    units: &BTreeMap<AxisSide, String>,
    size_y: f64,
    shift_y: f64,
) -> Vec<ThresholdOverlay> {
    if kind.is_stacked() {
        return Vec::new();
    }

    lines
        .iter()
        .filter(|(_, line)| line.percent > 0.0)
        .filter_map(|(side, line)| {
            let scale = scales.get(side)?;
            let value = values.get(side).copied().flatten().filter(|v| *v != 0.0)?;
            let units = units.get(side).map_or("", String::as_str);

            Some(ThresholdOverlay {
                kind: OverlayKind::Percentile { percent: line.percent },
                side: *side,
                value,
                y: value_to_pixel_y(value, scale.min, scale.max, size_y, shift_y),
                color: None,
                legend: percentile_legend(*side, line.percent, Some(value), units),
            })
        })
        .collect()
}

/// Trigger lines strictly inside their axis range, at most `max_lines`
pub fn trigger_overlays(
    triggers: &[TriggerLine],
    scales: &BTreeMap<AxisSide, AxisScale>,
    size_y: f64,
    shift_y: f64,
    max_lines: usize,
) -> Vec<ThresholdOverlay> {
    if triggers.len() > max_lines {
        debug!(total = triggers.len(), max_lines, "trigger lines truncated");
    }

    triggers
        .iter()
        .take(max_lines)
        .filter_map(|trigger| {
            let scale = scales.get(&trigger.side)?;
            if scale.min >= trigger.value || trigger.value >= scale.max {
                return None;
            }

            Some(ThresholdOverlay {
                kind: OverlayKind::Trigger,
                side: trigger.side,
                value: trigger.value,
                y: value_to_pixel_y(trigger.value, scale.min, scale.max, size_y, shift_y),
                color: Some(trigger.color.clone()),
                legend: format!("{} {}", trigger.description, trigger.constant).trim_end().to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use graph_core::{ColumnBucket, DataSource};

    fn scale(min: f64, max: f64) -> AxisScale {
        AxisScale {
            min,
            max,
            interval: (max - min) / 5.0,
            power: 0,
            rows: 5,
        }
    }

    fn trigger(side: AxisSide, value: f64) -> TriggerLine {
        TriggerLine {
            side,
            value,
            color: "DD0000".to_string(),
            description: "High load".to_string(),
            constant: "[> 90]".to_string(),
        }
    }

    #[test]
    fn test_percentile_nearest_rank() {
        assert_eq!(percentile(&[10.0, 20.0, 30.0, 40.0], 50.0), Some(20.0));
        assert_eq!(percentile(&[40.0, 10.0, 30.0, 20.0], 90.0), Some(40.0));
        assert_eq!(percentile(&[40.0, 10.0, 30.0, 20.0], 100.0), Some(40.0));
        assert_eq!(percentile(&[5.0], 1.0), Some(5.0));
    }

    #[test]
    fn test_percentile_undefined() {
        assert_eq!(percentile(&[], 95.0), None);
        assert_eq!(percentile(&[1.0, 2.0], 0.0), None);
        assert_eq!(percentile(&[1.0, 2.0], -5.0), None);
    }

    #[test]
    fn test_value_to_pixel_y() {
        assert_eq!(value_to_pixel_y(50.0, 0.0, 100.0, 200.0, 10.0), 110.0);
        assert_eq!(value_to_pixel_y(0.0, 0.0, 100.0, 200.0, 10.0), 210.0);
        assert_eq!(value_to_pixel_y(100.0, 0.0, 100.0, 200.0, 10.0), 10.0);
    }

    #[test]
    fn test_value_to_pixel_y_infinite_span() {
        let y = value_to_pixel_y(0.0, -f64::MAX, f64::MAX, 100.0, 0.0);
        assert!(y.is_finite());
        assert!((y - 50.0).abs() < 1e-6);
    }

    #[test]
    fn test_percentile_values_by_side() {
        let series = vec![
            SeriesDescriptor::new("1", "a"),
            SeriesDescriptor::new("2", "b").with_side(AxisSide::Right),
        ];
        let mut left = SeriesColumns::empty(4, DataSource::History);
        for (i, bucket) in left.buckets.iter_mut().enumerate() {
            *bucket = ColumnBucket { count: 1, avg: (i as f64 + 1.0) * 10.0, ..Default::default() };
        }
        left.buckets[3].count = 0;
        let right = SeriesColumns::empty(4, DataSource::History);

        let lines = BTreeMap::from([
            (AxisSide::Left, PercentileLine { percent: 100.0 }),
            (AxisSide::Right, PercentileLine { percent: 95.0 }),
        ]);
        let values = percentile_values(&series, &[left, right], &lines);

        assert_eq!(values[&AxisSide::Left], Some(30.0));
        assert_eq!(values[&AxisSide::Right], None);
    }

    #[test]
    fn test_percentile_overlays_normal_only() {
        let lines = BTreeMap::from([(AxisSide::Left, PercentileLine { percent: 95.0 })]);
        let values = BTreeMap::from([(AxisSide::Left, Some(50.0))]);
        let scales = BTreeMap::from([(AxisSide::Left, scale(0.0, 100.0))]);
        let units = BTreeMap::from([(AxisSide::Left, "%".to_string())]);

        let overlays = percentile_overlays(GraphKind::Normal, &lines, &values, &scales, &units, 200.0, 0.0);
        assert_eq!(overlays.len(), 1);
        assert_eq!(overlays[0].y, 100.0);
        assert_eq!(overlays[0].legend, "95th percentile: 50 % (left)");

        let stacked = percentile_overlays(GraphKind::Stacked, &lines, &values, &scales, &units, 200.0, 0.0);
        assert!(stacked.is_empty());
    }

    #[test]
    fn test_zero_percentile_draws_nothing() {
        let lines = BTreeMap::from([(AxisSide::Left, PercentileLine { percent: 50.0 })]);
        let values = BTreeMap::from([(AxisSide::Left, Some(0.0))]);
        let scales = BTreeMap::from([(AxisSide::Left, scale(0.0, 100.0))]);

        let overlays =
            percentile_overlays(GraphKind::Normal, &lines, &values, &scales, &BTreeMap::new(), 200.0, 0.0);
        assert!(overlays.is_empty());
    }

    #[test]
    fn test_percentile_legend_without_value() {
        assert_eq!(percentile_legend(AxisSide::Right, 95.0, None, ""), "95th percentile: - (right)");
    }

    #[test]
    fn test_trigger_outside_range_skipped() {
        let scales = BTreeMap::from([(AxisSide::Left, scale(0.0, 100.0))]);
        let triggers = vec![
            trigger(AxisSide::Left, 90.0),
            trigger(AxisSide::Left, 100.0),
            trigger(AxisSide::Left, 150.0),
            trigger(AxisSide::Right, 50.0),
        ];

        let overlays = trigger_overlays(&triggers, &scales, 100.0, 0.0, 3);
        assert_eq!(overlays.len(), 1);
        assert_eq!(overlays[0].y, 10.0);
        assert_eq!(overlays[0].legend, "High load [> 90]");
        assert_eq!(overlays[0].color.as_deref(), Some("DD0000"));
    }

    #[test]
    fn test_trigger_limit() {
        let scales = BTreeMap::from([(AxisSide::Left, scale(0.0, 100.0))]);
        let triggers: Vec<TriggerLine> = (1..=5).map(|i| trigger(AxisSide::Left, i as f64 * 10.0)).collect();

        assert_eq!(trigger_overlays(&triggers, &scales, 100.0, 0.0, 3).len(), 3);
    }
}
