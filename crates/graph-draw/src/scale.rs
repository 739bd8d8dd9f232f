//! # scale
//!
//! Vertical axis scales: data extremes per side, nice bounds and intervals,
//! and the labelled ticks of the value axis.

use crate::chartkit::nice_step;
use graph_core::units::{UnitFormatter, ValueFormatter};
use graph_core::{
    AxisBoundMode, AxisSide, CalcFunction, CalcType, GraphError, GraphKind, KIBIBYTE, Result,
    SeriesColumns, SeriesDescriptor,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Highest index into the unit prefix table
const MAX_POWER: usize = 8;

/// Resolved scale of one vertical axis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisScale {
    pub min: f64,
    pub max: f64,
    /// Value distance between two grid rows
    pub interval: f64,
    /// Unit prefix power used for tick labels
    pub power: usize,
    pub rows: usize,
}

/// Lower and upper bound configuration shared by both sides
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct AxisBounds {
    #[serde(default)]
    pub min: AxisBoundMode,
    #[serde(default)]
    pub max: AxisBoundMode,
}

impl AxisBounds {
    pub fn fixed(min: f64, max: f64) -> Self {
        Self {
            min: AxisBoundMode::Fixed(min),
            max: AxisBoundMode::Fixed(max),
        }
    }
}

/// Allowed number of grid rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowRange {
    pub min: usize,
    pub max: usize,
}

impl RowRange {
    /// Rows that fit a plot of `size_y` pixels
    pub fn from_height(size_y: usize, cell_height_min: f64) -> Self {
        let rows = size_y as f64 / cell_height_min;
        Self {
            min: ((rows / 1.5).floor() as usize).max(1),
            max: (rows.floor() as usize).max(1),
        }
    }

    pub fn exactly(rows: usize) -> Self {
        Self {
            min: rows,
            max: rows,
        }
    }
}

/// Labelled tick of a value axis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleTick {
    /// 0 at the bottom of the plot, 1 at the top
    pub relative_pos: f64,
    pub value: f64,
    pub label: String,
}

// ============================================================================
// DATA EXTREMES
// ============================================================================

/// Column values of a series as they are plotted, stack shift included
fn plotted_values(
    columns: &SeriesColumns,
    calc: CalcFunction,
    kind: GraphKind,
) -> impl Iterator<Item = f64> + '_ {
    columns.buckets.iter().map(move |bucket| {
        let value = bucket.value(calc);
        if kind.is_stacked() && bucket.has_data() {
            value + bucket.shift(calc)
        } else {
            value
        }
    })
}

fn side_extreme(
    side: AxisSide,
    series: &[SeriesDescriptor],
    columns: &[SeriesColumns],
    kind: GraphKind,
    pick: fn(CalcFunction) -> CalcFunction,
    fold: fn(f64, f64) -> f64,
) -> Option<f64> {
    series
        .iter()
        .zip(columns)
        .filter(|(descriptor, data)| {
            descriptor.axis_side == side && descriptor.calc_type == CalcType::Simple && data.has_data()
        })
        .flat_map(|(descriptor, data)| plotted_values(data, pick(descriptor.calc_fnc), kind))
        .reduce(fold)
}

/// Value range a side has to show before rounding.
///
/// Imposed bounds win; otherwise the extremes of the simple series on that
/// side. `all` series contribute their minimum to the lower and their
/// maximum to the upper bound. Sides without data default to `[0, 1]`.
pub fn axis_extremes(
    side: AxisSide,
    series: &[SeriesDescriptor],
    columns: &[SeriesColumns],
    bounds: &AxisBounds,
    kind: GraphKind,
) -> (f64, f64) {
    let min = bounds.min.imposed().or_else(|| {
        side_extreme(
            side,
            series,
            columns,
            kind,
            |calc| match calc {
                CalcFunction::All => CalcFunction::Min,
                other => other,
            },
            f64::min,
        )
    });

    let max = bounds.max.imposed().or_else(|| {
        side_extreme(
            side,
            series,
            columns,
            kind,
            |calc| match calc {
                CalcFunction::All => CalcFunction::Max,
                other => other,
            },
            f64::max,
        )
    });

    let mut min = min.unwrap_or(0.0);
    let max = max.unwrap_or(1.0);

    if kind.is_stacked() && bounds.min.is_calculated() {
        min = min.min(0.0);
    }

    trace!(%side, min, max, "axis extremes");
    (min, max)
}

// ============================================================================
// NICE BOUNDS
// ============================================================================

/// Nice interval not below `rough`; binary axes step in 1024 multiples
fn nice_interval(rough: f64, is_binary: bool) -> f64 {
    if !is_binary || !rough.is_finite() || rough <= 0.0 {
        return nice_step(rough);
    }

    let mut unit = 1.0;
    while rough >= unit * KIBIBYTE {
        unit *= KIBIBYTE;
    }

    // Past 100 a unit steps in powers of two so ticks land on 1/4, 1/2 and 1
    // of the next unit.
    let residual = rough / unit;
    let step = if residual <= 100.0 {
        nice_step(residual)
    } else {
        2f64.powf(residual.log2().ceil())
    };

    step * unit
}

fn unit_power(min: f64, max: f64, is_binary: bool) -> usize {
    let base = if is_binary { KIBIBYTE } else { 1000.0 };
    let magnitude = min.abs().max(max.abs());

    let mut power = 0;
    let mut unit = base;
    while power < MAX_POWER && magnitude >= unit {
        power += 1;
        unit *= base;
    }

    power
}

/// Intervals between `a` and `b`, dividing first when the span overflows
fn steps(a: f64, b: f64, interval: f64) -> f64 {
    let steps = (b - a) / interval;
    if steps.is_finite() {
        steps
    } else {
        b / interval - a / interval
    }
}

/// Bounds and row count produced by an interval
fn fit(min: f64, max: f64, calc_min: bool, calc_max: bool, interval: f64) -> (f64, f64, usize) {
    let (lo, hi) = match (calc_min, calc_max) {
        (true, true) => ((min / interval).floor() * interval, (max / interval).ceil() * interval),
        (false, _) => (min, min + steps(min, max, interval).ceil() * interval),
        (true, false) => (max - steps(min, max, interval).ceil() * interval, max),
    };

    let rows = steps(lo, hi, interval).round().max(1.0) as usize;
    (lo, hi, rows)
}

/// Bounds with exactly `rows` rows, widening the interval when needed.
///
/// `None` when no nice interval keeps the bounds finite.
fn fit_exactly(
    min: f64,
    max: f64,
    calc_min: bool,
    calc_max: bool,
    rows: usize,
    is_binary: bool,
) -> Option<(f64, f64, f64)> {
    let mut interval = nice_interval(max / rows as f64 - min / rows as f64, is_binary);
    if !interval.is_finite() {
        return None;
    }
    let (mut lo, mut hi, mut real) = fit(min, max, calc_min, calc_max, interval);

    for _ in 0..64 {
        if real <= rows {
            break;
        }
        interval = nice_interval(interval * 1.5, is_binary);
        if !interval.is_finite() {
            return None;
        }
        (lo, hi, real) = fit(min, max, calc_min, calc_max, interval);
    }

    let missing = rows.saturating_sub(real) as f64;
    if calc_max {
        hi += missing * interval;
    } else {
        lo -= missing * interval;
    }

    (lo.is_finite() && hi.is_finite() && lo < hi).then_some((lo, hi, interval))
}

/// Bounds kept as they are and split into `rows` equal rows.
///
/// The interval saturates at `f64::MAX` when a single row spans more than
/// the largest finite value.
fn spread(min: f64, max: f64, rows: usize, power: usize) -> AxisScale {
    AxisScale {
        min,
        max,
        interval: (max / rows as f64 - min / rows as f64).min(f64::MAX),
        power,
        rows,
    }
}

/// Human-friendly bounds, interval and unit power of a vertical axis.
///
/// Calculated bounds are rounded outwards to multiples of a nice interval
/// (1, 2 or 5 times a power of ten; binary axes additionally scale by powers
/// of 1024). The row count is searched in `[rows_min, rows_max]` and the
/// candidate that wastes the least of the plot wins.
pub fn calculate_extremes(
    min: f64,
    max: f64,
    is_binary: bool,
    calc_min: bool,
    calc_max: bool,
    rows_min: usize,
    rows_max: usize,
) -> Result<AxisScale> {
    let rows_min = rows_min.max(1);
    let rows_max = rows_max.max(rows_min);

    if !calc_min && !calc_max && max <= min {
        return Err(GraphError::InvalidAxisRange { min, max });
    }

    let (mut min, mut max) = (min, max);

    if min >= max {
        match (calc_min, calc_max) {
            (true, true) => {
                if max > 0.0 {
                    min = 0.0;
                } else if max < 0.0 {
                    max = 0.0;
                } else {
                    max = 1.0;
                }
            }
            (false, _) => max = min + if min == 0.0 { 1.0 } else { min.abs() },
            (true, false) => min = max - if max == 0.0 { 1.0 } else { max.abs() },
        }
    }

    let power = unit_power(min, max, is_binary);

    // Both bounds imposed: split the range evenly, preferring a nice row height.
    if !calc_min && !calc_max {
        let rows = (rows_min..=rows_max)
            .find(|&rows| {
                let interval = max / rows as f64 - min / rows as f64;
                let nice = nice_interval(interval, is_binary);
                ((nice - interval) / interval).abs() < 1e-9
            })
            .unwrap_or(rows_max);

        return Ok(spread(min, max, rows, power));
    }

    let span_unit = min.abs().max(max.abs());
    let span = max / span_unit - min / span_unit;

    if !span.is_finite() || span <= 0.0 {
        return Ok(spread(min, max, rows_max, power));
    }

    let mut best: Option<(f64, AxisScale)> = None;

    for rows in rows_min..=rows_max {
        let raw = max / rows as f64 - min / rows as f64;
        let interval = nice_interval(raw, is_binary);
        if !interval.is_finite() || interval <= 0.0 {
            continue;
        }

        let (lo, hi, real_rows) = fit(min, max, calc_min, calc_max, interval);
        if !lo.is_finite() || !hi.is_finite() || real_rows < rows_min || real_rows > rows_max {
            continue;
        }

        let waste = (hi / span_unit - lo / span_unit) / span;
        if best.as_ref().is_none_or(|(best_waste, _)| waste < *best_waste) {
            best = Some((
                waste,
                AxisScale {
                    min: lo,
                    max: hi,
                    interval,
                    power,
                    rows: real_rows,
                },
            ));
        }
    }

    let scale = match best {
        Some((_, scale)) => scale,
        None => match fit_exactly(min, max, calc_min, calc_max, rows_max, is_binary) {
            Some((lo, hi, interval)) => AxisScale {
                min: lo,
                max: hi,
                interval,
                power,
                rows: rows_max,
            },
            None => {
                debug!(min, max, "rounded bounds overflow, keeping data bounds");
                spread(min, max, rows_max, power)
            }
        },
    };

    Ok(AxisScale {
        power: unit_power(scale.min, scale.max, is_binary),
        ..scale
    })
}

// ============================================================================
// TICKS
// ============================================================================

/// Labelled ticks from the lower to the upper bound of a scale
pub fn scale_values(scale: &AxisScale, units: &str) -> Vec<ScaleTick> {
    let formatter = UnitFormatter::new(units).with_power(scale.power);
    let rows = scale.rows.max(1);
    let span = scale.max - scale.min;

    (0..=rows)
        .map(|row| {
            let t = row as f64 / rows as f64;
            let value = if row == rows {
                scale.max
            } else if span.is_finite() {
                scale.min + row as f64 * scale.interval
            } else {
                scale.min * (1.0 - t) + scale.max * t
            };

            let relative_pos = if span.is_finite() && span > 0.0 {
                (value - scale.min) / span
            } else {
                t
            };

            ScaleTick {
                relative_pos,
                value,
                label: formatter.format(value),
            }
        })
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
