//! # render
//!
//! Drawable primitives of a line graph.
//!
//! Every series is walked column by column. Consecutive columns holding data
//! are joined by a segment in the series' draw style unless the time between
//! them is too long for the item's update interval; two such breaks in a row
//! leave a bold dot so isolated values stay visible. Coordinates are image
//! pixels: x grows to the right from the image edge, y grows downwards.

use crate::chartkit::ValueScale;
use crate::scale::ScaleTick;
use crate::time_grid::TimeTick;
use crate::GraphDimensions;
use graph_core::units::convert_units;
use graph_core::{
    AxisSide, CalcFunction, ColumnBucket, DataSource, DrawStyle, EngineConfig, GraphKind, SeriesColumns,
    SeriesDescriptor, UpdateInterval,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::trace;

// ============================================================================
// PRIMITIVES
// ============================================================================

/// Colour role of a primitive; the rasterizer maps roles to colours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "role", content = "value", rename_all = "snake_case")]
pub enum Paint {
    /// Colour of the series at this index
    Series(usize),
    ValueMax,
    ValueMin,
    ValueMinMax,
    Grid,
    MainGrid,
    ZeroLine(AxisSide),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineStyle {
    Normal,
    Bold,
    Dashed,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Primitive {
    Line {
        from: Point,
        to: Point,
        style: LineStyle,
        paint: Paint,
    },
    Polygon {
        points: Vec<Point>,
        paint: Paint,
    },
    Dot {
        at: Point,
        paint: Paint,
    },
    BoldDot {
        at: Point,
        paint: Paint,
    },
    /// Line with a fill fading towards the plot bottom
    Gradient {
        from: Point,
        to: Point,
        bottom: f64,
        paint: Paint,
    },
}

impl Primitive {
    pub fn paint(&self) -> Paint {
        match self {
            Self::Line { paint, .. }
            | Self::Polygon { paint, .. }
            | Self::Dot { paint, .. }
            | Self::BoldDot { paint, .. }
            | Self::Gradient { paint, .. } => *paint,
        }
    }

    fn line(from: Point, to: Point, style: LineStyle, paint: Paint) -> Self {
        Self::Line { from, to, style, paint }
    }
}

// ============================================================================
// CLIPPING
// ============================================================================

/// Clamp both ends of a segment into `[top, top + height]`.
///
/// A segment lying entirely above or below the plot is dropped, except for
/// styles that fill down to a baseline: those still cover the plot.
pub fn limit_to_bounds(y1: f64, y2: f64, top: f64, height: f64, style: DrawStyle) -> Option<(f64, f64)> {
    let bottom = top + height;

    let beyond = (y1 > bottom && y2 > bottom) || (y1 < top && y2 < top);
    if beyond && !style.is_area() {
        return None;
    }

    Some((clamp_row(y1, top, bottom).0, clamp_row(y2, top, bottom).0))
}

/// Clamped row and whether clamping happened
fn clamp_row(y: f64, top: f64, bottom: f64) -> (f64, bool) {
    if y > bottom {
        (bottom, true)
    } else if y < top {
        (top, true)
    } else {
        (y, false)
    }
}

// ============================================================================
// BREAK DETECTION
// ============================================================================

/// When two columns of a series are joined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakRule {
    /// Always join
    pub continuous: bool,
    /// Expected seconds between samples
    pub delay: i64,
}

impl BreakRule {
    pub fn new(
        descriptor: &SeriesDescriptor,
        interval: &UpdateInterval,
        source: DataSource,
        config: &EngineConfig,
    ) -> Self {
        let mut delay = interval.effective_delay();
        let scheduled_only = interval.has_scheduling && delay == 0;

        // Trends hold one row per aggregation period.
        if source == DataSource::Trends && !scheduled_only {
            delay = delay.max(config.trend_diff_limit);
        }

        Self {
            continuous: descriptor.draws_continuously() || scheduled_only,
            delay,
        }
    }

    /// Whether samples `diff` seconds apart are joined at `cell` seconds per column
    pub fn connects(&self, diff: f64, cell: f64, config: &EngineConfig) -> bool {
        if self.continuous {
            return true;
        }

        let delay = self.delay as f64;
        if cell > delay {
            diff < config.max_skip_cell * cell
        } else {
            diff < config.max_skip_delay * delay
        }
    }
}

// ============================================================================
// SERIES SEGMENTS
// ============================================================================

/// Image row of a column value including its stack shift
fn value_row(bucket: &ColumnBucket, calc: CalcFunction, scale: &ValueScale) -> f64 {
    scale.y(bucket.value(calc) + bucket.shift(calc))
}

/// Primitives joining column `from` to the earlier column `to`.
///
/// `from` is drawn at its left pixel edge and `to` at its own column, so
/// adjacent segments touch.
#[allow(clippy::too_many_arguments)]
fn segment(
    index: usize,
    (from, a): (usize, &ColumnBucket),
    (to, b): (usize, &ColumnBucket),
    style: DrawStyle,
    calc: CalcFunction,
    scale: &ValueScale,
    dims: &GraphDimensions,
) -> Vec<Primitive> {
    let x1 = from as f64 + dims.plot_left() - 1.0;
    let x2 = to as f64 + dims.plot_left();
    let (top, bottom) = (scale.top(), scale.bottom());
    let paint = Paint::Series(index);

    // Band edges of `all` are clamped on their own.
    let row = |bucket: &ColumnBucket, calc| clamp_row(value_row(bucket, calc, scale), top, bottom);
    let (y1max, y1x) = row(a, CalcFunction::Max);
    let (y2max, y2x) = row(b, CalcFunction::Max);
    let (y1min, y1n) = row(a, CalcFunction::Min);
    let (y2min, y2n) = row(b, CalcFunction::Min);

    let Some((y1, y2)) = limit_to_bounds(
        value_row(a, calc, scale),
        value_row(b, calc, scale),
        top,
        scale.size_y(),
        style,
    ) else {
        return Vec::new();
    };

    let Some((y1_shift, y2_shift)) = limit_to_bounds(
        scale.baseline_y(a.shift(calc)),
        scale.baseline_y(b.shift(calc)),
        top,
        scale.size_y(),
        style,
    ) else {
        return Vec::new();
    };

    let (p1, p2) = (Point::new(x1, y1), Point::new(x2, y2));

    match style {
        DrawStyle::Line | DrawStyle::BoldLine => {
            let line_style = if style == DrawStyle::BoldLine { LineStyle::Bold } else { LineStyle::Normal };
            let mut primitives = Vec::with_capacity(4);

            if calc == CalcFunction::All {
                primitives.push(Primitive::Polygon {
                    points: vec![
                        Point::new(x1, y1max),
                        Point::new(x1, y1min),
                        Point::new(x2, y2min),
                        Point::new(x2, y2max),
                    ],
                    paint: Paint::ValueMinMax,
                });
                if !y1x || !y2x {
                    primitives.push(Primitive::line(
                        Point::new(x1, y1max),
                        Point::new(x2, y2max),
                        line_style,
                        Paint::ValueMax,
                    ));
                }
                if !y1n || !y2n {
                    primitives.push(Primitive::line(
                        Point::new(x1, y1min),
                        Point::new(x2, y2min),
                        line_style,
                        Paint::ValueMin,
                    ));
                }
            }

            primitives.push(Primitive::line(p1, p2, line_style, paint));
            primitives
        }
        DrawStyle::FilledRegion => vec![Primitive::Polygon {
            points: vec![p1, Point::new(x1, y1_shift), Point::new(x2, y2_shift), p2],
            paint,
        }],
        DrawStyle::Dot => vec![Primitive::Dot { at: p1, paint }],
        DrawStyle::BoldDot => vec![Primitive::BoldDot { at: p2, paint }],
        DrawStyle::DashedLine => vec![Primitive::line(p1, p2, LineStyle::Dashed, paint)],
        DrawStyle::GradientLine => vec![Primitive::Gradient {
            from: p1,
            to: p2,
            bottom,
            paint,
        }],
    }
}

/// Primitives of one series.
///
/// Empty columns are skipped, except the last column which is always
/// visited so the line reaches the right edge once data resumes there.
#[allow(clippy::too_many_arguments)]
pub fn draw_series(
    index: usize,
    descriptor: &SeriesDescriptor,
    columns: &SeriesColumns,
    rule: &BreakRule,
    scale: &ValueScale,
    dims: &GraphDimensions,
    cell: f64,
    config: &EngineConfig,
) -> Vec<Primitive> {
    let buckets = &columns.buckets;
    let mut primitives = Vec::new();

    if !columns.has_data() || buckets.len() < 2 {
        return primitives;
    }

    let last = buckets.len() - 1;
    let mut prev_draw = true;
    let mut j = 0;
    let mut breaks = 0usize;

    for i in 1..buckets.len() {
        if !buckets[i].has_data() && i != last {
            continue;
        }

        let diff = (buckets[i].clock - buckets[j].clock).abs();
        let mut draw = rule.connects(diff, cell, config);

        let style = if !draw && !prev_draw {
            draw = true;
            DrawStyle::BoldDot
        } else {
            prev_draw = draw;
            descriptor.draw_style
        };

        if draw {
            primitives.extend(segment(
                index,
                (i, &buckets[i]),
                (j, &buckets[j]),
                style,
                descriptor.calc_fnc,
                scale,
                dims,
            ));
        } else {
            breaks += 1;
        }

        j = i;
    }

    trace!(series = %descriptor.id, primitives = primitives.len(), breaks, "series drawn");
    primitives
}

// ============================================================================
// GRID
// ============================================================================

/// Dashed horizontal lines at every tick above the lower bound
pub fn grid_lines(ticks: &[ScaleTick], dims: &GraphDimensions) -> Vec<Primitive> {
    ticks
        .iter()
        .filter(|tick| tick.relative_pos > 0.0)
        .map(|tick| {
            let y = dims.plot_top() + dims.size_y as f64 * (1.0 - tick.relative_pos);
            Primitive::line(
                Point::new(dims.plot_left(), y),
                Point::new(dims.plot_right(), y),
                LineStyle::Dashed,
                Paint::Grid,
            )
        })
        .collect()
}

/// Vertical lines of the time grid; main ticks solid, sub ticks dashed
pub fn time_grid_lines(ticks: &[TimeTick], dims: &GraphDimensions) -> Vec<Primitive> {
    ticks
        .iter()
        .map(|tick| {
            let x = dims.plot_left() + tick.x;
            let (style, paint) = if tick.main {
                (LineStyle::Normal, Paint::MainGrid)
            } else {
                (LineStyle::Dashed, Paint::Grid)
            };
            Primitive::line(Point::new(x, dims.plot_top()), Point::new(x, dims.plot_bottom()), style, paint)
        })
        .collect()
}

/// Zero line of a side when zero lies strictly inside the plot
pub fn zero_line(side: AxisSide, scale: &ValueScale, dims: &GraphDimensions) -> Option<Primitive> {
    scale.zero_inside().then(|| {
        Primitive::line(
            Point::new(dims.plot_left(), scale.zero),
            Point::new(dims.plot_right(), scale.zero),
            LineStyle::Normal,
            Paint::ZeroLine(side),
        )
    })
}

// ============================================================================
// WORK PERIOD
// ============================================================================

/// Working-time span shaded across the full plot height, image x
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorkBand {
    pub x1: f64,
    pub x2: f64,
}

/// Bands of working intervals inside `[from, to]`
pub fn work_bands(intervals: &[(i64, i64)], from: i64, to: i64, dims: &GraphDimensions) -> Vec<WorkBand> {
    let period = (to - from) as f64;
    if period <= 0.0 {
        return Vec::new();
    }

    let size_x = dims.size_x as f64;
    intervals
        .iter()
        .map(|&(start, end)| WorkBand {
            x1: ((start - from) as f64 * size_x / period).round() + dims.plot_left(),
            x2: ((end - from) as f64 * size_x / period).ceil() + dims.plot_left(),
        })
        .collect()
}

// ============================================================================
// LEGEND
// ============================================================================

/// Formatted statistics of a series with data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegendValues {
    pub last: String,
    pub min: String,
    pub avg: String,
    pub max: String,
}

/// One series row of the legend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegendRow {
    pub series: usize,
    pub caption: String,
    /// `[avg]`, `[all]`, ... or `[no data]`
    pub function: String,
    pub values: Option<LegendValues>,
}

/// Legend line of a threshold overlay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegendNote {
    /// Trigger colour; `None` for percentile lines
    pub color: Option<String>,
    pub text: String,
}

fn legend_row(index: usize, descriptor: &SeriesDescriptor, columns: &SeriesColumns, single_host: bool) -> LegendRow {
    let caption = descriptor.caption(single_host);
    let units = descriptor.short_units();
    let format = |value: Option<f64>| value.map_or_else(String::new, |v| convert_units(v, units, None));

    match columns.avg_orig {
        Some(avg) => LegendRow {
            series: index,
            caption,
            function: format!("[{}]", descriptor.calc_fnc.label()),
            values: Some(LegendValues {
                last: format(columns.last_value(descriptor.calc_fnc)),
                min: format(columns.min_value()),
                avg: format(Some(avg)),
                max: format(columns.max_value()),
            }),
        },
        None => LegendRow {
            series: index,
            caption,
            function: "[no data]".to_string(),
            values: None,
        },
    }
}

/// Series rows; stacked graphs list the top of the stack first
pub fn legend_rows(series: &[SeriesDescriptor], columns: &[SeriesColumns], kind: GraphKind) -> Vec<LegendRow> {
    let hosts: BTreeSet<&str> = series.iter().map(|s| s.host.as_str()).collect();
    let single_host = hosts.len() <= 1;

    let mut rows: Vec<LegendRow> = series
        .iter()
        .zip(columns)
        .enumerate()
        .map(|(idx, (descriptor, columns))| legend_row(idx, descriptor, columns, single_host))
        .collect();

    if kind.is_stacked() {
        rows.reverse();
    }

    rows
}

// ============================================================================
// AXIS UNITS
// ============================================================================

/// Units shown on one vertical axis
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideUnits {
    /// Common unit of the side's series, empty when they differ
    pub units: String,
    /// Axis caption from the last series declaring one
    pub units_long: String,
    pub is_binary: bool,
}

pub fn side_units(side: AxisSide, series: &[SeriesDescriptor]) -> SideUnits {
    let mut common: Option<&str> = None;
    let mut result = SideUnits::default();

    for descriptor in series.iter().filter(|s| s.axis_side == side) {
        let units = descriptor.short_units();
        result.is_binary |= descriptor.is_binary_units();

        common = match common {
            None => Some(units),
            Some(prev) if prev == units => Some(prev),
            Some(_) => Some(""),
        };

        if !descriptor.long_units().is_empty() {
            result.units_long = descriptor.long_units().to_string();
        }
    }

    result.units = common.unwrap_or_default().to_string();
    result
}

/// Storages that fed the graph
pub fn data_sources(columns: &[SeriesColumns]) -> Vec<DataSource> {
    columns
        .iter()
        .map(|c| c.source)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
