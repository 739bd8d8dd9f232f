//! # context
//!
//! The render pipeline. A [`RenderContext`] carries every intermediate of one
//! render pass through the stages:
//!
//! validate → intervals → sources → resample → stack → extremes → scales →
//! percentiles → time grid → work period → primitives → overlays → legend
//!
//! Nothing outlives the call to [`render`].

use crate::chartkit::{ColumnScale, ValueScale};
use crate::overlay::{
    percentile_legend, percentile_overlays, percentile_values, trigger_overlays, PercentileLine,
    ThresholdOverlay, TriggerLine,
};
use crate::render::{
    data_sources, draw_series, grid_lines, legend_rows, side_units, time_grid_lines, work_bands, zero_line,
    BreakRule, LegendNote, LegendRow, Primitive, SideUnits, WorkBand,
};
use crate::resample::{resample, select_source};
use crate::scale::{axis_extremes, calculate_extremes, scale_values, AxisBounds, AxisScale, RowRange, ScaleTick};
use crate::stack::accumulate_shifts;
use crate::time_grid::{period_labels, select_interval, time_ticks, PeriodLabels, TimeGrid, TimeTick};
use crate::{GraphDimensions, GraphMargin};
use graph_core::{
    AxisSide, DataSource, DrawStyle, EngineConfig, GraphError, GraphKind, Result, Retention, SampleRow,
    SeriesColumns, SeriesDescriptor, UpdateInterval, UtcOffsetSource, WorkPeriods, in_calendar_range,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, trace, warn};

// ============================================================================
// REQUEST
// ============================================================================

fn default_true() -> bool {
    true
}

/// One series with the rows fetched from both storages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesInput {
    pub series: SeriesDescriptor,
    #[serde(default)]
    pub history: Vec<SampleRow>,
    #[serde(default)]
    pub trends: Vec<SampleRow>,
}

impl SeriesInput {
    pub fn new(series: SeriesDescriptor) -> Self {
        Self {
            series,
            history: Vec::new(),
            trends: Vec::new(),
        }
    }

    pub fn with_history(mut self, rows: Vec<SampleRow>) -> Self {
        self.history = rows;
        self
    }

    pub fn with_trends(mut self, rows: Vec<SampleRow>) -> Self {
        self.trends = rows;
        self
    }

    /// Rows of the preferred storage, or of the other one when only that
    /// one was supplied
    fn rows(&self, preferred: DataSource) -> (DataSource, &[SampleRow]) {
        match preferred {
            DataSource::History if self.history.is_empty() && !self.trends.is_empty() => {
                (DataSource::Trends, self.trends.as_slice())
            }
            DataSource::Trends if self.trends.is_empty() && !self.history.is_empty() => {
                (DataSource::History, self.history.as_slice())
            }
            DataSource::History => (DataSource::History, self.history.as_slice()),
            DataSource::Trends => (DataSource::Trends, self.trends.as_slice()),
        }
    }
}

/// Everything needed to render one graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderRequest {
    pub series: Vec<SeriesInput>,
    /// Window start, unix seconds
    pub from: i64,
    /// Window end, unix seconds, exclusive
    pub to: i64,
    /// Current time, decides whether history still covers the window
    pub now: i64,
    /// Plot width in pixels, one column each
    pub width: usize,
    /// Plot height in pixels
    pub height: usize,
    #[serde(default)]
    pub kind: GraphKind,
    #[serde(default)]
    pub bounds: AxisBounds,
    #[serde(default)]
    pub percentiles: BTreeMap<AxisSide, PercentileLine>,
    #[serde(default)]
    pub triggers: Vec<TriggerLine>,
    /// Working time, e.g. `"1-5,09:00-18:00"`
    #[serde(default)]
    pub work_period: Option<String>,
    #[serde(default = "default_true")]
    pub show_work_period: bool,
    #[serde(default = "default_true")]
    pub show_triggers: bool,
    #[serde(default = "default_true")]
    pub show_legend: bool,
}

impl RenderRequest {
    pub fn new(from: i64, to: i64, width: usize, height: usize) -> Self {
        Self {
            series: Vec::new(),
            from,
            to,
            now: to,
            width,
            height,
            kind: GraphKind::default(),
            bounds: AxisBounds::default(),
            percentiles: BTreeMap::new(),
            triggers: Vec::new(),
            work_period: None,
            show_work_period: true,
            show_triggers: true,
            show_legend: true,
        }
    }

    pub fn with_series(mut self, input: SeriesInput) -> Self {
        self.series.push(input);
        self
    }

    pub fn with_kind(mut self, kind: GraphKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_bounds(mut self, bounds: AxisBounds) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn with_now(mut self, now: i64) -> Self {
        self.now = now;
        self
    }

    pub fn with_percentile(mut self, side: AxisSide, percent: f64) -> Self {
        self.percentiles.insert(side, PercentileLine { percent });
        self
    }

    pub fn with_trigger(mut self, trigger: TriggerLine) -> Self {
        self.triggers.push(trigger);
        self
    }

    pub fn with_work_period(mut self, period: impl Into<String>) -> Self {
        self.work_period = Some(period.into());
        self
    }

    pub fn period(&self) -> i64 {
        self.to.saturating_sub(self.from)
    }
}

// ============================================================================
// OUTPUT
// ============================================================================

/// A vertical axis in use
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisOutput {
    pub side: AxisSide,
    pub scale: AxisScale,
    pub mapping: ValueScale,
    pub units: SideUnits,
    pub ticks: Vec<ScaleTick>,
}

/// Legend below the plot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Legend {
    pub items: Vec<LegendRow>,
    /// Percentile and trigger lines
    pub notes: Vec<LegendNote>,
}

/// Rasterizer-independent description of a graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderOutput {
    pub dimensions: GraphDimensions,
    pub axes: Vec<AxisOutput>,
    pub grid: TimeGrid,
    pub time_ticks: Vec<TimeTick>,
    pub period: PeriodLabels,
    /// Background lines first, then series in request order
    pub primitives: Vec<Primitive>,
    pub overlays: Vec<ThresholdOverlay>,
    pub work_bands: Vec<WorkBand>,
    pub legend: Option<Legend>,
    pub data_sources: Vec<DataSource>,
    /// Resampled columns per series, request order
    pub columns: Vec<SeriesColumns>,
}

impl RenderOutput {
    pub fn axis(&self, side: AxisSide) -> Option<&AxisOutput> {
        self.axes.iter().find(|axis| axis.side == side)
    }
}

// ============================================================================
// CONTEXT
// ============================================================================

/// State of one render pass
pub struct RenderContext<'a> {
    request: &'a RenderRequest,
    config: &'a EngineConfig,
    offsets: &'a dyn UtcOffsetSource,
    series: Vec<SeriesDescriptor>,
    intervals: Vec<UpdateInterval>,
    columns: Vec<SeriesColumns>,
    sides: Vec<AxisSide>,
    dims: GraphDimensions,
    scales: BTreeMap<AxisSide, AxisScale>,
    units: BTreeMap<AxisSide, SideUnits>,
    percentiles: BTreeMap<AxisSide, Option<f64>>,
}

impl<'a> RenderContext<'a> {
    /// Validate the request and parse per-series settings
    pub fn new(
        request: &'a RenderRequest,
        config: &'a EngineConfig,
        offsets: &'a dyn UtcOffsetSource,
    ) -> Result<Self> {
        if request.width == 0 || request.height == 0 {
            return Err(GraphError::InvalidDimensions {
                width: request.width,
                height: request.height,
            });
        }
        if request.to <= request.from || !in_calendar_range(request.from) || !in_calendar_range(request.to) {
            return Err(GraphError::InvalidTimeWindow {
                from: request.from,
                to: request.to,
            });
        }

        let series: Vec<SeriesDescriptor> = request
            .series
            .iter()
            .map(|input| {
                let mut descriptor = input.series.clone();
                if request.kind.is_stacked() {
                    descriptor.draw_style = DrawStyle::FilledRegion;
                }
                descriptor
            })
            .collect();

        let intervals = series
            .iter()
            .map(|s| UpdateInterval::parse(&s.delay))
            .collect::<Result<Vec<_>>>()?;

        let mut sides: Vec<AxisSide> = AxisSide::all()
            .iter()
            .copied()
            .filter(|side| series.iter().any(|s| s.axis_side == *side))
            .collect();
        if sides.is_empty() {
            sides.push(AxisSide::Left);
        }

        let units = sides.iter().map(|&side| (side, side_units(side, &series))).collect();

        let dims = GraphDimensions::new(request.width, request.height)
            .with_margin(GraphMargin::for_axes(
                sides.contains(&AxisSide::Left),
                sides.contains(&AxisSide::Right),
            ))
            .with_legend_rows(Self::legend_row_count(request, config, &sides));

        debug!(
            series = series.len(),
            width = request.width,
            height = request.height,
            period = request.period(),
            kind = ?request.kind,
            "render context created"
        );

        Ok(Self {
            request,
            config,
            offsets,
            series,
            intervals,
            columns: Vec::new(),
            sides,
            dims,
            scales: BTreeMap::new(),
            units,
            percentiles: BTreeMap::new(),
        })
    }

    fn legend_row_count(request: &RenderRequest, config: &EngineConfig, sides: &[AxisSide]) -> usize {
        if !request.show_legend {
            return 0;
        }

        let percentiles = if request.kind.is_stacked() {
            0
        } else {
            request
                .percentiles
                .iter()
                .filter(|(side, line)| line.percent > 0.0 && sides.contains(side))
                .count()
        };

        // One extra row pads the item table.
        request.series.len() + 1 + request.triggers.len().min(config.max_trigger_lines) + percentiles
    }

    /// Choose a storage per series and resample its rows
    pub fn select_data(&mut self) -> Result<()> {
        let request = self.request;

        self.columns = request
            .series
            .iter()
            .zip(&self.series)
            .map(|(input, descriptor)| {
                let retention = Retention::parse(&descriptor.history, &descriptor.trends)?;
                let source = select_source(
                    &retention,
                    request.now,
                    request.from,
                    request.period(),
                    request.width,
                    self.config,
                );

                let (used, rows) = input.rows(source);
                if used != source {
                    debug!(series = %descriptor.id, preferred = %source, %used, "falling back to supplied rows");
                }
                let source = used;
                if rows.is_empty() {
                    warn!(series = %descriptor.id, %source, "no rows for series");
                }

                let columns = resample(rows, request.width, request.from, request.to, request.kind, source);
                trace!(series = %descriptor.id, %source, rows = rows.len(), has_data = columns.has_data(), "series resampled");
                Ok(columns)
            })
            .collect::<Result<Vec<_>>>()?;

        if request.kind.is_stacked() {
            accumulate_shifts(&self.series, &mut self.columns);
        }

        Ok(())
    }

    /// Scales of the sides in use.
    ///
    /// When both bounds are calculated, later sides reuse the row count of
    /// the first so both grids line up.
    pub fn calc_scales(&mut self) -> Result<()> {
        let bounds = &self.request.bounds;
        let calc_min = bounds.min.is_calculated();
        let calc_max = bounds.max.is_calculated();
        let mut rows = RowRange::from_height(self.request.height, self.config.cell_height_min);

        for &side in &self.sides {
            let (min, max) = axis_extremes(side, &self.series, &self.columns, bounds, self.request.kind);
            let is_binary = self.units.get(&side).is_some_and(|u| u.is_binary);

            let scale = calculate_extremes(min, max, is_binary, calc_min, calc_max, rows.min, rows.max)?;
            debug!(%side, min = scale.min, max = scale.max, interval = scale.interval, rows = scale.rows, "axis scale");

            if calc_min && calc_max {
                rows = RowRange::exactly(scale.rows);
            }
            self.scales.insert(side, scale);
        }

        Ok(())
    }

    pub fn calc_percentiles(&mut self) {
        if self.request.kind.is_stacked() {
            return;
        }

        let lines: BTreeMap<AxisSide, PercentileLine> = self
            .request
            .percentiles
            .iter()
            .filter(|(side, _)| self.sides.contains(side))
            .map(|(side, line)| (*side, *line))
            .collect();

        self.percentiles = percentile_values(&self.series, &self.columns, &lines);
    }

    fn value_scale(&self, side: AxisSide) -> Option<ValueScale> {
        self.scales.get(&side).map(|scale| {
            ValueScale::new(scale.min, scale.max, self.request.height as f64, self.dims.plot_top())
        })
    }

    fn axes(&self) -> Vec<AxisOutput> {
        self.sides
            .iter()
            .filter_map(|&side| {
                let scale = *self.scales.get(&side)?;
                let units = self.units.get(&side).cloned().unwrap_or_default();
                Some(AxisOutput {
                    side,
                    scale,
                    mapping: self.value_scale(side)?,
                    ticks: scale_values(&scale, &units.units),
                    units,
                })
            })
            .collect()
    }

    fn work_bands(&self) -> Result<Vec<WorkBand>> {
        let request = self.request;
        let Some(text) = request.work_period.as_deref().filter(|_| request.show_work_period) else {
            return Ok(Vec::new());
        };

        if request.period() > self.config.work_period_max_span {
            debug!(period = request.period(), "window too long for work period shading");
            return Ok(Vec::new());
        }

        let periods = WorkPeriods::parse(text)?;
        let intervals = periods.intervals(request.from, request.to, self.offsets);
        Ok(work_bands(&intervals, request.from, request.to, &self.dims))
    }

    fn primitives(&self, axes: &[AxisOutput], ticks: &[TimeTick]) -> Vec<Primitive> {
        let request = self.request;
        let cell = ColumnScale::new(request.from, request.to, request.width).cell();
        let mut primitives = Vec::new();

        if let Some(main) = axes.first() {
            primitives.extend(grid_lines(&main.ticks, &self.dims));
        }
        primitives.extend(time_grid_lines(ticks, &self.dims));
        primitives.extend(axes.iter().filter_map(|axis| zero_line(axis.side, &axis.mapping, &self.dims)));

        for (idx, ((descriptor, columns), interval)) in
            self.series.iter().zip(&self.columns).zip(&self.intervals).enumerate()
        {
            let Some(axis) = axes.iter().find(|a| a.side == descriptor.axis_side) else {
                continue;
            };

            let rule = BreakRule::new(descriptor, interval, columns.source, self.config);
            primitives.extend(draw_series(
                idx,
                descriptor,
                columns,
                &rule,
                &axis.mapping,
                &self.dims,
                cell,
                self.config,
            ));
        }

        primitives
    }

    fn overlays(&self) -> Vec<ThresholdOverlay> {
        let request = self.request;
        let size_y = request.height as f64;
        let shift_y = self.dims.plot_top();
        let units: BTreeMap<AxisSide, String> =
            self.units.iter().map(|(side, u)| (*side, u.units.clone())).collect();

        let mut overlays = Vec::new();
        if request.show_triggers {
            overlays.extend(trigger_overlays(
                &request.triggers,
                &self.scales,
                size_y,
                shift_y,
                self.config.max_trigger_lines,
            ));
        }
        overlays.extend(percentile_overlays(
            request.kind,
            &request.percentiles,
            &self.percentiles,
            &self.scales,
            &units,
            size_y,
            shift_y,
        ));

        overlays
    }

    fn legend(&self) -> Option<Legend> {
        let request = self.request;
        if !request.show_legend {
            return None;
        }

        let mut notes = Vec::new();
        if !request.kind.is_stacked() {
            for (side, line) in &request.percentiles {
                if line.percent <= 0.0 || !self.sides.contains(side) {
                    continue;
                }
                let value = self.percentiles.get(side).copied().flatten().filter(|v| *v != 0.0);
                let units = self.units.get(side).map_or("", |u| u.units.as_str());
                notes.push(LegendNote {
                    color: None,
                    text: percentile_legend(*side, line.percent, value, units),
                });
            }
        }

        notes.extend(request.triggers.iter().take(self.config.max_trigger_lines).map(|trigger| LegendNote {
            color: Some(trigger.color.clone()),
            text: format!("{} {}", trigger.description, trigger.constant).trim_end().to_string(),
        }));

        Some(Legend {
            items: legend_rows(&self.series, &self.columns, request.kind),
            notes,
        })
    }

    /// Assemble the output from the computed state
    pub fn finish(self) -> Result<RenderOutput> {
        let request = self.request;
        let axes = self.axes();

        let grid = select_interval(request.width, request.period(), self.config.cell_width);
        let ticks = time_ticks(
            grid,
            request.from,
            request.to,
            request.width,
            self.config.label_width,
            self.offsets,
        );
        debug!(main = grid.main, sub = grid.sub, ticks = ticks.len(), "time grid");

        let work_bands = self.work_bands()?;
        let primitives = self.primitives(&axes, &ticks);
        let overlays = self.overlays();
        let legend = self.legend();

        debug!(primitives = primitives.len(), overlays = overlays.len(), "render finished");

        Ok(RenderOutput {
            dimensions: self.dims,
            axes,
            grid,
            time_ticks: ticks,
            period: period_labels(request.from, request.to, self.offsets),
            primitives,
            overlays,
            work_bands,
            legend,
            data_sources: data_sources(&self.columns),
            columns: self.columns,
        })
    }
}

/// Render one graph
pub fn render(request: &RenderRequest, config: &EngineConfig, offsets: &dyn UtcOffsetSource) -> Result<RenderOutput> {
    let mut context = RenderContext::new(request, config, offsets)?;
    context.select_data()?;
    context.calc_scales()?;
    context.calc_percentiles();
    context.finish()
}
