//! # graph-draw
//!
//! Turns resampled time series into a rasterizer-independent description of
//! a line graph: drawable primitives, axis scales, time grid, threshold
//! overlays and legend rows.
//!
//! ## Architecture
//!
//! Uses Strategy pattern for:
//! - Scale computation (value axis, time columns)
//! - Value formatting on axes and in the legend
//! - Time zone rules behind the calendar grid
//!
//! ## Modules
//!
//! - `chartkit` - Core primitives: value and column scales, nice numbers
//! - `scale` - Axis extremes, row count and tick values
//! - `time_grid` - Time interval selection and calendar-aligned ticks
//! - `resample` - Rows to pixel columns, gap filling, source selection
//! - `stack` - Stacked graph baselines
//! - `overlay` - Percentile and trigger lines
//! - `render` - Series segments, grid lines, bands and legend
//! - `context` - The render pipeline

pub mod chartkit;
pub mod context;
pub mod overlay;
pub mod render;
pub mod resample;
pub mod scale;
pub mod stack;
pub mod time_grid;

pub use chartkit::*;
pub use context::*;
pub use overlay::*;
pub use render::*;
pub use resample::*;
pub use scale::*;
pub use stack::*;
pub use time_grid::*;

use serde::{Deserialize, Serialize};

/// Side margin next to a drawn vertical axis, px
pub const AXIS_MARGIN: f64 = 85.0;
/// Side margin without a vertical axis, px
pub const BARE_MARGIN: f64 = 30.0;
/// Top margin above the plot, px
pub const TOP_MARGIN: f64 = 17.0;
/// Space between the plot and the legend, px
pub const LEGEND_OFFSET_Y: f64 = 90.0;
/// Height of one legend row, px
pub const LEGEND_ROW_HEIGHT: f64 = 14.0;

/// Graph margin configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GraphMargin {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl GraphMargin {
    pub const fn new(top: f64, right: f64, bottom: f64, left: f64) -> Self {
        Self { top, right, bottom, left }
    }

    /// Margins for the vertical axes in use
    pub const fn for_axes(left: bool, right: bool) -> Self {
        Self::new(
            TOP_MARGIN,
            if right { AXIS_MARGIN } else { BARE_MARGIN },
            LEGEND_OFFSET_Y,
            if left { AXIS_MARGIN } else { BARE_MARGIN },
        )
    }
}

impl Default for GraphMargin {
    fn default() -> Self {
        Self::for_axes(true, false)
    }
}

/// Plot dimensions with margin and legend handling
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GraphDimensions {
    /// Plot width, one column per pixel
    pub size_x: usize,
    /// Plot height, px
    pub size_y: usize,
    pub margin: GraphMargin,
    /// Rows reserved below the plot for the legend
    pub legend_rows: usize,
}

impl GraphDimensions {
    pub fn new(size_x: usize, size_y: usize) -> Self {
        Self {
            size_x,
            size_y,
            margin: GraphMargin::default(),
            legend_rows: 0,
        }
    }

    pub fn with_margin(mut self, margin: GraphMargin) -> Self {
        self.margin = margin;
        self
    }

    pub fn with_legend_rows(mut self, rows: usize) -> Self {
        self.legend_rows = rows;
        self
    }

    /// Image x of column 0
    pub fn plot_left(&self) -> f64 {
        self.margin.left
    }

    /// Image y of the plot top
    pub fn plot_top(&self) -> f64 {
        self.margin.top
    }

    /// Image y of the plot bottom
    pub fn plot_bottom(&self) -> f64 {
        self.margin.top + self.size_y as f64
    }

    /// Image x of the plot right edge
    pub fn plot_right(&self) -> f64 {
        self.margin.left + self.size_x as f64
    }

    /// Image width
    pub fn full_width(&self) -> f64 {
        self.size_x as f64 + self.margin.left + self.margin.right + 1.0
    }

    /// Image height including the legend
    pub fn full_height(&self) -> f64 {
        self.size_y as f64 + self.margin.top + self.margin.bottom + self.legend_rows as f64 * LEGEND_ROW_HEIGHT
    }
}

impl Default for GraphDimensions {
    fn default() -> Self {
        Self::new(900, 200)
    }
}
