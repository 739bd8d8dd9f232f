//! # chartkit
//!
//! Core chart primitives: the value scale of a vertical axis, the column
//! scale of the time axis and nice-number rounding.
//! Implements Strategy pattern so primitives can be generated against any scale.

use serde::{Deserialize, Serialize};

// ============================================================================
// STRATEGY PATTERN: Scale Trait
// ============================================================================

/// Strategy trait for scales (maps domain values to pixel positions)
pub trait Scale: Send + Sync {
    /// Scale a value from domain to pixel
    fn scale(&self, value: f64) -> f64;

    /// Inverse scale (pixel to domain)
    fn invert(&self, pixel: f64) -> f64;
}

// ============================================================================
// VALUE SCALE
// ============================================================================

/// Vertical mapping of one axis side.
///
/// `zero` is the pixel row of the origin value `oxy`; values map through
/// `y = zero - (value - oxy) / unit2px`. The origin is the lower bound when
/// the axis is entirely positive, the upper bound when it is entirely
/// negative, and zero otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueScale {
    pub min: f64,
    pub max: f64,
    /// Value units per pixel, never zero
    pub unit2px: f64,
    /// Pixel row of `oxy`
    pub zero: f64,
    /// Origin value
    pub oxy: f64,
    size_y: f64,
    shift_y: f64,
}

impl ValueScale {
    pub fn new(min: f64, max: f64, size_y: f64, shift_y: f64) -> Self {
        // Divide first so the span cannot overflow.
        let mut unit2px = max / size_y - min / size_y;
        if unit2px == 0.0 {
            unit2px = 1.0;
        }

        let bottom = size_y + shift_y;

        let (zero, oxy) = if min > 0.0 {
            (bottom, if min > max { max } else { min })
        } else if max < 0.0 {
            (shift_y, if min > max { min } else { max })
        } else {
            (bottom - (min / unit2px).abs(), 0.0)
        };

        Self {
            min,
            max,
            unit2px,
            zero,
            oxy,
            size_y,
            shift_y,
        }
    }

    /// Pixel row of a value
    pub fn y(&self, value: f64) -> f64 {
        self.zero - (value - self.oxy) / self.unit2px
    }

    /// Pixel row of a stack baseline
    pub fn baseline_y(&self, shift: f64) -> f64 {
        let shift = if shift != 0.0 { shift - self.oxy } else { shift };
        self.zero - shift / self.unit2px
    }

    /// Top pixel row of the plot
    pub fn top(&self) -> f64 {
        self.shift_y
    }

    /// Bottom pixel row of the plot
    pub fn bottom(&self) -> f64 {
        self.size_y + self.shift_y
    }

    pub fn size_y(&self) -> f64 {
        self.size_y
    }

    /// Whether the zero row lies strictly inside the plot
    pub fn zero_inside(&self) -> bool {
        self.zero != self.top() && self.zero != self.bottom()
    }
}

impl Scale for ValueScale {
    fn scale(&self, value: f64) -> f64 {
        self.y(value)
    }

    fn invert(&self, pixel: f64) -> f64 {
        self.oxy + (self.zero - pixel) * self.unit2px
    }
}

// ============================================================================
// COLUMN SCALE
// ============================================================================

/// Time scale (maps timestamps to pixel columns)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnScale {
    from: i64,
    to: i64,
    size_x: usize,
    offset_x: f64,
}

impl ColumnScale {
    pub fn new(from: i64, to: i64, size_x: usize) -> Self {
        Self {
            from,
            to,
            size_x,
            offset_x: 0.0,
        }
    }

    /// Left edge of the plot in image coordinates
    pub fn with_offset(mut self, offset_x: f64) -> Self {
        self.offset_x = offset_x;
        self
    }

    pub fn period(&self) -> i64 {
        self.to.saturating_sub(self.from)
    }

    /// Seconds covered by one column
    pub fn cell(&self) -> f64 {
        self.period() as f64 / self.size_x as f64
    }

    /// Column a timestamp falls into, `None` outside `[from, to)`
    pub fn column(&self, timestamp: i64) -> Option<usize> {
        if timestamp < self.from || timestamp >= self.to || self.size_x == 0 {
            return None;
        }

        let offset = (timestamp - self.from) as i128 * self.size_x as i128 / self.period() as i128;
        usize::try_from(offset).ok().filter(|&idx| idx < self.size_x)
    }

    /// Plot-relative position of a timestamp
    pub fn position(&self, timestamp: i64) -> f64 {
        if self.period() == 0 {
            return 0.0;
        }
        timestamp.saturating_sub(self.from) as f64 * self.size_x as f64 / self.period() as f64
    }

    /// Image x of a column
    pub fn x(&self, column: usize) -> f64 {
        self.offset_x + column as f64
    }
}

impl Scale for ColumnScale {
    fn scale(&self, value: f64) -> f64 {
        self.offset_x + self.position(value as i64)
    }

    fn invert(&self, pixel: f64) -> f64 {
        self.from as f64 + (pixel - self.offset_x) * self.cell()
    }
}

// ============================================================================
// NICE NUMBERS
// ============================================================================

/// Smallest of 1, 2, 5 or 10 times a power of ten not below `rough`
pub fn nice_step(rough: f64) -> f64 {
    if !rough.is_finite() || rough <= 0.0 {
        return rough;
    }

    let magnitude = 10.0_f64.powf(rough.log10().floor());
    let residual = rough / magnitude;

    if residual <= 1.0 {
        magnitude
    } else if residual <= 2.0 {
        2.0 * magnitude
    } else if residual <= 5.0 {
        5.0 * magnitude
    } else {
        10.0 * magnitude
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_scale_mixed_sign() {
        let scale = ValueScale::new(-50.0, 150.0, 200.0, 10.0);
        assert_eq!(scale.unit2px, 1.0);
        assert_eq!(scale.zero, 160.0);
        assert_eq!(scale.oxy, 0.0);
        assert_eq!(scale.y(150.0), 10.0);
        assert_eq!(scale.y(-50.0), 210.0);
        assert!(scale.zero_inside());
    }

    #[test]
    fn test_value_scale_positive_origin() {
        let scale = ValueScale::new(100.0, 300.0, 100.0, 0.0);
        assert_eq!(scale.zero, 100.0);
        assert_eq!(scale.oxy, 100.0);
        assert_eq!(scale.y(100.0), 100.0);
        assert_eq!(scale.y(300.0), 0.0);
        assert!(!scale.zero_inside());
    }

    #[test]
    fn test_value_scale_negative_origin() {
        let scale = ValueScale::new(-300.0, -100.0, 100.0, 0.0);
        assert_eq!(scale.zero, 0.0);
        assert_eq!(scale.oxy, -100.0);
        assert_eq!(scale.y(-300.0), 100.0);
    }

    #[test]
    fn test_value_scale_flat_span() {
        let scale = ValueScale::new(0.0, 0.0, 100.0, 0.0);
        assert_eq!(scale.unit2px, 1.0);
    }

    #[test]
    fn test_value_scale_invert() {
        let scale = ValueScale::new(0.0, 100.0, 200.0, 0.0);
        assert_eq!(scale.invert(scale.scale(40.0)), 40.0);
    }

    #[test]
    fn test_baseline_y() {
        let scale = ValueScale::new(100.0, 300.0, 100.0, 0.0);
        assert_eq!(scale.baseline_y(0.0), 100.0);
        assert_eq!(scale.baseline_y(200.0), 50.0);
    }

    #[test]
    fn test_column_scale() {
        let scale = ColumnScale::new(1000, 2000, 100);
        assert_eq!(scale.cell(), 10.0);
        assert_eq!(scale.column(1000), Some(0));
        assert_eq!(scale.column(1009), Some(0));
        assert_eq!(scale.column(1010), Some(1));
        assert_eq!(scale.column(1999), Some(99));
        assert_eq!(scale.column(2000), None);
        assert_eq!(scale.column(999), None);
        assert_eq!(scale.position(1500), 50.0);
    }

    #[test]
    fn test_nice_step() {
        assert_eq!(nice_step(0.7), 1.0);
        assert_eq!(nice_step(1.0), 1.0);
        assert_eq!(nice_step(1.3), 2.0);
        assert_eq!(nice_step(3.0), 5.0);
        assert_eq!(nice_step(7.0), 10.0);
        assert_eq!(nice_step(150.0), 200.0);
    }
}
