//! Error taxonomy of the engine.
//!
//! Only configuration problems surface as errors. Missing samples, flat
//! series and arithmetic edge cases are absorbed by the stages that meet them.

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Y axis MAX value must be greater than Y axis MIN value (min: {min}, max: {max})")]
    InvalidAxisRange { min: f64, max: f64 },

    #[error("Incorrect value for field \"{field}\": {value:?}")]
    InvalidInterval { field: &'static str, value: String },

    #[error("invalid work period: {0:?}")]
    InvalidWorkPeriod(String),

    #[error("invalid graph dimensions {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("invalid time window [{from}, {to})")]
    InvalidTimeWindow { from: i64, to: i64 },
}

impl GraphError {
    pub fn invalid_interval(field: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidInterval {
            field,
            value: value.into(),
        }
    }

    /// Whether the operator can fix the problem by correcting graph settings
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidAxisRange { .. } | Self::InvalidInterval { .. } | Self::InvalidWorkPeriod(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, GraphError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_range_message() {
        let err = GraphError::InvalidAxisRange { min: 10.0, max: 1.0 };
        assert!(err.to_string().starts_with("Y axis MAX value must be greater"));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_dimensions_not_configuration() {
        let err = GraphError::InvalidDimensions { width: 0, height: 10 };
        assert!(!err.is_configuration());
    }
}
