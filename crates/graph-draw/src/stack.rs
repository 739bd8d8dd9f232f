//! # stack
//!
//! Running baselines of a stacked graph.

use graph_core::{SeriesColumns, SeriesDescriptor};

/// Fill the stack shifts of every series.
///
/// Each series rests on the nearest earlier series of the same axis side:
/// its shift in a column is that series' value plus that series' own shift.
/// Series without data still carry the chain with zero values. The first
/// series of each side rests on zero.
pub fn accumulate_shifts(series: &[SeriesDescriptor], columns: &mut [SeriesColumns]) {
    for bucket in columns.iter_mut().flat_map(|c| c.buckets.iter_mut()) {
        bucket.clear_shift();
    }

    for idx in 1..series.len().min(columns.len()) {
        let side = series[idx].axis_side;
        let Some(below) = (0..idx).rev().find(|&prev| series[prev].axis_side == side) else {
            continue;
        };

        let (lower, upper) = columns.split_at_mut(idx);
        let base = &lower[below];
        let current = &mut upper[0];

        for (bucket, under) in current.buckets.iter_mut().zip(&base.buckets) {
            bucket.shift_min = under.min + under.shift_min;
            bucket.shift_max = under.max + under.shift_max;
            bucket.shift_avg = under.avg + under.shift_avg;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graph_core::{AxisSide, ColumnBucket, DataSource};

    fn flat(values: &[f64]) -> SeriesColumns {
        let mut columns = SeriesColumns::empty(values.len(), DataSource::History);
        for (bucket, &v) in columns.buckets.iter_mut().zip(values) {
            *bucket = ColumnBucket { count: 1, min: v, max: v, avg: v, ..Default::default() };
        }
        columns.avg_orig = values.first().copied();
        columns
    }

    #[test]
    fn test_two_series_stack() {
        let series = vec![SeriesDescriptor::new("1", "a"), SeriesDescriptor::new("2", "b")];
        let mut columns = vec![flat(&[1.0, 1.0, 1.0]), flat(&[2.0, 2.0, 2.0])];

        accumulate_shifts(&series, &mut columns);

        assert!(columns[0].buckets.iter().all(|b| b.shift_avg == 0.0));
        assert!(columns[1].buckets.iter().all(|b| b.shift_avg == 1.0));
        assert_eq!(columns[1].buckets[0].avg + columns[1].buckets[0].shift_avg, 3.0);
    }

    #[test]
    fn test_stack_per_side() {
        let series = vec![
            SeriesDescriptor::new("1", "a"),
            SeriesDescriptor::new("2", "b").with_side(AxisSide::Right),
            SeriesDescriptor::new("3", "c"),
            SeriesDescriptor::new("4", "d").with_side(AxisSide::Right),
        ];
        let mut columns = vec![flat(&[1.0]), flat(&[10.0]), flat(&[2.0]), flat(&[20.0])];

        accumulate_shifts(&series, &mut columns);

        assert_eq!(columns[1].buckets[0].shift_avg, 0.0);
        assert_eq!(columns[2].buckets[0].shift_avg, 1.0);
        assert_eq!(columns[3].buckets[0].shift_avg, 10.0);
    }

    #[test]
    fn test_chain_passes_through_empty_series() {
        let series = vec![
            SeriesDescriptor::new("1", "a"),
            SeriesDescriptor::new("2", "b"),
            SeriesDescriptor::new("3", "c"),
        ];
        let mut columns = vec![
            flat(&[4.0, 4.0]),
            SeriesColumns::empty(2, DataSource::History),
            flat(&[1.0, 1.0]),
        ];

        accumulate_shifts(&series, &mut columns);

        assert_eq!(columns[1].buckets[0].shift_avg, 4.0);
        assert_eq!(columns[2].buckets[1].shift_avg, 4.0);
        assert_eq!(columns[2].buckets[1].shift_max, 4.0);
    }

    #[test]
    fn test_three_levels() {
        let series = vec![
            SeriesDescriptor::new("1", "a"),
            SeriesDescriptor::new("2", "b"),
            SeriesDescriptor::new("3", "c"),
        ];
        let mut columns = vec![flat(&[1.0]), flat(&[2.0]), flat(&[3.0])];

        accumulate_shifts(&series, &mut columns);

        assert_eq!(columns[2].buckets[0].shift_avg, 3.0);
    }
}
