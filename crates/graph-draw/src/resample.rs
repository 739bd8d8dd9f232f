//! # resample
//!
//! Maps sample rows onto the fixed pixel-column grid, fills gaps and picks
//! the storage a series is read from.

use crate::chartkit::ColumnScale;
use graph_core::math::{safe_avg, safe_mul, safe_sum, safe_weighted_avg};
use graph_core::{
    ColumnBucket, DataSource, EngineConfig, GraphKind, Retention, SampleRow, SeriesColumns,
};
use tracing::{trace, warn};

/// Storage that serves a window.
///
/// History is used while it still covers `from` and the columns are narrow
/// enough for raw samples; trends otherwise, unless trends are disabled.
pub fn select_source(
    retention: &Retention,
    now: i64,
    from: i64,
    period: i64,
    size_x: usize,
    config: &EngineConfig,
) -> DataSource {
    let column_span = period as f64 / size_x.max(1) as f64;
    let dense = column_span <= config.trend_diff_limit as f64 / config.max_skip_cell;

    if retention.trends == 0 || (now - retention.history < from && dense) {
        DataSource::History
    } else {
        DataSource::Trends
    }
}

/// Fold rows into their columns, dropping rows without samples
fn bucketize(rows: &[SampleRow], scale: &ColumnScale, size_x: usize) -> Vec<ColumnBucket> {
    let mut grouped: Vec<Vec<&SampleRow>> = vec![Vec::new(); size_x];
    let mut outside = 0usize;

    for row in rows {
        match scale.column(row.clock) {
            Some(idx) => grouped[idx].push(row),
            None => outside += 1,
        }
    }

    if outside > 0 {
        trace!(outside, "rows outside the window skipped");
    }

    grouped
        .into_iter()
        .map(|rows| {
            let rows: Vec<&SampleRow> = rows.into_iter().filter(|r| r.count > 0).collect();
            match rows.as_slice() {
                [] => ColumnBucket::default(),
                [row] => ColumnBucket {
                    count: row.count,
                    min: row.min,
                    max: row.max,
                    avg: row.avg,
                    clock: row.clock as f64,
                    ..Default::default()
                },
                rows => {
                    let weighted: Vec<(f64, f64)> = rows.iter().map(|r| (r.avg, r.count as f64)).collect();
                    ColumnBucket {
                        count: rows.iter().map(|r| r.count).sum(),
                        min: rows.iter().map(|r| r.min).fold(f64::INFINITY, f64::min),
                        max: rows.iter().map(|r| r.max).fold(f64::NEG_INFINITY, f64::max),
                        avg: safe_weighted_avg(&weighted)
                            .unwrap_or_else(|| safe_avg(&rows.iter().map(|r| r.avg).collect::<Vec<_>>())),
                        clock: rows.iter().map(|r| r.clock).max().unwrap_or_default() as f64,
                        ..Default::default()
                    }
                }
            }
        })
        .collect()
}

/// Point `step` of `steps` on the way from `first` to `last`
fn interpolate(first: f64, last: f64, step: f64, steps: f64) -> f64 {
    safe_sum(&[first, safe_mul(&[step, 1.0 / steps, last]), safe_mul(&[step, 1.0 / steps, -first])])
}

/// Resample rows of one series onto `size_x` columns over `[from, to)`.
///
/// Several rows in one column combine into one bucket. Empty columns between
/// two known columns are interpolated linearly; a leading gap repeats the
/// first known value backwards and a trailing gap holds the last one. Filled
/// columns keep `count == 0`, except gaps narrower than `size_x / 20` in
/// stacked graphs, which are marked as data so the stacked fill stays closed.
pub fn resample(
    rows: &[SampleRow],
    size_x: usize,
    from: i64,
    to: i64,
    kind: GraphKind,
    source: DataSource,
) -> SeriesColumns {
    let scale = ColumnScale::new(from, to, size_x);
    let mut buckets = bucketize(rows, &scale, size_x);

    let known: Vec<f64> = buckets.iter().filter(|b| b.has_data()).map(|b| b.avg).collect();
    let avg_orig = (!known.is_empty()).then(|| safe_avg(&known));

    let cell = scale.cell();
    let thin_gap = size_x as f64 / 20.0;
    let mut gap = 0usize;

    for ci in 0..size_x {
        if !buckets[ci].has_data() {
            buckets[ci] = ColumnBucket::default();
            gap += 1;
            continue;
        }

        if gap == 0 {
            continue;
        }

        let dx = gap + 1;
        let leading = ci < dx;
        let first = buckets[ci.saturating_sub(dx)];
        let last = buckets[ci];

        for step in 1..=gap {
            let idx = ci - dx + step;
            let bucket = &mut buckets[idx];

            if (dx as f64) < thin_gap && kind.is_stacked() {
                bucket.count = 1;
            }

            let (step, steps) = (step as f64, dx as f64);
            if leading {
                bucket.min = last.min;
                bucket.max = last.max;
                bucket.avg = last.avg;
                bucket.clock = last.clock - cell * (steps - step);
            } else {
                bucket.min = interpolate(first.min, last.min, step, steps);
                bucket.max = interpolate(first.max, last.max, step, steps);
                bucket.avg = interpolate(first.avg, last.avg, step, steps);
                bucket.clock = interpolate(first.clock, last.clock, step, steps);
            }
        }

        gap = 0;
    }

    if gap > 0 && gap < size_x {
        let last_idx = size_x - gap - 1;
        let last = buckets[last_idx];

        for step in 1..=gap {
            let bucket = &mut buckets[last_idx + step];
            bucket.min = last.min;
            bucket.max = last.max;
            bucket.avg = last.avg;
            bucket.clock = last.clock + cell * step as f64;
        }
    }

    if avg_orig.is_none() && !rows.is_empty() {
        warn!(rows = rows.len(), "no rows fell inside the window");
    }

    SeriesColumns {
        buckets,
        avg_orig,
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graph_core::SEC_PER_DAY;

    const FROM: i64 = 1_700_000_000;

    fn rows_at(columns: &[(usize, f64)], size_x: usize, period: i64) -> Vec<SampleRow> {
        let cell = period / size_x as i64;
        columns
            .iter()
            .map(|&(col, value)| SampleRow::point(FROM + col as i64 * cell, value))
            .collect()
    }

    #[test]
    fn test_exact_size() {
        for size_x in [1, 7, 100, 1000] {
            let columns = resample(&[], size_x, FROM, FROM + 3600, GraphKind::Normal, DataSource::History);
            assert_eq!(columns.len(), size_x);
            assert!(!columns.has_data());
        }
    }

    #[test]
    fn test_gapless_input_fills_every_column() {
        let rows: Vec<SampleRow> = (0..100).map(|i| SampleRow::point(FROM + i * 36, i as f64)).collect();
        let columns = resample(&rows, 100, FROM, FROM + 3600, GraphKind::Normal, DataSource::History);
        assert!(columns.buckets.iter().all(|b| b.count > 0));
        let avg = columns.avg_orig.unwrap();
        assert!((avg - 49.5).abs() < 1e-9);
    }

    #[test]
    fn test_interior_gap_interpolates_monotonically() {
        let rows = rows_at(&[(0, 10.0), (9, 100.0)], 10, 1000);
        let columns = resample(&rows, 10, FROM, FROM + 1000, GraphKind::Normal, DataSource::History);

        let avgs: Vec<f64> = columns.buckets.iter().map(|b| b.avg).collect();
        for pair in avgs.windows(2) {
            assert!(pair[1] > pair[0], "{avgs:?}");
        }
        assert!((avgs[1] - 20.0).abs() < 1e-9);
        assert!((avgs[8] - 90.0).abs() < 1e-9);
        assert!(columns.buckets[1..9].iter().all(|b| b.count == 0));
        assert!((columns.buckets[5].clock - (FROM + 500) as f64).abs() < 1e-6);
        assert_eq!(columns.avg_orig, Some(55.0));
    }

    #[test]
    fn test_leading_gap_holds_backward() {
        let rows = rows_at(&[(3, 7.0), (4, 9.0)], 10, 1000);
        let columns = resample(&rows, 10, FROM, FROM + 1000, GraphKind::Normal, DataSource::History);

        for bucket in &columns.buckets[0..3] {
            assert_eq!(bucket.avg, 7.0);
            assert_eq!(bucket.count, 0);
        }
        assert_eq!(columns.buckets[0].clock, (FROM + 300) as f64 - 300.0);
        assert_eq!(columns.buckets[2].clock, (FROM + 300) as f64 - 100.0);
    }

    #[test]
    fn test_trailing_gap_holds_forward() {
        let rows = rows_at(&[(0, 1.0), (5, 4.0)], 10, 1000);
        let columns = resample(&rows, 10, FROM, FROM + 1000, GraphKind::Normal, DataSource::History);

        for bucket in &columns.buckets[6..] {
            assert_eq!(bucket.avg, 4.0);
            assert_eq!(bucket.count, 0);
        }
        assert_eq!(columns.buckets[9].clock, (FROM + 500) as f64 + 400.0);
        assert_eq!(columns.last_value(graph_core::CalcFunction::Avg), Some(4.0));
    }

    #[test]
    fn test_stacked_thin_gap_marked_as_data() {
        // dx = 3 < 100 / 20
        let rows = rows_at(&[(10, 1.0), (13, 1.0), (50, 1.0)], 100, 10_000);
        let columns = resample(&rows, 100, FROM, FROM + 10_000, GraphKind::Stacked, DataSource::History);

        assert_eq!(columns.buckets[11].count, 1);
        assert_eq!(columns.buckets[12].count, 1);
        assert_eq!(columns.buckets[30].count, 0);
    }

    #[test]
    fn test_rows_in_one_column_combine() {
        let rows = vec![
            SampleRow::new(FROM + 1, 1, 5.0, 5.0, 5.0),
            SampleRow::new(FROM + 2, 3, 1.0, 9.0, 9.0),
            SampleRow::new(FROM + 3, 0, -100.0, 100.0, 0.0),
        ];
        let columns = resample(&rows, 10, FROM, FROM + 1000, GraphKind::Normal, DataSource::Trends);
        let bucket = columns.buckets[0];

        assert_eq!(bucket.count, 4);
        assert_eq!(bucket.min, 1.0);
        assert_eq!(bucket.max, 9.0);
        assert!((bucket.avg - 8.0).abs() < 1e-9);
        assert_eq!(bucket.clock, (FROM + 2) as f64);
        assert_eq!(columns.source, DataSource::Trends);
    }

    #[test]
    fn test_rows_outside_window_ignored() {
        let rows = vec![SampleRow::point(FROM - 10, 1.0), SampleRow::point(FROM + 1000, 2.0)];
        let columns = resample(&rows, 10, FROM, FROM + 1000, GraphKind::Normal, DataSource::History);
        assert!(!columns.has_data());
    }

    #[test]
    fn test_select_source() {
        let config = EngineConfig::default();
        let now = FROM + SEC_PER_DAY;
        let retention = Retention { history: 7 * SEC_PER_DAY, trends: 365 * SEC_PER_DAY };

        // One day over 1000 px: 86.4 s per column, history covers the window.
        assert_eq!(select_source(&retention, now, FROM, SEC_PER_DAY, 1000, &config), DataSource::History);

        // One year over 1000 px: far above 3600 / 16 s per column.
        let from = now - 365 * SEC_PER_DAY;
        assert_eq!(
            select_source(&retention, now, from, 365 * SEC_PER_DAY, 1000, &config),
            DataSource::Trends
        );

        // Trends disabled
        let no_trends = Retention { history: 7 * SEC_PER_DAY, trends: 0 };
        assert_eq!(
            select_source(&no_trends, now, from, 365 * SEC_PER_DAY, 1000, &config),
            DataSource::History
        );

        // History expired for the window start
        let short = Retention { history: 3600, trends: 365 * SEC_PER_DAY };
        assert_eq!(select_source(&short, now, FROM, SEC_PER_DAY, 1000, &config), DataSource::Trends);
    }
}
