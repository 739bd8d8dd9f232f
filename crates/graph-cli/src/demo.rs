//! Synthetic series for demo/development

use graph_core::{AxisSide, CalcFunction, DrawStyle, SampleRow, SeriesDescriptor, SEC_PER_DAY};
use graph_draw::{RenderRequest, SeriesInput, TriggerLine};
use rand::Rng;

/// Random walk with occasional trend changes and outages
struct MockMetric {
    value: f64,
    volatility: f64,
    trend: f64,
    floor: f64,
    ceiling: f64,
}

impl MockMetric {
    fn new(initial: f64, volatility: f64, floor: f64, ceiling: f64) -> Self {
        Self {
            value: initial,
            volatility,
            trend: 0.0,
            floor,
            ceiling,
        }
    }

    fn tick(&mut self, rng: &mut impl Rng) -> f64 {
        let drift = self.trend * self.volatility * 0.2;
        let random = (rng.r#gen::<f64>() - 0.5) * 2.0 * self.volatility;

        if rng.r#gen::<f64>() < 0.01 {
            self.trend = (rng.r#gen::<f64>() - 0.5) * 2.0;
        }

        self.value = (self.value * (1.0 + drift + random)).clamp(self.floor, self.ceiling);
        self.value
    }

    /// Rows every `step` seconds over `[from, to)`, skipping rare outages
    fn rows(&mut self, rng: &mut impl Rng, from: i64, to: i64, step: i64) -> Vec<SampleRow> {
        let mut rows = Vec::with_capacity(((to - from) / step.max(1)) as usize);
        let mut outage = 0;
        let mut clock = from;

        while clock < to {
            if outage == 0 && rng.r#gen::<f64>() < 0.002 {
                outage = rng.gen_range(10..60);
            }

            if outage > 0 {
                outage -= 1;
            } else {
                let value = self.tick(rng);
                let spread = value * self.volatility;
                rows.push(SampleRow::new(clock, 1, value - spread, value + spread, value));
            }

            clock += step;
        }

        rows
    }
}

/// A one-day graph of three metrics with a trigger and a percentile line
pub fn demo_request(rng: &mut impl Rng, now: i64, width: usize, height: usize) -> RenderRequest {
    let from = now - SEC_PER_DAY;

    let cpu = SeriesDescriptor::new("10001", "CPU utilization")
        .with_units("%")
        .with_delay("1m");
    let load = SeriesDescriptor::new("10002", "Load average")
        .with_calc_fnc(CalcFunction::All)
        .with_delay("1m");
    let traffic = SeriesDescriptor::new("10003", "Incoming traffic")
        .with_units("bps")
        .with_side(AxisSide::Right)
        .with_draw_style(DrawStyle::FilledRegion)
        .with_delay("30s");

    let cpu_rows = MockMetric::new(35.0, 0.03, 0.0, 100.0).rows(rng, from, now, 60);
    let load_rows = MockMetric::new(1.5, 0.05, 0.0, 32.0).rows(rng, from, now, 60);
    let traffic_rows = MockMetric::new(2.0e8, 0.02, 0.0, 1.0e10).rows(rng, from, now, 30);

    RenderRequest::new(from, now, width, height)
        .with_now(now)
        .with_series(SeriesInput::new(cpu).with_history(cpu_rows))
        .with_series(SeriesInput::new(load).with_history(load_rows))
        .with_series(SeriesInput::new(traffic).with_history(traffic_rows))
        .with_percentile(AxisSide::Left, 95.0)
        .with_trigger(TriggerLine {
            side: AxisSide::Left,
            value: 80.0,
            color: "DD0000".to_string(),
            description: "High CPU utilization".to_string(),
            constant: "[> 80]".to_string(),
        })
        .with_work_period("1-5,09:00-18:00")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_mock_metric_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut metric = MockMetric::new(50.0, 0.2, 0.0, 100.0);

        for _ in 0..10_000 {
            let value = metric.tick(&mut rng);
            assert!((0.0..=100.0).contains(&value));
        }
    }

    #[test]
    fn test_rows_are_ordered_and_inside_window() {
        let mut rng = StdRng::seed_from_u64(1);
        let rows = MockMetric::new(10.0, 0.01, 0.0, 20.0).rows(&mut rng, 1000, 5000, 60);

        assert!(!rows.is_empty());
        assert!(rows.windows(2).all(|pair| pair[0].clock < pair[1].clock));
        assert!(rows.iter().all(|r| (1000..5000).contains(&r.clock)));
    }

    #[test]
    fn test_demo_request_shape() {
        let mut rng = StdRng::seed_from_u64(42);
        let request = demo_request(&mut rng, 1_704_067_200, 600, 200);

        assert_eq!(request.series.len(), 3);
        assert_eq!(request.period(), SEC_PER_DAY);
        assert_eq!(request.triggers.len(), 1);
    }
}
