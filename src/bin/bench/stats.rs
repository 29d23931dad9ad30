use hdrhistogram::Histogram;
use indexmap::IndexMap;
use std::time::Duration;

/// Raw measurements for one step, accumulated across iterations.
#[derive(Debug, Default, Clone)]
pub struct StepResults {
    pub latencies: Vec<Duration>,
    pub errors: usize,
    pub requests: usize,
    pub wall: Duration,
}

impl StepResults {
    pub fn merge(&mut self, other: StepResults) {
        self.latencies.extend(other.latencies);
        self.errors += other.errors;
        self.requests += other.requests;
        self.wall += other.wall;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepStats {
    pub samples: u64,
    pub errors: usize,
    pub min: Duration,
    pub median: Duration,
    pub p95: Duration,
    pub p99: Duration,
    pub max: Duration,
    pub requests_per_second: f64,
}

impl StepStats {
    pub fn calculate(results: &StepResults) -> Option<Self> {
        if results.latencies.is_empty() {
            return None;
        }

        // 1ns .. 1h at 3 significant digits
        let mut hist = Histogram::<u64>::new_with_bounds(1, 3_600_000_000_000, 3).ok()?;
        for latency in &results.latencies {
            hist.saturating_record((latency.as_nanos() as u64).max(1));
        }

        let nanos = Duration::from_nanos;
        let wall = results.wall.as_secs_f64();
        Some(StepStats {
            samples: hist.len(),
            errors: results.errors,
            min: nanos(hist.min()),
            median: nanos(hist.value_at_quantile(0.5)),
            p95: nanos(hist.value_at_quantile(0.95)),
            p99: nanos(hist.value_at_quantile(0.99)),
            max: nanos(hist.max()),
            requests_per_second: if wall > 0.0 {
                results.requests as f64 / wall
            } else {
                0.0
            },
        })
    }
}

/// Latency in the largest unit that keeps the integer part non-zero.
pub fn format_duration(latency: Duration) -> String {
    const MICRO: Duration = Duration::from_micros(1);
    const MILLI: Duration = Duration::from_millis(1);
    const SECOND: Duration = Duration::from_secs(1);

    match latency {
        l if l < MICRO => format!("{}ns", l.as_nanos()),
        l if l < MILLI => format!("{:.1}μs", l.as_nanos() as f64 / 1_000.0),
        l if l < SECOND => format!("{:.3}ms", l.as_secs_f64() * 1_000.0),
        l => format!("{:.3}s", l.as_secs_f64()),
    }
}

pub fn print_statistics(results: &IndexMap<String, StepResults>) {
    tracing::info!("{}", "=".repeat(80));
    tracing::info!(
        "{:<25} | {:>7} | {:>6} | {:>10} | {:>10} | {:>10} | {:>10} | {:>10}",
        "Step Name",
        "Samples",
        "Errors",
        "Min",
        "Median",
        "P95",
        "P99",
        "RPS"
    );
    tracing::info!("{}", "-".repeat(80));
    for (name, step) in results {
        let Some(stats) = StepStats::calculate(step) else {
            tracing::info!("{:<25} | no responses recorded", name);
            continue;
        };
        tracing::info!(
            "{:<25} | {:>7} | {:>6} | {:>10} | {:>10} | {:>10} | {:>10} | {:>10.2}",
            name,
            stats.samples,
            stats.errors,
            format_duration(stats.min),
            format_duration(stats.median),
            format_duration(stats.p95),
            format_duration(stats.p99),
            stats.requests_per_second
        );
        tracing::info!("{:<25} | max {}", "", format_duration(stats.max));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_results_have_no_stats() {
        assert_eq!(StepStats::calculate(&StepResults::default()), None);
    }

    #[test]
    fn percentiles_and_throughput() {
        let results = StepResults {
            latencies: (1..=100).map(Duration::from_millis).collect(),
            errors: 2,
            requests: 100,
            wall: Duration::from_secs(2),
        };
        let stats = StepStats::calculate(&results).unwrap();

        assert_eq!(stats.samples, 100);
        assert_eq!(stats.errors, 2);
        // hdrhistogram keeps 3 significant digits
        let close = |actual: Duration, expected_ms: u64| {
            let diff = actual.as_secs_f64() * 1000.0 - expected_ms as f64;
            assert!(diff.abs() < 0.1 * expected_ms as f64, "{actual:?} vs {expected_ms}ms");
        };
        close(stats.min, 1);
        close(stats.median, 50);
        close(stats.p99, 99);
        close(stats.max, 100);
        assert!((stats.requests_per_second - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn merge_accumulates() {
        let mut total = StepResults::default();
        for _ in 0..2 {
            total.merge(StepResults {
                latencies: vec![Duration::from_micros(5)],
                errors: 1,
                requests: 1,
                wall: Duration::from_millis(1),
            });
        }
        assert_eq!(total.latencies.len(), 2);
        assert_eq!(total.errors, 2);
        assert_eq!(total.requests, 2);
        assert_eq!(total.wall, Duration::from_millis(2));
    }

    #[test]
    fn durations_pick_a_readable_unit() {
        assert_eq!(format_duration(Duration::from_nanos(640)), "640ns");
        assert_eq!(format_duration(Duration::from_nanos(250_500)), "250.5μs");
        assert_eq!(format_duration(Duration::from_micros(1500)), "1.500ms");
        assert_eq!(format_duration(Duration::from_millis(2500)), "2.500s");
    }
}
