//! Per-region latency and uptime aggregation.
//!
//! The p95 reported here is a nearest-rank percentile: the element at
//! zero-based index `floor(0.95 * n)` of the ascending latencies. It is
//! neither the `ceil(0.95 * n)` rank convention nor an interpolated
//! percentile, and always names a latency that was actually observed.

use crate::dataset::Dataset;
use crate::models::{MetricsRequest, Observation, RegionMetrics, RegionSummary};
use tracing::debug;

/// Percentile used for `p95_latency`.
const P95: f64 = 0.95;

/// Compute summaries for every requested region.
///
/// Each region is processed independently; a region with no observations
/// maps to [`RegionSummary::zero`]. Repeated regions produce the same key.
pub fn compute(dataset: &[Observation], regions: &[String], threshold_ms: f64) -> RegionMetrics {
    let mut metrics = RegionMetrics::new();

    for region in regions {
        let summary = summarize_region(dataset, region, threshold_ms);
        metrics.insert(region.clone(), summary);
    }

    metrics
}

/// Compute summaries for a validated request against a loaded dataset.
pub fn compute_request(dataset: &Dataset, request: &MetricsRequest) -> RegionMetrics {
    compute(dataset.observations(), &request.regions, request.threshold_ms)
}

/// Summarize the observations of a single region.
pub fn summarize_region(dataset: &[Observation], region: &str, threshold_ms: f64) -> RegionSummary {
    let matching: Vec<&Observation> = dataset.iter().filter(|o| o.region == region).collect();

    if matching.is_empty() {
        debug!("No observations for region '{}'", region);
        return RegionSummary::zero();
    }

    let mut latencies: Vec<f64> = matching.iter().map(|o| o.latency_ms).collect();
    latencies.sort_by(f64::total_cmp);
    let uptimes: Vec<f64> = matching.iter().map(|o| o.uptime_pct).collect();

    let breaches = latencies.iter().filter(|&&l| l > threshold_ms).count();

    debug!(
        "Region '{}': {} observations, {} breaches above {}ms",
        region,
        latencies.len(),
        breaches,
        threshold_ms
    );

    RegionSummary {
        avg_latency: round2(mean(&latencies)),
        p95_latency: round2(p95_nearest_rank(&latencies)),
        avg_uptime: round2(mean(&uptimes)),
        breaches,
    }
}

/// Nearest-rank p95 of an ascending slice. Returns 0 for an empty slice.
pub fn p95_nearest_rank(sorted: &[f64]) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = (P95 * sorted.len() as f64).floor() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

/// Round to 2 decimal places on the exact binary value, ties to even.
///
/// `value * 100` may itself round onto a `.5`; the fused residual tells
/// whether the exact product sits above, below or on that tie.
pub fn round2(value: f64) -> f64 {
    if !value.is_finite() || value.abs() >= 1e15 {
        return value;
    }

    let scaled = value * 100.0;
    let residual = value.mul_add(100.0, -scaled);
    let floor = scaled.floor();

    let rounded = if scaled - floor != 0.5 {
        scaled.round()
    } else if residual > 0.0 {
        floor + 1.0
    } else if residual < 0.0 {
        floor
    } else if floor % 2.0 == 0.0 {
        floor
    } else {
        floor + 1.0
    };

    rounded / 100.0
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Total breaches across all summarized regions.
pub fn total_breaches(metrics: &RegionMetrics) -> usize {
    metrics.values().map(|s| s.breaches).sum()
}

/// Requested regions that had no observations at all.
pub fn empty_regions(dataset: &[Observation], metrics: &RegionMetrics) -> Vec<String> {
    metrics
        .keys()
        .filter(|region| !dataset.iter().any(|o| &o.region == *region))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Observation> {
        vec![
            Observation::new("a", 100.0, 99.9),
            Observation::new("a", 200.0, 99.8),
        ]
    }

    fn regions(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_two_observation_region() {
        let metrics = compute(&sample(), &regions(&["a"]), 150.0);
        let a = metrics["a"];

        assert_eq!(a.avg_latency, 150.0);
        assert_eq!(a.p95_latency, 200.0);
        assert_eq!(a.avg_uptime, 99.85);
        assert_eq!(a.breaches, 1);
    }

    #[test]
    fn test_missing_region_is_zero() {
        let metrics = compute(&sample(), &regions(&["b"]), 150.0);
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics["b"], RegionSummary::zero());
    }

    #[test]
    fn test_empty_region_list() {
        let metrics = compute(&sample(), &[], 150.0);
        assert!(metrics.is_empty());
    }

    #[test]
    fn test_breach_is_strictly_greater() {
        let data = vec![
            Observation::new("a", 150.0, 99.0),
            Observation::new("a", 150.0, 99.0),
            Observation::new("a", 150.01, 99.0),
        ];
        let summary = summarize_region(&data, "a", 150.0);
        assert_eq!(summary.breaches, 1);
    }

    #[test]
    fn test_fractional_and_negative_threshold() {
        let data = sample();
        assert_eq!(summarize_region(&data, "a", 99.5).breaches, 2);
        assert_eq!(summarize_region(&data, "a", -1.0).breaches, 2);
        assert_eq!(summarize_region(&data, "a", 200.0).breaches, 0);
    }

    #[test]
    fn test_no_cross_region_leakage() {
        let data = vec![
            Observation::new("a", 10.0, 90.0),
            Observation::new("b", 1000.0, 50.0),
            Observation::new("a", 20.0, 100.0),
        ];
        let a = summarize_region(&data, "a", 15.0);
        assert_eq!(a.avg_latency, 15.0);
        assert_eq!(a.p95_latency, 20.0);
        assert_eq!(a.avg_uptime, 95.0);
        assert_eq!(a.breaches, 1);
    }

    #[test]
    fn test_region_match_is_exact() {
        let data = vec![Observation::new("us-east", 10.0, 99.0)];
        assert!(summarize_region(&data, "US-EAST", 0.0).is_zero());
        assert!(summarize_region(&data, "us-east ", 0.0).is_zero());
    }

    #[test]
    fn test_p95_index_is_floor() {
        // n = 20: floor(19.0) = 19, the maximum
        let sorted: Vec<f64> = (1..=20).map(f64::from).collect();
        assert_eq!(p95_nearest_rank(&sorted), 20.0);

        // n = 10: floor(9.5) = 9
        let sorted: Vec<f64> = (1..=10).map(f64::from).collect();
        assert_eq!(p95_nearest_rank(&sorted), 10.0);

        // n = 100: floor(95.0) = 95, i.e. the 96th value
        let sorted: Vec<f64> = (1..=100).map(f64::from).collect();
        assert_eq!(p95_nearest_rank(&sorted), 96.0);

        assert_eq!(p95_nearest_rank(&[42.0]), 42.0);
        assert_eq!(p95_nearest_rank(&[]), 0.0);
    }

    #[test]
    fn test_p95_uses_sorted_latencies() {
        let data = vec![
            Observation::new("a", 300.0, 99.0),
            Observation::new("a", 100.0, 99.0),
            Observation::new("a", 200.0, 99.0),
        ];
        // n = 3: floor(2.85) = 2
        assert_eq!(summarize_region(&data, "a", 0.0).p95_latency, 300.0);
    }

    #[test]
    fn test_p95_is_an_observed_value() {
        let data: Vec<Observation> = [187.31, 142.09, 201.5, 99.99, 173.44, 160.0, 155.55]
            .iter()
            .map(|&l| Observation::new("x", l, 98.0))
            .collect();
        let summary = summarize_region(&data, "x", 0.0);
        assert!(data.iter().any(|o| o.latency_ms == summary.p95_latency));
    }

    #[test]
    fn test_avg_latency_within_bounds() {
        let data: Vec<Observation> = [12.5, 300.25, 87.0, 150.75]
            .iter()
            .map(|&l| Observation::new("x", l, 99.0))
            .collect();
        let summary = summarize_region(&data, "x", 100.0);
        assert!(summary.avg_latency >= 12.5);
        assert!(summary.avg_latency <= 300.25);
    }

    #[test]
    fn test_rounding() {
        assert_eq!(round2(99.854), 99.85);
        assert_eq!(round2(99.856), 99.86);
        assert_eq!(round2(150.0), 150.0);
        assert_eq!(round2(1.0 / 3.0), 0.33);
        assert!(round2(f64::NAN).is_nan());

        let data = vec![
            Observation::new("a", 100.0, 99.0),
            Observation::new("a", 100.0, 99.0),
            Observation::new("a", 101.0, 98.0),
        ];
        let summary = summarize_region(&data, "a", 0.0);
        assert_eq!(summary.avg_latency, 100.33);
        assert_eq!(summary.avg_uptime, 98.67);
    }

    #[test]
    fn test_rounding_ties_to_even() {
        assert_eq!(round2(0.125), 0.12);
        assert_eq!(round2(0.375), 0.38);
        assert_eq!(round2(0.625), 0.62);
        assert_eq!(round2(0.875), 0.88);
        assert_eq!(round2(-0.125), -0.12);
        assert_eq!(round2(100.125), 100.12);
    }

    #[test]
    fn test_rounding_uses_exact_binary_value() {
        // 2.675 is stored just below the tie
        assert_eq!(round2(2.675), 2.67);
        assert_eq!(round2(1.005), 1.0);
        assert_eq!(round2(0.145), 0.14);
    }

    #[test]
    fn test_eighths_average_rounds_to_even() {
        let mut data: Vec<Observation> = (0..7)
            .map(|_| Observation::new("a", 100.0, 99.0))
            .collect();
        data.push(Observation::new("a", 101.0, 99.0));
        assert_eq!(summarize_region(&data, "a", 0.0).avg_latency, 100.12);

        let data = vec![
            Observation::new("b", 10.0, 99.0),
            Observation::new("b", 10.0, 99.25),
        ];
        assert_eq!(summarize_region(&data, "b", 0.0).avg_uptime, 99.12);
    }

    #[test]
    fn test_nan_latency_does_not_panic() {
        let data = vec![
            Observation::new("a", f64::NAN, 99.0),
            Observation::new("a", 10.0, 99.0),
        ];
        let summary = summarize_region(&data, "a", 5.0);
        assert_eq!(summary.breaches, 1);
    }

    #[test]
    fn test_duplicate_regions_collapse() {
        let metrics = compute(&sample(), &regions(&["a", "a", "b"]), 150.0);
        assert_eq!(metrics.len(), 2);
        assert_eq!(metrics["a"].breaches, 1);
    }

    #[test]
    fn test_idempotent_and_order_independent() {
        let data = vec![
            Observation::new("a", 100.0, 99.9),
            Observation::new("b", 250.0, 97.1),
            Observation::new("a", 200.0, 99.8),
            Observation::new("b", 120.0, 99.2),
        ];
        let first = compute(&data, &regions(&["a", "b", "c"]), 150.0);
        let second = compute(&data, &regions(&["a", "b", "c"]), 150.0);
        let permuted = compute(&data, &regions(&["c", "b", "a"]), 150.0);

        assert_eq!(first, second);
        assert_eq!(first, permuted);
    }

    #[test]
    fn test_compute_request() {
        let dataset = Dataset::new(sample());
        let request = MetricsRequest {
            regions: regions(&["a", "b"]),
            threshold_ms: 150.0,
        };
        let metrics = compute_request(&dataset, &request);
        assert_eq!(metrics["a"].breaches, 1);
        assert!(metrics["b"].is_zero());
    }

    #[test]
    fn test_total_breaches_and_empty_regions() {
        let data = vec![
            Observation::new("a", 100.0, 99.9),
            Observation::new("a", 200.0, 99.8),
            Observation::new("b", 400.0, 95.0),
        ];
        let metrics = compute(&data, &regions(&["a", "b", "c"]), 150.0);
        assert_eq!(total_breaches(&metrics), 2);
        assert_eq!(empty_regions(&data, &metrics), vec!["c".to_string()]);
    }

    #[test]
    fn test_fixture_dataset_properties() {
        let dataset = Dataset::from_json_str(include_str!("../../fixtures/latency.json")).unwrap();
        let threshold = 175.0;
        let metrics = compute(
            dataset.observations(),
            &regions(&["apac", "emea", "amer", "mars"]),
            threshold,
        );

        for region in ["apac", "emea", "amer"] {
            let summary = metrics[region];
            let latencies: Vec<f64> = dataset
                .observations()
                .iter()
                .filter(|o| o.region == region)
                .map(|o| o.latency_ms)
                .collect();
            let min = latencies.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = latencies.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

            assert_eq!(latencies.len(), 12);
            assert!(summary.avg_latency >= round2(min) && summary.avg_latency <= round2(max));
            assert!(latencies.contains(&summary.p95_latency));
            assert_eq!(
                summary.breaches,
                latencies.iter().filter(|&&l| l > threshold).count()
            );
        }
        assert!(metrics["mars"].is_zero());
    }

    #[test]
    fn test_concurrent_readers_agree() {
        let dataset = Dataset::new(vec![
            Observation::new("a", 100.0, 99.9),
            Observation::new("a", 200.0, 99.8),
            Observation::new("b", 50.0, 100.0),
        ]);
        let request = MetricsRequest {
            regions: regions(&["a", "b"]),
            threshold_ms: 75.0,
        };
        let expected = compute_request(&dataset, &request);

        std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let dataset = dataset.clone();
                    let request = &request;
                    s.spawn(move || compute_request(&dataset, request))
                })
                .collect();
            for handle in handles {
                assert_eq!(handle.join().unwrap(), expected);
            }
        });
    }
}
