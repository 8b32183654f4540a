use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::lag_samples::LagSample;

/// Outcome of a persistence evaluation over a set of [`LagSample`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EvaluationResult {
    /// `true` when at least one Partition stayed at or above the lag
    /// threshold for a continuous stretch of at least the sustain duration.
    pub persistent: bool,

    /// Sum of the most recent lag observed on every Partition.
    pub total_current_lag: i64,
}

/// Decide whether the observed lag is real back-pressure, rather than a
/// transient spike.
///
/// Samples are grouped by Partition and, per group, sorted by timestamp. A
/// Partition lags persistently when a continuous stretch of samples, all with
/// `lag >= threshold`, spans at least `sustain_duration`: both comparisons
/// are inclusive, and a single below-threshold sample resets the stretch.
/// One persistently lagging Partition is enough for the whole result to be
/// persistent, while `total_current_lag` sums the latest sample of every
/// Partition: the orchestrator scales on pressure, but sizes the fleet on
/// total workload.
///
/// Pure function: the outcome depends on its arguments alone. An empty
/// input evaluates to `{not persistent, 0}`.
pub fn evaluate_persistence(
    samples: &[LagSample],
    threshold: i64,
    sustain_duration: Duration,
) -> EvaluationResult {
    if samples.is_empty() {
        return EvaluationResult::default();
    }

    // Group samples by Partition, tracking the latest sample of each
    let mut by_partition: HashMap<i32, Vec<&LagSample>> = HashMap::new();
    let mut latest_by_partition: HashMap<i32, &LagSample> = HashMap::new();

    for s in samples {
        by_partition.entry(s.partition).or_default().push(s);
        latest_by_partition
            .entry(s.partition)
            .and_modify(|latest| {
                if s.read_datetime > latest.read_datetime {
                    *latest = s;
                }
            })
            .or_insert(s);
    }

    let total_current_lag = latest_by_partition.values().map(|s| s.lag).sum();

    let persistent = by_partition.values_mut().any(|partition_samples| {
        partition_samples.sort_by_key(|s| s.read_datetime);
        has_persistent_lag(partition_samples, threshold, sustain_duration)
    });

    EvaluationResult {
        persistent,
        total_current_lag,
    }
}

/// `true` if the given timestamp-sorted samples contain a continuous stretch,
/// at or above `threshold` throughout, spanning at least `sustain_duration`.
fn has_persistent_lag(samples: &[&LagSample], threshold: i64, sustain_duration: Duration) -> bool {
    let mut stretch_start: Option<DateTime<Utc>> = None;

    for s in samples {
        if s.lag >= threshold {
            let start = *stretch_start.get_or_insert(s.read_datetime);
            if s.read_datetime - start >= sustain_duration {
                return true;
            }
        } else {
            stretch_start = None;
        }
    }

    false
}

#[cfg(test)]
mod test {
    use super::*;

    /// Mimics a scrape sequence: `n` samples for one Partition, one sampling
    /// interval apart, all with the same lag.
    fn make_samples(
        partition: i32,
        start: DateTime<Utc>,
        interval: Duration,
        n: i32,
        lag: i64,
    ) -> Vec<LagSample> {
        (0..n)
            .map(|i| LagSample {
                read_datetime: start + interval * i,
                topic: "test-topic".to_string(),
                partition,
                lag,
                committed_offset: 0,
                end_offset: lag,
            })
            .collect()
    }

    #[test]
    fn no_samples() {
        let result = evaluate_persistence(&[], 500, Duration::minutes(2));
        assert!(!result.persistent);
        assert_eq!(result.total_current_lag, 0);
    }

    #[test]
    fn below_threshold() {
        let samples = make_samples(0, Utc::now(), Duration::seconds(10), 20, 100);

        let result = evaluate_persistence(&samples, 500, Duration::minutes(2));
        assert!(!result.persistent);
    }

    #[test]
    fn stretch_too_short() {
        // 50s of high lag, but sustain requires 2 minutes
        let samples = make_samples(0, Utc::now(), Duration::seconds(10), 6, 1000);

        let result = evaluate_persistence(&samples, 500, Duration::minutes(2));
        assert!(!result.persistent);
    }

    #[test]
    fn stretch_spanning_exactly_the_sustain_duration() {
        // 13 samples, 10s apart: first to last spans exactly 120s
        let samples = make_samples(0, Utc::now(), Duration::seconds(10), 13, 1000);

        let result = evaluate_persistence(&samples, 500, Duration::minutes(2));
        assert!(result.persistent);
    }

    #[test]
    fn stretch_just_short_of_the_sustain_duration() {
        // 12 samples, 10s apart: first to last spans 110s
        let samples = make_samples(0, Utc::now(), Duration::seconds(10), 12, 1000);

        let result = evaluate_persistence(&samples, 500, Duration::minutes(2));
        assert!(!result.persistent);
    }

    #[test]
    fn lag_at_exactly_the_threshold_counts() {
        let samples = make_samples(0, Utc::now(), Duration::seconds(10), 13, 500);

        let result = evaluate_persistence(&samples, 500, Duration::minutes(2));
        assert!(result.persistent);
    }

    #[test]
    fn long_stretch() {
        let samples = make_samples(0, Utc::now(), Duration::seconds(10), 30, 1000);

        let result = evaluate_persistence(&samples, 500, Duration::minutes(2));
        assert!(result.persistent);
        assert_eq!(result.total_current_lag, 1000);
    }

    #[test]
    fn gap_resets_the_stretch() {
        let now = Utc::now();
        let mut samples = Vec::new();

        // First stretch: 6 samples, spanning 50s
        samples.extend(make_samples(0, now, Duration::seconds(10), 6, 1000));
        // One below-threshold sample in the middle
        samples.push(LagSample {
            read_datetime: now + Duration::seconds(60),
            topic: "test-topic".to_string(),
            partition: 0,
            lag: 100,
            committed_offset: 0,
            end_offset: 100,
        });
        // Second stretch: 6 samples, spanning 50s
        samples.extend(make_samples(0, now + Duration::seconds(70), Duration::seconds(10), 6, 1000));

        // Neither sub-stretch alone spans the 2 minutes
        let result = evaluate_persistence(&samples, 500, Duration::minutes(2));
        assert!(!result.persistent);
    }

    #[test]
    fn any_one_partition_is_enough() {
        let now = Utc::now();

        // Partition 0: short stretch (not persistent by itself)
        let mut samples = make_samples(0, now, Duration::seconds(10), 6, 1000);
        // Partition 1: long stretch (persistent by itself)
        samples.extend(make_samples(1, now, Duration::seconds(10), 15, 800));

        let result = evaluate_persistence(&samples, 500, Duration::minutes(2));
        assert!(result.persistent);
        // Latest of Partition 0 (1000) + latest of Partition 1 (800)
        assert_eq!(result.total_current_lag, 1800);
    }

    #[test]
    fn total_lag_sums_the_latest_sample_of_every_partition() {
        let now = Utc::now();
        let samples = vec![
            LagSample { read_datetime: now, partition: 0, lag: 500, ..Default::default() },
            LagSample {
                read_datetime: now + Duration::seconds(10),
                partition: 0,
                lag: 200,
                ..Default::default()
            },
            LagSample { read_datetime: now, partition: 1, lag: 300, ..Default::default() },
            LagSample {
                read_datetime: now + Duration::seconds(10),
                partition: 1,
                lag: 400,
                ..Default::default()
            },
        ];

        let result = evaluate_persistence(&samples, 500, Duration::minutes(2));
        // Latest for Partition 0 = 200, latest for Partition 1 = 400
        assert_eq!(result.total_current_lag, 600);
    }

    #[test]
    fn insertion_order_is_irrelevant() {
        let mut samples = make_samples(0, Utc::now(), Duration::seconds(10), 19, 2000);
        samples.reverse();

        let result = evaluate_persistence(&samples, 500, Duration::minutes(2));
        assert!(result.persistent);
        assert_eq!(result.total_current_lag, 2000);
    }

    #[test]
    fn evaluation_is_pure() {
        let samples = make_samples(0, Utc::now(), Duration::seconds(10), 19, 2000);

        let first = evaluate_persistence(&samples, 500, Duration::minutes(2));
        let second = evaluate_persistence(&samples, 500, Duration::minutes(2));
        assert_eq!(first, second);
    }
}
