use std::collections::BTreeMap;

use super::stats::{mean, median, round_to};
use super::types::{DeploymentMetrics, DoraOverall, TestingMetrics, TestingOverall};

/// Combine per-repository DORA records into the fleet-wide record.
///
/// Frequencies add up, lead time is the median of per-repository medians,
/// change-failure rate is pooled by deployment volume and time to restore
/// is a plain mean. Nulls are skipped, never treated as zero.
pub fn aggregate_dora(repos: &BTreeMap<String, DeploymentMetrics>) -> DoraOverall {
    let deployments: u64 = repos.values().map(|m| m.deployments).sum();

    let deployment_frequency_per_day = (!repos.is_empty()).then(|| {
        let total: f64 = repos.values().map(|m| m.deployment_frequency_per_day).sum();
        round_to(total, 3)
    });

    let lead_times: Vec<f64> = repos
        .values()
        .filter_map(|m| m.lead_time_hours_median)
        .collect();

    // Per-repository failure counts recovered from the rounded rate. This is
    // approximate for large volumes: 1 failure in 1600 deployments reports
    // 0.001 and comes back as 2 failures.
    let (failures, pooled_deployments) = repos
        .values()
        .filter_map(|m| {
            m.change_failure_rate
                .map(|rate| ((rate * m.deployments as f64).round(), m.deployments))
        })
        .fold((0.0, 0u64), |(failures, total), (f, d)| (failures + f, total + d));
    let change_failure_rate =
        (pooled_deployments > 0).then(|| round_to(failures / pooled_deployments as f64, 3));

    let restores: Vec<f64> = repos
        .values()
        .filter_map(|m| m.time_to_restore_hours_avg)
        .collect();

    DoraOverall {
        deployments,
        deployment_frequency_per_day,
        lead_time_hours_median: median(&lead_times).map(|hours| round_to(hours, 2)),
        change_failure_rate,
        time_to_restore_hours_avg: mean(&restores).map(|hours| round_to(hours, 2)),
    }
}

/// Combine per-repository testing records by simple mean over non-null values.
pub fn aggregate_testing(repos: &BTreeMap<String, TestingMetrics>) -> TestingOverall {
    let automation: Vec<f64> = repos.values().map(|m| m.automation_rate).collect();
    let leakage: Vec<f64> = repos
        .values()
        .filter_map(|m| m.defect_leakage_rate)
        .collect();

    TestingOverall {
        automation_rate: mean(&automation).map(|rate| round_to(rate, 3)),
        defect_leakage_rate: mean(&leakage).map(|rate| round_to(rate, 3)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::types::TESTING_SOURCE;

    fn dora(
        deployments: u64,
        freq: f64,
        lead: Option<f64>,
        cfr: Option<f64>,
        ttr: Option<f64>,
    ) -> DeploymentMetrics {
        DeploymentMetrics {
            deployments,
            deployment_frequency_per_day: freq,
            lead_time_hours_median: lead,
            change_failure_rate: cfr,
            time_to_restore_hours_avg: ttr,
        }
    }

    fn testing(automation: f64, leakage: Option<f64>) -> TestingMetrics {
        TestingMetrics {
            automation_rate: automation,
            defect_leakage_rate: leakage,
            test_workflows: 1,
            test_runs: 10,
            executed_test_runs: 10,
            open_bugs: None,
            closed_non_bugs: None,
            source: TESTING_SOURCE.to_string(),
        }
    }

    #[test]
    fn test_change_failure_rate_is_pooled_by_volume() {
        let mut repos = BTreeMap::new();
        repos.insert("a/one".to_string(), dora(2, 0.067, Some(4.0), Some(0.5), Some(1.0)));
        repos.insert("a/two".to_string(), dora(10, 0.333, Some(1.0), Some(0.0), None));

        let overall = aggregate_dora(&repos);
        assert_eq!(overall.deployments, 12);
        assert_eq!(overall.change_failure_rate, Some(0.083));
        assert_eq!(overall.deployment_frequency_per_day, Some(0.4));
        assert_eq!(overall.lead_time_hours_median, Some(2.5));
        assert_eq!(overall.time_to_restore_hours_avg, Some(1.0));
    }

    #[test]
    fn test_pooled_failures_come_from_rounded_rates() {
        let mut repos = BTreeMap::new();
        // One real failure, reported as 0.001 after rounding.
        repos.insert("a/large".to_string(), dora(1600, 53.333, None, Some(0.001), None));
        repos.insert("a/clean".to_string(), dora(1400, 46.667, None, Some(0.0), None));

        let overall = aggregate_dora(&repos);
        assert_eq!(overall.deployments, 3000);
        // 2 recovered failures over 3000 rather than 1.
        assert_eq!(overall.change_failure_rate, Some(0.001));
    }

    #[test]
    fn test_null_metrics_are_skipped() {
        let mut repos = BTreeMap::new();
        repos.insert("a/quiet".to_string(), DeploymentMetrics::empty());
        repos.insert("a/busy".to_string(), dora(4, 0.133, Some(3.0), Some(0.25), Some(2.0)));

        let overall = aggregate_dora(&repos);
        assert_eq!(overall.change_failure_rate, Some(0.25));
        assert_eq!(overall.lead_time_hours_median, Some(3.0));
        assert_eq!(overall.deployment_frequency_per_day, Some(0.133));
    }

    #[test]
    fn test_empty_fleet() {
        let overall = aggregate_dora(&BTreeMap::new());
        assert_eq!(overall.deployments, 0);
        assert_eq!(overall.deployment_frequency_per_day, None);
        assert_eq!(overall.change_failure_rate, None);

        let overall = aggregate_testing(&BTreeMap::new());
        assert_eq!(overall.automation_rate, None);
        assert_eq!(overall.defect_leakage_rate, None);
    }

    #[test]
    fn test_testing_means_skip_null_leakage() {
        let mut repos = BTreeMap::new();
        repos.insert("a/one".to_string(), testing(1.0, Some(0.2)));
        repos.insert("a/two".to_string(), testing(0.5, None));
        repos.insert("a/three".to_string(), testing(0.0, Some(0.4)));

        let overall = aggregate_testing(&repos);
        assert_eq!(overall.automation_rate, Some(0.5));
        assert_eq!(overall.defect_leakage_rate, Some(0.3));
    }
}
