use chrono::{DateTime, Utc};
use std::collections::HashMap;

use super::stats::{hours_between, mean, median, ratio, round_to};
use super::types::{DeploymentMetrics, DeploymentOutcome, LeadTimeDiagnostics};
use crate::github::WorkflowRun;

/// Reduces one repository's production deployments to DORA metrics.
#[derive(Debug, Clone, Copy)]
pub struct DeploymentCalculator {
    window_days: u32,
}

impl DeploymentCalculator {
    pub fn new(window_days: u32) -> Self {
        Self {
            window_days: window_days.max(1),
        }
    }

    /// `commit_dates` maps head SHAs to their author (else committer) date;
    /// a successful deployment whose SHA is absent counts as unresolved.
    pub fn compute(
        &self,
        deployments: &[WorkflowRun],
        commit_dates: &HashMap<String, DateTime<Utc>>,
    ) -> DeploymentOutcome {
        // Stable: runs completing at the same instant keep fetch order.
        let mut ordered: Vec<&WorkflowRun> = deployments.iter().collect();
        ordered.sort_by_key(|run| run.completed_at());

        let total = ordered.len() as u64;
        let failures = ordered.iter().filter(|run| run.is_failed_deployment()).count() as u64;
        let (lead_times, diagnostics) = lead_time_samples(&ordered, commit_dates);
        let restores = time_to_restore_samples(&ordered);

        let metrics = DeploymentMetrics {
            deployments: total,
            deployment_frequency_per_day: round_to(total as f64 / f64::from(self.window_days), 3),
            lead_time_hours_median: median(&lead_times).map(|hours| round_to(hours, 2)),
            change_failure_rate: ratio(failures, total).map(|rate| round_to(rate, 3)),
            time_to_restore_hours_avg: mean(&restores).map(|hours| round_to(hours, 2)),
        };

        DeploymentOutcome {
            metrics,
            diagnostics,
        }
    }
}

/// Commit-to-deploy hours for every successful deployment.
pub fn lead_time_samples(
    ordered: &[&WorkflowRun],
    commit_dates: &HashMap<String, DateTime<Utc>>,
) -> (Vec<f64>, LeadTimeDiagnostics) {
    let mut samples = Vec::new();
    let mut diagnostics = LeadTimeDiagnostics::default();

    for run in ordered.iter().filter(|run| run.is_success()) {
        let Some(sha) = run.head_sha.as_deref() else {
            continue;
        };
        let Some(committed_at) = commit_dates.get(sha) else {
            diagnostics.missing_commits += 1;
            continue;
        };

        let hours = hours_between(*committed_at, run.completed_at());
        if hours >= 0.0 {
            samples.push(hours);
        } else {
            diagnostics.negative_samples += 1;
        }
    }

    (samples, diagnostics)
}

/// Hours from each failed deployment to the first success after it.
///
/// Only the first later success is paired with a failure, and a pairing with
/// negative elapsed time is discarded. A trailing failure yields nothing.
pub fn time_to_restore_samples(ordered: &[&WorkflowRun]) -> Vec<f64> {
    let mut samples = Vec::new();

    for (i, failed) in ordered.iter().enumerate() {
        if !failed.is_failed_deployment() {
            continue;
        }
        let Some(restored) = ordered[i + 1..].iter().find(|run| run.is_success()) else {
            continue;
        };

        let hours = hours_between(failed.completed_at(), restored.completed_at());
        if hours >= 0.0 {
            samples.push(hours);
        }
    }

    samples
}
