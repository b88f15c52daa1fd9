use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// The sliding window every metric is computed over.
///
/// `now` is fixed per invocation so that recomputing over the same fetched
/// data yields the same document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub days: u32,
    pub now: DateTime<Utc>,
}

impl Window {
    pub fn new(days: u32, now: DateTime<Utc>) -> Self {
        Self {
            days: days.max(1),
            now,
        }
    }

    pub fn ending_now(days: u32) -> Self {
        Self::new(days, Utc::now())
    }

    pub fn since(&self) -> DateTime<Utc> {
        self.now - Duration::days(i64::from(self.days))
    }

    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp >= self.since()
    }
}

/// DORA metrics for one repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentMetrics {
    pub deployments: u64,
    pub deployment_frequency_per_day: f64,
    pub lead_time_hours_median: Option<f64>,
    pub change_failure_rate: Option<f64>,
    pub time_to_restore_hours_avg: Option<f64>,
}

impl DeploymentMetrics {
    pub fn empty() -> Self {
        Self {
            deployments: 0,
            deployment_frequency_per_day: 0.0,
            lead_time_hours_median: None,
            change_failure_rate: None,
            time_to_restore_hours_avg: None,
        }
    }
}

/// Sample accounting that accompanies a [`DeploymentMetrics`] record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeadTimeDiagnostics {
    /// Successful deployments whose commit could not be resolved.
    pub missing_commits: u64,
    /// Samples dropped because the commit postdates the deployment.
    pub negative_samples: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentOutcome {
    pub metrics: DeploymentMetrics,
    pub diagnostics: LeadTimeDiagnostics,
}

pub const TESTING_SOURCE: &str = "github_actions+issues";

/// Test-automation health for one repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestingMetrics {
    pub automation_rate: f64,
    pub defect_leakage_rate: Option<f64>,
    pub test_workflows: u64,
    pub test_runs: u64,
    pub executed_test_runs: u64,
    pub open_bugs: Option<u64>,
    pub closed_non_bugs: Option<u64>,
    pub source: String,
}

/// Fleet-wide DORA record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoraOverall {
    pub deployments: u64,
    pub deployment_frequency_per_day: Option<f64>,
    /// Median of per-repository medians, not a pooled median.
    pub lead_time_hours_median: Option<f64>,
    pub change_failure_rate: Option<f64>,
    pub time_to_restore_hours_avg: Option<f64>,
}

/// Fleet-wide testing record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestingOverall {
    pub automation_rate: Option<f64>,
    pub defect_leakage_rate: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_window_bounds() {
        let now = Utc.with_ymd_and_hms(2025, 3, 31, 12, 0, 0).unwrap();
        let window = Window::new(30, now);
        assert_eq!(window.since(), Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap());
        assert!(window.contains(window.since()));
        assert!(!window.contains(window.since() - Duration::seconds(1)));
    }

    #[test]
    fn test_zero_day_window_is_clamped() {
        let window = Window::new(0, Utc::now());
        assert_eq!(window.days, 1);
    }

    #[test]
    fn test_empty_deployment_metrics_serialize_nulls() {
        let json = serde_json::to_value(DeploymentMetrics::empty()).unwrap();
        assert_eq!(json["deployments"], 0);
        assert!(json["change_failure_rate"].is_null());
        assert!(json["lead_time_hours_median"].is_null());
    }
}
