use super::stats::{ratio, round_to};
use super::types::{TestingMetrics, Window, TESTING_SOURCE};
use crate::github::{Issue, WorkflowRun};

/// Open and closed issues seen for a repository in the window.
#[derive(Debug, Clone, Default)]
pub struct IssueActivity {
    pub open: Vec<Issue>,
    pub closed: Vec<Issue>,
}

/// Bug and delivered-work counts derived from [`IssueActivity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeakageCounts {
    pub open_bugs: u64,
    pub closed_non_bugs: u64,
}

impl IssueActivity {
    pub fn counts(&self, window: &Window) -> LeakageCounts {
        let open_bugs = self
            .open
            .iter()
            .filter(|issue| !issue.is_pull_request())
            .filter(|issue| issue.is_bug())
            .filter(|issue| window.contains(issue.activity_at()))
            .count() as u64;

        // Bug closures are fixes, not delivered work.
        let closed_non_bugs = self
            .closed
            .iter()
            .filter(|issue| !issue.is_pull_request())
            .filter(|issue| !issue.is_bug())
            .filter(|issue| window.contains(issue.closed_at.unwrap_or_else(|| issue.activity_at())))
            .count() as u64;

        LeakageCounts {
            open_bugs,
            closed_non_bugs,
        }
    }
}

/// Reduces runs of test workflows and issue activity to testing metrics.
#[derive(Debug, Clone, Copy)]
pub struct TestingCalculator {
    window: Window,
}

impl TestingCalculator {
    pub fn new(window: Window) -> Self {
        Self { window }
    }

    /// `test_runs` holds every run of every workflow classified as a test
    /// workflow. `issues` is `None` when the issue history was unavailable.
    pub fn compute(
        &self,
        test_workflows: u64,
        test_runs: &[WorkflowRun],
        issues: Option<&IssueActivity>,
    ) -> TestingMetrics {
        let in_window: Vec<&WorkflowRun> = test_runs
            .iter()
            .filter(|run| self.window.contains(run.created_at))
            .collect();
        let total = in_window.len() as u64;
        let executed = in_window.iter().filter(|run| run.is_executed_test()).count() as u64;

        // No runs observed means no automation, a real zero.
        let automation_rate = ratio(executed, total).map_or(0.0, |rate| round_to(rate, 3));

        let counts = issues.map(|activity| activity.counts(&self.window));
        let defect_leakage_rate = counts
            .and_then(|c| ratio(c.open_bugs, c.closed_non_bugs))
            .map(|rate| round_to(rate, 3));

        TestingMetrics {
            automation_rate,
            defect_leakage_rate,
            test_workflows,
            test_runs: total,
            executed_test_runs: executed,
            open_bugs: counts.map(|c| c.open_bugs),
            closed_non_bugs: counts.map(|c| c.closed_non_bugs),
            source: TESTING_SOURCE.to_string(),
        }
    }
}
