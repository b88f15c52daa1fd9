//! Orchestration of one metrics invocation.
//!
//! Repositories are processed strictly in order. Listing workflows and their
//! runs is primary: a failure there records the repository under `errors` and
//! the batch moves on. Everything else (commits, workflow files, issues) is
//! auxiliary and only ever costs a sample.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn, Instrument};

use crate::classify::{RunClassifier, RunSignals, TestEvidence};
use crate::github::{CiSource, GitHubError, IssueState, RepoId, Workflow, WorkflowRun};
use crate::metrics::{
    DeploymentCalculator, DeploymentMetrics, DoraReport, IssueActivity, TestingCalculator,
    TestingMetrics, TestingReport, Window,
};
use crate::observability::{create_repository_span, ApiMetrics, OperationTimer};
use crate::telemetry::generate_correlation_id;

/// Workflows of one repository with their in-window runs.
#[derive(Debug, Clone, Default)]
pub struct RepoSnapshot {
    pub workflows: Vec<(Workflow, Vec<WorkflowRun>)>,
}

impl RepoSnapshot {
    pub fn runs(&self) -> impl Iterator<Item = &WorkflowRun> {
        self.workflows.iter().flat_map(|(_, runs)| runs.iter())
    }
}

pub struct MetricsEngine<S> {
    source: S,
    classifier: RunClassifier,
    window: Window,
    metrics: Arc<ApiMetrics>,
    correlation_id: String,
}

impl<S: CiSource> MetricsEngine<S> {
    pub fn new(source: S, classifier: RunClassifier, window: Window) -> Self {
        Self {
            source,
            classifier,
            window,
            metrics: Arc::new(ApiMetrics::new()),
            correlation_id: generate_correlation_id(),
        }
    }

    /// Share counters with the source so one summary covers both.
    pub fn with_metrics(mut self, metrics: Arc<ApiMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = correlation_id.into();
        self
    }

    pub fn metrics(&self) -> Arc<ApiMetrics> {
        Arc::clone(&self.metrics)
    }

    pub async fn dora_report(&self, repos: &[RepoId]) -> DoraReport {
        let mut records = BTreeMap::new();
        let mut errors = BTreeMap::new();

        for repo in repos {
            let span = create_repository_span(&repo.full_name(), "dora", &self.correlation_id);
            let result = async {
                let snapshot = self.snapshot(repo).await?;
                Ok::<_, GitHubError>(self.deployment_metrics(repo, &snapshot).await)
            }
            .instrument(span)
            .await;

            match result {
                Ok(record) => {
                    records.insert(repo.full_name(), record);
                }
                Err(e) => self.record_failure(&mut errors, repo, e),
            }
        }

        let report = DoraReport::new(&self.window, records, errors);
        info!(summary = %report.summary(), "DORA metrics computed");
        report
    }

    pub async fn testing_report(&self, repos: &[RepoId]) -> TestingReport {
        let mut records = BTreeMap::new();
        let mut errors = BTreeMap::new();

        for repo in repos {
            let span = create_repository_span(&repo.full_name(), "testing", &self.correlation_id);
            let result = async {
                let snapshot = self.snapshot(repo).await?;
                Ok::<_, GitHubError>(self.testing_metrics(repo, &snapshot).await)
            }
            .instrument(span)
            .await;

            match result {
                Ok(record) => {
                    records.insert(repo.full_name(), record);
                }
                Err(e) => self.record_failure(&mut errors, repo, e),
            }
        }

        let report = TestingReport::new(&self.window, records, errors);
        info!(summary = %report.summary(), "Testing metrics computed");
        report
    }

    /// Both documents from a single pass over each repository.
    pub async fn all_reports(&self, repos: &[RepoId]) -> (DoraReport, TestingReport) {
        let mut dora = BTreeMap::new();
        let mut testing = BTreeMap::new();
        let mut errors = BTreeMap::new();

        for repo in repos {
            let span = create_repository_span(&repo.full_name(), "all", &self.correlation_id);
            let result = async {
                let snapshot = self.snapshot(repo).await?;
                let deployment = self.deployment_metrics(repo, &snapshot).await;
                let tests = self.testing_metrics(repo, &snapshot).await;
                Ok::<_, GitHubError>((deployment, tests))
            }
            .instrument(span)
            .await;

            match result {
                Ok((deployment, tests)) => {
                    dora.insert(repo.full_name(), deployment);
                    testing.insert(repo.full_name(), tests);
                }
                Err(e) => self.record_failure(&mut errors, repo, e),
            }
        }

        let dora = DoraReport::new(&self.window, dora, errors.clone());
        let testing = TestingReport::new(&self.window, testing, errors);
        info!(dora = %dora.summary(), testing = %testing.summary(), "Metrics computed");
        (dora, testing)
    }

    /// Primary listings for one repository.
    pub async fn snapshot(&self, repo: &RepoId) -> Result<RepoSnapshot, GitHubError> {
        let timer = OperationTimer::new(&format!("snapshot {repo}"));
        let since = self.window.since();

        let workflows = self.source.list_workflows(repo).await?;
        let mut snapshot = RepoSnapshot::default();
        for workflow in workflows {
            let runs: Vec<WorkflowRun> = self
                .source
                .list_runs(repo, workflow.id, since)
                .await?
                .into_iter()
                .filter(|run| self.window.contains(run.created_at))
                .collect();
            debug!(workflow = %workflow.name, runs = runs.len(), "Listed workflow runs");
            snapshot.workflows.push((workflow, runs));
        }

        timer.finish();
        Ok(snapshot)
    }

    pub async fn deployment_metrics(
        &self,
        repo: &RepoId,
        snapshot: &RepoSnapshot,
    ) -> DeploymentMetrics {
        let deployments: Vec<WorkflowRun> = snapshot
            .runs()
            .filter(|run| self.classifier.is_production_run(repo, run))
            .cloned()
            .collect();

        let commit_dates = self.resolve_commit_dates(repo, &deployments).await;
        let outcome =
            DeploymentCalculator::new(self.window.days).compute(&deployments, &commit_dates);

        if outcome.diagnostics.missing_commits > 0 {
            warn!(
                skipped = outcome.diagnostics.missing_commits,
                "Deployments skipped for lead time, commit could not be resolved"
            );
        }
        if outcome.diagnostics.negative_samples > 0 {
            debug!(
                dropped = outcome.diagnostics.negative_samples,
                "Lead-time samples dropped, commit postdates deployment"
            );
        }
        info!(deployments = outcome.metrics.deployments, "Deployment metrics computed");

        outcome.metrics
    }

    pub async fn testing_metrics(&self, repo: &RepoId, snapshot: &RepoSnapshot) -> TestingMetrics {
        let mut test_workflows = 0u64;
        let mut test_runs = Vec::new();

        for (workflow, runs) in &snapshot.workflows {
            let content = self.workflow_content(repo, workflow).await;
            let evidence = TestEvidence {
                signals: RunSignals::from(workflow),
                content: content.as_deref(),
            };
            if self.classifier.is_test_workflow(&evidence) {
                debug!(workflow = %workflow.name, runs = runs.len(), "Classified as test workflow");
                test_workflows += 1;
                test_runs.extend(runs.iter().cloned());
            }
        }

        let issues = self.issue_activity(repo).await;
        let metrics = TestingCalculator::new(self.window).compute(
            test_workflows,
            &test_runs,
            issues.as_ref(),
        );
        info!(
            test_workflows,
            test_runs = metrics.test_runs,
            executed = metrics.executed_test_runs,
            "Testing metrics computed"
        );
        metrics
    }

    /// Author (else committer) dates for the heads of successful deployments.
    async fn resolve_commit_dates(
        &self,
        repo: &RepoId,
        deployments: &[WorkflowRun],
    ) -> HashMap<String, DateTime<Utc>> {
        let mut seen = HashSet::new();
        let mut dates = HashMap::new();

        let shas = deployments
            .iter()
            .filter(|run| run.is_success())
            .filter_map(|run| run.head_sha.as_deref());

        for sha in shas {
            if !seen.insert(sha) {
                continue;
            }
            match self.source.commit(repo, sha).await {
                Ok(commit) => match commit.authored_at() {
                    Some(date) => {
                        dates.insert(sha.to_string(), date);
                    }
                    None => debug!(sha, "Commit carries no author or committer date"),
                },
                Err(e) => {
                    self.metrics.record_auxiliary_failure();
                    warn!(sha, error = %e, "Commit lookup failed, skipping lead-time sample");
                }
            }
        }

        dates
    }

    async fn workflow_content(&self, repo: &RepoId, workflow: &Workflow) -> Option<String> {
        if workflow.path.is_empty() {
            return None;
        }
        match self.source.workflow_content(repo, &workflow.path).await {
            Ok(content) => Some(content),
            Err(e) => {
                self.metrics.record_auxiliary_failure();
                warn!(
                    path = %workflow.path,
                    error = %e,
                    "Workflow file unavailable, falling back to name keywords"
                );
                None
            }
        }
    }

    /// `None` when either issue listing fails; leakage is then unknown.
    async fn issue_activity(&self, repo: &RepoId) -> Option<IssueActivity> {
        let since = self.window.since();
        let listings = async {
            let open = self.source.list_issues(repo, IssueState::Open, since).await?;
            let closed = self.source.list_issues(repo, IssueState::Closed, since).await?;
            Ok::<_, GitHubError>(IssueActivity { open, closed })
        };

        match listings.await {
            Ok(activity) => Some(activity),
            Err(e) => {
                self.metrics.record_auxiliary_failure();
                warn!(
                    error = %e,
                    hint = e.hint(),
                    "Issue history unavailable, defect leakage unknown"
                );
                None
            }
        }
    }

    fn record_failure(
        &self,
        errors: &mut BTreeMap<String, String>,
        repo: &RepoId,
        error: GitHubError,
    ) {
        warn!(repo = %repo, error = %error, hint = error.hint(), "Skipping repository");
        errors.insert(repo.full_name(), error.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::HintTable;
    use crate::github::client::MockCiSource;
    use crate::github::{CommitRef, Conclusion, Issue, Label};
    use crate::github::types::{CommitDetail, GitSignature};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 31, 0, 0, 0).unwrap()
    }

    fn window() -> Window {
        Window::new(30, now())
    }

    fn repo() -> RepoId {
        RepoId::new("acme", "api")
    }

    fn workflow(id: u64, name: &str, path: &str) -> Workflow {
        Workflow {
            id,
            name: name.to_string(),
            path: path.to_string(),
        }
    }

    fn run(id: u64, name: &str, hours_ago: i64, conclusion: Conclusion) -> WorkflowRun {
        let done = now() - Duration::hours(hours_ago);
        WorkflowRun {
            id,
            name: Some(name.to_string()),
            display_title: None,
            path: None,
            head_sha: Some(format!("sha{id}")),
            created_at: done - Duration::minutes(5),
            updated_at: Some(done),
            conclusion: Some(conclusion),
        }
    }

    fn commit(sha: &str, at: DateTime<Utc>) -> CommitRef {
        CommitRef {
            sha: sha.to_string(),
            commit: CommitDetail {
                author: Some(GitSignature { date: Some(at) }),
                committer: None,
            },
        }
    }

    fn decode_error(resource: &str) -> GitHubError {
        GitHubError::Decode {
            resource: resource.to_string(),
            message: "boom".to_string(),
        }
    }

    fn engine(source: MockCiSource) -> MetricsEngine<MockCiSource> {
        MetricsEngine::new(source, RunClassifier::standard(HintTable::default()), window())
            .with_correlation_id("test")
    }

    #[tokio::test]
    async fn test_failed_listing_is_recorded_and_batch_continues() {
        let mut source = MockCiSource::new();
        source.expect_list_workflows().returning(|repo| {
            if repo.owner == "broken" {
                Err(decode_error("workflows"))
            } else {
                Ok(Vec::new())
            }
        });

        let repos = vec![RepoId::new("broken", "one"), repo()];
        let report = engine(source).dora_report(&repos).await;

        assert!(report.errors.contains_key("broken/one"));
        assert!(!report.repos.contains_key("broken/one"));
        assert_eq!(report.repos["acme/api"], DeploymentMetrics::empty());
    }

    #[tokio::test]
    async fn test_commit_failure_only_drops_the_sample() {
        let mut source = MockCiSource::new();
        source.expect_list_workflows().returning(|_| {
            Ok(vec![workflow(
                1,
                "Deploy production",
                ".github/workflows/deploy.yml",
            )])
        });
        source.expect_list_runs().returning(|_, _, _| {
            Ok(vec![
                run(10, "Deploy production", 10, Conclusion::Success),
                run(11, "Deploy production", 5, Conclusion::Success),
            ])
        });
        source.expect_commit().returning(|_, sha| {
            if sha == "sha10" {
                Ok(commit(sha, now() - Duration::hours(14)))
            } else {
                Err(decode_error("commit"))
            }
        });

        let engine = engine(source);
        let report = engine.dora_report(&[repo()]).await;

        let record = &report.repos["acme/api"];
        assert_eq!(record.deployments, 2);
        assert_eq!(record.lead_time_hours_median, Some(4.0));
        assert_eq!(engine.metrics().get_stats().auxiliary_failures, 1);
        assert!(report.errors.is_empty());
    }

    #[tokio::test]
    async fn test_repeated_shas_are_resolved_once() {
        let mut source = MockCiSource::new();
        source
            .expect_list_workflows()
            .returning(|_| Ok(vec![workflow(1, "prod deploy", "deploy.yml")]));
        source.expect_list_runs().returning(|_, _, _| {
            let mut first = run(1, "prod deploy", 6, Conclusion::Success);
            let mut retry = run(2, "prod deploy", 3, Conclusion::Success);
            first.head_sha = Some("same".to_string());
            retry.head_sha = Some("same".to_string());
            Ok(vec![first, retry])
        });
        source
            .expect_commit()
            .times(1)
            .returning(|_, sha| Ok(commit(sha, now() - Duration::hours(7))));

        let report = engine(source).dora_report(&[repo()]).await;
        assert_eq!(report.repos["acme/api"].lead_time_hours_median, Some(2.5));
    }

    #[tokio::test]
    async fn test_issue_failure_nulls_leakage_only() {
        let mut source = MockCiSource::new();
        source
            .expect_list_workflows()
            .returning(|_| Ok(vec![workflow(1, "CI", ".github/workflows/ci.yml")]));
        source.expect_list_runs().returning(|_, _, _| {
            Ok(vec![
                run(1, "CI", 2, Conclusion::Success),
                run(2, "CI", 3, Conclusion::Cancelled),
            ])
        });
        source
            .expect_workflow_content()
            .returning(|_, _| Ok("steps:\n  - run: cargo test --all\n".to_string()));
        source
            .expect_list_issues()
            .returning(|_, _, _| Err(decode_error("issues")));

        let engine = engine(source);
        let report = engine.testing_report(&[repo()]).await;

        let record = &report.repos["acme/api"];
        assert_eq!(record.test_workflows, 1);
        assert_eq!(record.automation_rate, 0.5);
        assert_eq!(record.defect_leakage_rate, None);
        assert!(report.errors.is_empty());
    }

    #[tokio::test]
    async fn test_content_failure_falls_back_to_keywords() {
        let mut source = MockCiSource::new();
        source.expect_list_workflows().returning(|_| {
            Ok(vec![
                workflow(1, "Unit tests", ".github/workflows/unit.yml"),
                workflow(2, "Lint", ".github/workflows/lint.yml"),
            ])
        });
        source
            .expect_list_runs()
            .returning(|_, id, _| Ok(vec![run(id, "x", 1, Conclusion::Failure)]));
        source
            .expect_workflow_content()
            .returning(|_, path| Err(decode_error(path)));
        source.expect_list_issues().returning(|_, state, _| {
            let labels = match state {
                IssueState::Open => vec![Label {
                    name: "bug".to_string(),
                }],
                IssueState::Closed => Vec::new(),
            };
            Ok(vec![Issue {
                number: 1,
                created_at: now() - Duration::days(2),
                updated_at: Some(now() - Duration::days(1)),
                closed_at: matches!(state, IssueState::Closed).then(|| now() - Duration::days(1)),
                labels,
                pull_request: None,
            }])
        });

        let engine = engine(source);
        let report = engine.testing_report(&[repo()]).await;

        let record = &report.repos["acme/api"];
        assert_eq!(record.test_workflows, 1);
        assert_eq!(record.test_runs, 1);
        assert_eq!(record.executed_test_runs, 1);
        assert_eq!(record.defect_leakage_rate, Some(1.0));
        assert_eq!(engine.metrics().get_stats().auxiliary_failures, 2);
    }

    #[tokio::test]
    async fn test_all_reports_share_errors() {
        let mut source = MockCiSource::new();
        source
            .expect_list_workflows()
            .returning(|_| Err(decode_error("workflows")));

        let (dora, testing) = engine(source).all_reports(&[repo()]).await;
        assert_eq!(dora.errors, testing.errors);
        assert!(dora.repos.is_empty());
        assert_eq!(testing.overall.automation_rate, None);
    }
}
