use async_trait::async_trait;
use chrono::{DateTime, Utc};
use moka::future::Cache;
use octocrab::Octocrab;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::errors::GitHubError;
use super::pagination::{Collection, Ordering, Paginator, Windowed};
use super::types::{CommitRef, Issue, IssueState, RepoId, Workflow, WorkflowRun};
use crate::config::GitHubConfig;
use crate::observability::ApiMetrics;

/// Read-only view of the CI provider that the metrics engine consumes.
///
/// Listing calls are primary: an error aborts the repository. `commit` and
/// `workflow_content` are auxiliary and callers treat errors as a missing
/// sample.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CiSource: Send + Sync {
    async fn list_workflows(&self, repo: &RepoId) -> Result<Vec<Workflow>, GitHubError>;

    /// Runs of one workflow created at or after `since`.
    async fn list_runs(
        &self,
        repo: &RepoId,
        workflow_id: u64,
        since: DateTime<Utc>,
    ) -> Result<Vec<WorkflowRun>, GitHubError>;

    /// Issues (never pull requests) with activity at or after `since`.
    async fn list_issues(
        &self,
        repo: &RepoId,
        state: IssueState,
        since: DateTime<Utc>,
    ) -> Result<Vec<Issue>, GitHubError>;

    async fn commit(&self, repo: &RepoId, sha: &str) -> Result<CommitRef, GitHubError>;

    /// Decoded text of a workflow definition file.
    async fn workflow_content(&self, repo: &RepoId, path: &str) -> Result<String, GitHubError>;
}

/// One paginated listing call.
#[derive(Debug, Clone)]
pub struct PageRequest {
    pub route: String,
    pub query: Vec<(&'static str, String)>,
    pub collection: Collection,
    pub ordering: Ordering,
    pub since: Option<DateTime<Utc>>,
}

impl PageRequest {
    pub fn new(route: impl Into<String>, collection: Collection) -> Self {
        Self {
            route: route.into(),
            query: Vec::new(),
            collection,
            ordering: Ordering::Unordered,
            since: None,
        }
    }

    pub fn param(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.query.push((key, value.into()));
        self
    }

    pub fn since(mut self, since: DateTime<Utc>, ordering: Ordering) -> Self {
        self.since = Some(since);
        self.ordering = ordering;
        self
    }
}

/// Octocrab-backed metrics source.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    pub(super) octocrab: Octocrab,
    page_size: u8,
    pub(super) metrics: Arc<ApiMetrics>,
    pub(super) content_cache: Cache<String, String>,
}

impl GitHubClient {
    pub fn new(config: &GitHubConfig) -> Result<Self, GitHubError> {
        let mut builder = Octocrab::builder()
            .base_uri(config.api_base.as_str())
            .map_err(GitHubError::Client)?;

        // Unauthenticated access is valid, only with a lower quota.
        match config.token.as_deref().filter(|token| !token.trim().is_empty()) {
            Some(token) => builder = builder.personal_token(token.to_string()),
            None => debug!("No GitHub token configured, using unauthenticated requests"),
        }

        let octocrab = builder.build().map_err(GitHubError::Client)?;
        Ok(Self::from_octocrab(octocrab, config.page_size))
    }

    pub fn from_octocrab(octocrab: Octocrab, page_size: u8) -> Self {
        // Workflow files are shared by every run of a workflow; one fetch per
        // invocation is enough.
        let content_cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300))
            .build();

        Self {
            octocrab,
            page_size: page_size.max(1),
            metrics: Arc::new(ApiMetrics::new()),
            content_cache,
        }
    }

    pub fn metrics(&self) -> Arc<ApiMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Walk every page of a collection, decoding items one at a time.
    ///
    /// Undecodable items are dropped and counted rather than failing the
    /// listing.
    pub async fn fetch_all<T>(&self, request: &PageRequest) -> Result<Vec<T>, GitHubError>
    where
        T: DeserializeOwned + Windowed,
    {
        let mut paginator = Paginator::new(self.page_size, request.since, request.ordering);
        let mut items = Vec::new();

        while let Some(page) = paginator.next_page() {
            let mut query = request.query.clone();
            query.push(("per_page", paginator.page_size().to_string()));
            query.push(("page", page.to_string()));

            let body: Value = self.get_json(&request.route, Some(&query)).await?;
            self.metrics.record_page();
            let raw = request.collection.extract(&request.route, body)?;
            let raw_len = raw.len();

            // Early exit follows the sort key, so uncounted items still count here.
            let mut in_window = 0;
            let mut malformed = 0u64;
            for value in raw {
                match serde_json::from_value::<T>(value) {
                    Ok(item) => {
                        let recent = |timestamp: Option<DateTime<Utc>>| {
                            timestamp.map_or(true, |timestamp| paginator.in_window(timestamp))
                        };
                        if recent(item.order_timestamp()) {
                            in_window += 1;
                        }
                        if recent(item.window_timestamp()) && item.is_countable() {
                            items.push(item);
                        }
                    }
                    Err(e) => {
                        malformed += 1;
                        debug!(
                            route = %request.route,
                            page,
                            error = %e,
                            "Discarding malformed record"
                        );
                    }
                }
            }

            if malformed > 0 {
                warn!(
                    route = %request.route,
                    page,
                    malformed,
                    "Discarded records that could not be decoded"
                );
                self.metrics.record_malformed(malformed);
            }

            debug!(route = %request.route, page, raw_len, in_window, "Fetched page");
            paginator.advance(raw_len, in_window);
        }

        Ok(items)
    }

    /// Single non-paginated resource.
    pub async fn fetch_one<T>(&self, route: &str) -> Result<T, GitHubError>
    where
        T: DeserializeOwned,
    {
        let body: Value = self.get_json::<()>(route, None).await?;
        serde_json::from_value(body).map_err(|e| GitHubError::Decode {
            resource: route.to_string(),
            message: e.to_string(),
        })
    }

    async fn get_json<P>(&self, route: &str, query: Option<&P>) -> Result<Value, GitHubError>
    where
        P: serde::Serialize + ?Sized,
    {
        self.metrics.record_request();
        self.octocrab
            .get::<Value, _, P>(route, query)
            .await
            .map_err(|e| {
                self.metrics.record_transport_error();
                GitHubError::transport(route, e)
            })
    }
}

#[async_trait]
impl CiSource for GitHubClient {
    async fn list_workflows(&self, repo: &RepoId) -> Result<Vec<Workflow>, GitHubError> {
        self.fetch_workflows(repo).await
    }

    async fn list_runs(
        &self,
        repo: &RepoId,
        workflow_id: u64,
        since: DateTime<Utc>,
    ) -> Result<Vec<WorkflowRun>, GitHubError> {
        self.fetch_workflow_runs(repo, workflow_id, since).await
    }

    async fn list_issues(
        &self,
        repo: &RepoId,
        state: IssueState,
        since: DateTime<Utc>,
    ) -> Result<Vec<Issue>, GitHubError> {
        self.fetch_issues_since(repo, state, since).await
    }

    async fn commit(&self, repo: &RepoId, sha: &str) -> Result<CommitRef, GitHubError> {
        self.fetch_commit(repo, sha).await
    }

    async fn workflow_content(&self, repo: &RepoId, path: &str) -> Result<String, GitHubError> {
        self.fetch_workflow_content(repo, path).await
    }
}
