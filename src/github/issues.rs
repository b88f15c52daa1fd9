use chrono::{DateTime, Utc};

use super::client::{GitHubClient, PageRequest};
use super::errors::GitHubError;
use super::pagination::{Collection, Ordering, Windowed};
use super::types::{Issue, IssueState, RepoId};

impl Windowed for Issue {
    fn window_timestamp(&self) -> Option<DateTime<Utc>> {
        Some(self.activity_at())
    }

    /// Listings are sorted by `updated`; `closed_at` does not follow that order.
    fn order_timestamp(&self) -> Option<DateTime<Utc>> {
        Some(self.updated_at.unwrap_or(self.created_at))
    }

    /// The issues endpoint also returns pull requests.
    fn is_countable(&self) -> bool {
        !self.is_pull_request()
    }
}

impl GitHubClient {
    /// Fetch issues in a state, most recently updated first, stopping at the
    /// first page with no update inside the window.
    pub async fn fetch_issues_since(
        &self,
        repo: &RepoId,
        state: IssueState,
        since: DateTime<Utc>,
    ) -> Result<Vec<Issue>, GitHubError> {
        let request = PageRequest::new(
            format!("/repos/{}/{}/issues", repo.owner, repo.repo),
            Collection::Bare,
        )
        .param("state", state.as_str())
        .param("sort", "updated")
        .param("direction", "desc")
        .since(since, Ordering::NewestFirst);

        self.fetch_all(&request).await
    }
}
