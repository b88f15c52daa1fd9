use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::errors::GitHubError;

/// `owner/repo` identity of a repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RepoId {
    pub owner: String,
    pub repo: String,
}

impl RepoId {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

impl FromStr for RepoId {
    type Err = GitHubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.split_once('/') {
            Some((owner, repo))
                if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') =>
            {
                Ok(RepoId::new(owner, repo))
            }
            _ => Err(GitHubError::InvalidRepository(trimmed.to_string())),
        }
    }
}

/// Outcome of a completed workflow run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Conclusion {
    Success,
    Failure,
    Cancelled,
    TimedOut,
    Other(String),
}

impl Conclusion {
    /// Failure, cancellation and timeout all count against a deployment.
    pub fn is_failed_deployment(&self) -> bool {
        matches!(
            self,
            Conclusion::Failure | Conclusion::Cancelled | Conclusion::TimedOut
        )
    }

    /// The suite ran to completion, whatever the verdict.
    pub fn is_executed_test(&self) -> bool {
        matches!(self, Conclusion::Success | Conclusion::Failure)
    }
}

impl From<String> for Conclusion {
    fn from(value: String) -> Self {
        match value.to_lowercase().as_str() {
            "success" => Conclusion::Success,
            "failure" => Conclusion::Failure,
            "cancelled" => Conclusion::Cancelled,
            "timed_out" => Conclusion::TimedOut,
            _ => Conclusion::Other(value),
        }
    }
}

impl From<Conclusion> for String {
    fn from(value: Conclusion) -> Self {
        match value {
            Conclusion::Success => "success".to_string(),
            Conclusion::Failure => "failure".to_string(),
            Conclusion::Cancelled => "cancelled".to_string(),
            Conclusion::TimedOut => "timed_out".to_string(),
            Conclusion::Other(other) => other,
        }
    }
}

/// A workflow definition as listed by `/actions/workflows`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub path: String,
}

/// One execution of a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_title: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub head_sha: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub conclusion: Option<Conclusion>,
}

impl WorkflowRun {
    /// Completion time, falling back to creation for runs missing `updated_at`.
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.updated_at.unwrap_or(self.created_at)
    }

    pub fn is_success(&self) -> bool {
        self.conclusion == Some(Conclusion::Success)
    }

    pub fn is_failed_deployment(&self) -> bool {
        self.conclusion
            .as_ref()
            .is_some_and(Conclusion::is_failed_deployment)
    }

    pub fn is_executed_test(&self) -> bool {
        self.conclusion
            .as_ref()
            .is_some_and(Conclusion::is_executed_test)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitSignature {
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitDetail {
    #[serde(default)]
    pub author: Option<GitSignature>,
    #[serde(default)]
    pub committer: Option<GitSignature>,
}

/// A commit as returned by `/commits/{sha}`; only the dates matter here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitRef {
    pub sha: String,
    pub commit: CommitDetail,
}

impl CommitRef {
    /// Author date, else committer date.
    pub fn authored_at(&self) -> Option<DateTime<Utc>> {
        let author = self.commit.author.as_ref().and_then(|sig| sig.date);
        author.or_else(|| self.commit.committer.as_ref().and_then(|sig| sig.date))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
}

/// A tracker item from `/issues`. Pull requests share the endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub pull_request: Option<serde_json::Value>,
}

impl Issue {
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }

    pub fn has_label(&self, name: &str) -> bool {
        self.labels
            .iter()
            .any(|label| label.name.eq_ignore_ascii_case(name))
    }

    pub fn is_bug(&self) -> bool {
        self.has_label("bug")
    }

    /// Most recent lifecycle timestamp, used to place the issue in a window.
    pub fn activity_at(&self) -> DateTime<Utc> {
        self.closed_at.or(self.updated_at).unwrap_or(self.created_at)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IssueState {
    Open,
    Closed,
}

impl IssueState {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueState::Open => "open",
            IssueState::Closed => "closed",
        }
    }
}

/// Body of `/contents/{path}`.
#[derive(Debug, Clone, Deserialize)]
pub struct FileContent {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub encoding: Option<String>,
}
