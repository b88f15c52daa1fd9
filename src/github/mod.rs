pub mod actions;
pub mod client;
pub mod errors;
pub mod issues;
pub mod pagination;
pub mod types;

pub use client::{CiSource, GitHubClient, PageRequest};
pub use errors::GitHubError;
pub use types::{CommitRef, Conclusion, Issue, IssueState, Label, RepoId, Workflow, WorkflowRun};
