use octocrab::Error as OctocrabError;
use thiserror::Error;

/// Failures surfaced by the GitHub-backed metrics source.
///
/// Only `Transport` and `Decode` on a primary listing are fatal for a
/// repository. The engine downgrades every error raised by an auxiliary
/// lookup (commit, workflow file, issue listing) to a skipped sample.
#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("request for {resource} failed: {source}")]
    Transport {
        resource: String,
        #[source]
        source: OctocrabError,
    },
    #[error("unexpected response shape for {resource}: {message}")]
    Decode { resource: String, message: String },
    #[error("invalid repository identifier '{0}', expected owner/repo")]
    InvalidRepository(String),
    #[error("content of {path} could not be decoded: {message}")]
    ContentEncoding { path: String, message: String },
    #[error("failed to build GitHub client: {0}")]
    Client(#[source] OctocrabError),
}

impl GitHubError {
    pub fn transport(resource: impl Into<String>, source: OctocrabError) -> Self {
        GitHubError::Transport {
            resource: resource.into(),
            source,
        }
    }

    /// HTTP status of the failed request, when the API answered at all.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            GitHubError::Transport {
                source: OctocrabError::GitHub { source, .. },
                ..
            } => Some(source.status_code.as_u16()),
            _ => None,
        }
    }

    /// Short operator-facing remediation for the failure.
    pub fn hint(&self) -> &'static str {
        match self.status_code() {
            Some(401) => "token is invalid or expired; refresh GITHUB_TOKEN",
            Some(403) => "permission denied or rate limited; set GITHUB_TOKEN with 'repo' scope",
            Some(404) => "repository may not exist or be private to this token",
            Some(code) if code >= 500 => "GitHub API is degraded; retry later",
            Some(_) => "check repository configuration",
            None => match self {
                GitHubError::Transport { .. } => "network connection to the GitHub API failed",
                GitHubError::InvalidRepository(_) => "repositories are written as owner/repo",
                _ => "unexpected API response",
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_repository_message() {
        let err = GitHubError::InvalidRepository("no-slash".to_string());
        assert_eq!(
            err.to_string(),
            "invalid repository identifier 'no-slash', expected owner/repo"
        );
        assert_eq!(err.status_code(), None);
        assert_eq!(err.hint(), "repositories are written as owner/repo");
    }

    #[test]
    fn test_decode_error_has_generic_hint() {
        let err = GitHubError::Decode {
            resource: "/repos/a/b/actions/workflows".to_string(),
            message: "missing key 'workflows'".to_string(),
        };
        assert!(err.to_string().contains("missing key 'workflows'"));
        assert_eq!(err.hint(), "unexpected API response");
    }
}
