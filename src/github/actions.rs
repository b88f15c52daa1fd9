// GitHub Actions endpoints: workflows, their runs, the commits they built and
// the workflow definition files.
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::debug;

use super::client::{GitHubClient, PageRequest};
use super::errors::GitHubError;
use super::pagination::{Collection, Ordering, Windowed};
use super::types::{CommitRef, FileContent, RepoId, Workflow, WorkflowRun};

impl Windowed for Workflow {
    fn window_timestamp(&self) -> Option<DateTime<Utc>> {
        None
    }
}

impl Windowed for WorkflowRun {
    fn window_timestamp(&self) -> Option<DateTime<Utc>> {
        Some(self.created_at)
    }
}

impl GitHubClient {
    pub async fn fetch_workflows(&self, repo: &RepoId) -> Result<Vec<Workflow>, GitHubError> {
        let request = PageRequest::new(
            format!("/repos/{}/{}/actions/workflows", repo.owner, repo.repo),
            Collection::Wrapped("workflows"),
        );
        self.fetch_all(&request).await
    }

    /// Runs are narrowed server-side with `created>=` and filtered again
    /// client-side; run listings carry no ordering guarantee we rely on.
    pub async fn fetch_workflow_runs(
        &self,
        repo: &RepoId,
        workflow_id: u64,
        since: DateTime<Utc>,
    ) -> Result<Vec<WorkflowRun>, GitHubError> {
        let request = PageRequest::new(
            format!(
                "/repos/{}/{}/actions/workflows/{}/runs",
                repo.owner, repo.repo, workflow_id
            ),
            Collection::Wrapped("workflow_runs"),
        )
        .param(
            "created",
            format!(">={}", since.to_rfc3339_opts(SecondsFormat::Secs, true)),
        )
        .since(since, Ordering::Unordered);

        self.fetch_all(&request).await
    }

    pub async fn fetch_commit(&self, repo: &RepoId, sha: &str) -> Result<CommitRef, GitHubError> {
        self.fetch_one(&format!("/repos/{}/{}/commits/{}", repo.owner, repo.repo, sha))
            .await
    }

    pub async fn fetch_workflow_content(
        &self,
        repo: &RepoId,
        path: &str,
    ) -> Result<String, GitHubError> {
        let cache_key = format!("{repo}:{path}");
        if let Some(cached) = self.content_cache.get(&cache_key).await {
            self.metrics.record_cache_hit();
            debug!(repo = %repo, path, "Workflow content cache hit");
            return Ok(cached);
        }
        self.metrics.record_cache_miss();

        let route = format!(
            "/repos/{}/{}/contents/{}",
            repo.owner,
            repo.repo,
            path.trim_start_matches('/')
        );
        let file: FileContent = self.fetch_one(&route).await?;
        let text = decode_content(path, &file)?;

        self.content_cache.insert(cache_key, text.clone()).await;
        Ok(text)
    }
}

/// Decode a `/contents` payload. GitHub wraps base64 at 60 columns.
pub fn decode_content(path: &str, file: &FileContent) -> Result<String, GitHubError> {
    let encoding_error = |message: String| GitHubError::ContentEncoding {
        path: path.to_string(),
        message,
    };

    match file.encoding.as_deref() {
        Some("base64") | None => {}
        Some(other) => return Err(encoding_error(format!("unsupported encoding '{other}'"))),
    }

    let encoded = file
        .content
        .as_deref()
        .ok_or_else(|| encoding_error("response has no content".to_string()))?;
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = BASE64
        .decode(compact.as_bytes())
        .map_err(|e| encoding_error(e.to_string()))?;

    String::from_utf8(bytes).map_err(|e| encoding_error(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(content: Option<&str>, encoding: Option<&str>) -> FileContent {
        FileContent {
            content: content.map(str::to_string),
            encoding: encoding.map(str::to_string),
        }
    }

    #[test]
    fn test_decode_wrapped_base64() {
        let encoded = BASE64.encode("jobs:\n  test:\n    run: cargo test\n");
        let (head, tail) = encoded.split_at(10);
        let wrapped = format!("{head}\n{tail}\n");

        let text = decode_content("ci.yml", &file(Some(&wrapped), Some("base64"))).unwrap();
        assert!(text.contains("cargo test"));
    }

    #[test]
    fn test_decode_rejects_unknown_encoding() {
        let err = decode_content("ci.yml", &file(Some("abc"), Some("utf-16"))).unwrap_err();
        assert!(matches!(err, GitHubError::ContentEncoding { .. }));
    }

    #[test]
    fn test_decode_rejects_missing_or_invalid_content() {
        assert!(decode_content("ci.yml", &file(None, Some("base64"))).is_err());
        assert!(decode_content("ci.yml", &file(Some("!!not base64!!"), Some("base64"))).is_err());
    }
}
