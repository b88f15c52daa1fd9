use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tokio::fs;

use super::aggregate::{aggregate_dora, aggregate_testing};
use super::types::{DeploymentMetrics, DoraOverall, TestingMetrics, TestingOverall, Window};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write report to {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

fn iso_utc<S: Serializer>(timestamp: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&timestamp.to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// The DORA document, one record per repository plus the fleet-wide record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoraReport {
    pub window_days: u32,
    #[serde(serialize_with = "iso_utc")]
    pub generated_at: DateTime<Utc>,
    pub repos: BTreeMap<String, DeploymentMetrics>,
    pub overall: DoraOverall,
    /// Repositories whose primary listing failed, with the reason.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: BTreeMap<String, String>,
}

impl DoraReport {
    pub fn new(
        window: &Window,
        repos: BTreeMap<String, DeploymentMetrics>,
        errors: BTreeMap<String, String>,
    ) -> Self {
        let overall = aggregate_dora(&repos);
        Self {
            window_days: window.days,
            generated_at: window.now,
            repos,
            overall,
            errors,
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{} repos, {} deployments, {} failed",
            self.repos.len(),
            self.overall.deployments,
            self.errors.len()
        )
    }
}

/// The testing document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestingReport {
    pub window_days: u32,
    #[serde(serialize_with = "iso_utc")]
    pub timestamp: DateTime<Utc>,
    pub repos: BTreeMap<String, TestingMetrics>,
    pub overall: TestingOverall,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: BTreeMap<String, String>,
}

impl TestingReport {
    pub fn new(
        window: &Window,
        repos: BTreeMap<String, TestingMetrics>,
        errors: BTreeMap<String, String>,
    ) -> Self {
        let overall = aggregate_testing(&repos);
        Self {
            window_days: window.days,
            timestamp: window.now,
            repos,
            overall,
            errors,
        }
    }

    pub fn summary(&self) -> String {
        let automation = self
            .overall
            .automation_rate
            .map_or_else(|| "n/a".to_string(), |rate| format!("{:.1}%", rate * 100.0));
        format!(
            "{} repos, automation {}, {} failed",
            self.repos.len(),
            automation,
            self.errors.len()
        )
    }
}

pub fn to_pretty_json<T: Serialize>(report: &T) -> Result<String, ReportError> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Pretty-print `report` to `path`, creating parent directories.
pub async fn write_json<T: Serialize>(report: &T, path: &Path) -> Result<(), ReportError> {
    let io_error = |source: std::io::Error| ReportError::Io {
        path: path.display().to_string(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.map_err(io_error)?;
    }

    let mut body = to_pretty_json(report)?;
    body.push('\n');
    fs::write(path, body).await.map_err(io_error)?;

    tracing::info!(path = %path.display(), "Wrote metrics report");
    Ok(())
}
