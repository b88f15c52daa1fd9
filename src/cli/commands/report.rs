use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use super::Command;
use crate::classify::{HintTable, RunClassifier};
use crate::cli::Commands;
use crate::config::MetricsConfig;
use crate::engine::MetricsEngine;
use crate::github::GitHubClient;
use crate::metrics::reports::to_pretty_json;
use crate::metrics::{write_json, Window};

pub const DORA_FILE: &str = "dora.json";
pub const TESTING_FILE: &str = "testing.json";

#[derive(Serialize)]
struct CombinedReports<'a, D, T> {
    dora: &'a D,
    testing: &'a T,
}

/// Compute one or both documents and write them out.
pub struct ReportCommand {
    pub family: Commands,
    pub stdout: bool,
    pub config: MetricsConfig,
}

impl ReportCommand {
    pub fn new(family: Commands, stdout: bool, config: MetricsConfig) -> Self {
        Self {
            family,
            stdout,
            config,
        }
    }

    async fn emit<T: Serialize>(&self, report: &T, file_name: &str) -> Result<()> {
        if self.stdout {
            println!("{}", to_pretty_json(report)?);
            return Ok(());
        }
        let path = self.config.output_dir.join(file_name);
        write_json(report, &path)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))
    }
}

impl Command for ReportCommand {
    async fn execute(&self) -> Result<()> {
        let repos = self.config.repo_ids()?;
        let client =
            GitHubClient::new(&self.config.github).context("Failed to create GitHub client")?;
        let api_metrics = client.metrics();

        let hints = HintTable::new(self.config.production_hints.clone());
        let classifier = RunClassifier::standard(hints);
        let window = Window::ending_now(self.config.window_days);
        let engine = MetricsEngine::new(client, classifier, window)
            .with_metrics(Arc::clone(&api_metrics));

        info!(
            repos = repos.len(),
            window_days = window.days,
            authenticated = self.config.github.token.is_some(),
            "Computing delivery metrics"
        );

        let failed = match self.family {
            Commands::Dora => {
                let report = engine.dora_report(&repos).await;
                self.emit(&report, DORA_FILE).await?;
                report.errors.len()
            }
            Commands::Testing => {
                let report = engine.testing_report(&repos).await;
                self.emit(&report, TESTING_FILE).await?;
                report.errors.len()
            }
            Commands::All => {
                let (dora, testing) = engine.all_reports(&repos).await;
                if self.stdout {
                    let combined = CombinedReports {
                        dora: &dora,
                        testing: &testing,
                    };
                    println!("{}", to_pretty_json(&combined)?);
                } else {
                    self.emit(&dora, DORA_FILE).await?;
                    self.emit(&testing, TESTING_FILE).await?;
                }
                dora.errors.len()
            }
        };

        api_metrics.log_stats();

        if !self.stdout {
            info!(output_dir = %display_dir(&self.config.output_dir), "Metrics written");
        }
        if failed == repos.len() {
            bail!("Every repository failed, see the errors map in the output");
        }
        Ok(())
    }
}

fn display_dir(dir: &Path) -> String {
    if dir.as_os_str().is_empty() {
        ".".to_string()
    } else {
        dir.display().to_string()
    }
}
