use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::github::pagination::DEFAULT_PAGE_SIZE;
use crate::github::RepoId;

pub const DEFAULT_CONFIG_NAME: &str = "delivery-metrics";
pub const ENV_PREFIX: &str = "DELIVERY_METRICS";

/// Configuration for one metrics invocation.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub github: GitHubConfig,
    pub observability: ObservabilityConfig,
    /// Trailing window, in days, every metric is computed over
    pub window_days: u32,
    /// Repositories as `owner/repo`, processed in this order
    pub repos: Vec<String>,
    /// `owner/repo` to tokens that mark a run as a production deployment
    pub production_hints: BTreeMap<String, Vec<String>>,
    /// Directory receiving `dora.json` and `testing.json`
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// API token; read from GITHUB_TOKEN or GH_TOKEN when unset
    #[serde(skip_serializing)]
    pub token: Option<String>,
    pub api_base: String,
    pub page_size: u8,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub log_level: String,
    /// JSON lines instead of human-readable output
    pub json_logs: bool,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_base: "https://api.github.com".to_string(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        let hints = [
            (
                "Honey-Badger-Labs/sustainnet-observability",
                &["production-deploy.yml", "production-deploy"][..],
            ),
            (
                "Honey-Badger-Labs/sustainnet-website",
                &["production", "deploy", "prod", "production-deploy"][..],
            ),
            ("Honey-Badger-Labs/Family-Meal-Planner", &["prod", "production", "deploy"][..]),
            ("Honey-Badger-Labs/Family-Meal-Planner-App", &["prod", "production", "deploy"][..]),
            ("Honey-Badger-Labs/sustainnet-monorepo", &["prod", "production", "deploy"][..]),
        ];

        Self {
            github: GitHubConfig::default(),
            observability: ObservabilityConfig::default(),
            window_days: 30,
            // Only public repositories are reachable with a default Actions token.
            repos: vec!["Honey-Badger-Labs/sustainnet-observability".to_string()],
            production_hints: hints
                .into_iter()
                .map(|(repo, tokens)| {
                    (repo.to_string(), tokens.iter().map(|t| t.to_string()).collect())
                })
                .collect(),
            output_dir: PathBuf::from("docs/data"),
        }
    }
}

impl MetricsConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. `path`, or `delivery-metrics.toml` in the working directory if present
    /// 3. Environment variables (`DELIVERY_METRICS__WINDOW_DAYS`,
    ///    `DELIVERY_METRICS__GITHUB__PAGE_SIZE`, ...)
    /// 4. GITHUB_TOKEN / GH_TOKEN for the token
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        builder = match path {
            Some(path) => {
                if !path.exists() {
                    bail!("Configuration file {} does not exist", path.display());
                }
                builder.add_source(File::from(path))
            }
            None => builder.add_source(File::with_name(DEFAULT_CONFIG_NAME).required(false)),
        };

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("repos")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to read configuration")?;
        let mut metrics_config: MetricsConfig = config
            .try_deserialize()
            .context("Invalid configuration")?;

        if metrics_config.github.token.is_none() {
            metrics_config.github.token = ["GITHUB_TOKEN", "GH_TOKEN"]
                .iter()
                .find_map(|var| std::env::var(var).ok())
                .filter(|token| !token.trim().is_empty());
        }

        metrics_config.validate()?;
        Ok(metrics_config)
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.window_days == 0 {
            bail!("window_days must be at least 1");
        }
        if self.github.page_size == 0 || self.github.page_size > 100 {
            bail!(
                "github.page_size must be between 1 and 100, got {}",
                self.github.page_size
            );
        }
        Ok(())
    }

    /// Parsed repository list, in configured order with duplicates removed.
    pub fn repo_ids(&self) -> Result<Vec<RepoId>> {
        let mut repos: Vec<RepoId> = Vec::with_capacity(self.repos.len());
        for entry in &self.repos {
            let repo: RepoId = entry
                .trim()
                .parse()
                .with_context(|| format!("Invalid repository in configuration: '{entry}'"))?;
            if !repos.contains(&repo) {
                repos.push(repo);
            }
        }
        if repos.is_empty() {
            bail!("No repositories configured");
        }
        Ok(repos)
    }
}

/// Repositories listed one `owner/repo` per line; blank lines and `#`
/// comments are skipped.
pub fn read_repos_file(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read repos file {}", path.display()))?;
    Ok(parse_repo_lines(&content))
}

fn parse_repo_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect()
}
