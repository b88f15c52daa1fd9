use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{read_repos_file, MetricsConfig};

pub mod commands;

#[derive(Parser, Debug)]
#[command(name = "delivery-metrics")]
#[command(about = "DORA and test-automation metrics from GitHub Actions and issue history")]
#[command(long_about = "Computes deployment frequency, lead time, change-failure rate and \
                       time to restore, plus test automation and defect leakage, for a set of \
                       GitHub repositories over a trailing window. Results are written as JSON \
                       documents.")]
pub struct Cli {
    /// Configuration file (defaults to delivery-metrics.toml when present)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Length of the trailing window in days
    #[arg(long, global = true, value_name = "DAYS")]
    pub window_days: Option<u32>,

    /// Comma-separated owner/repo list, replacing the configured repositories
    #[arg(long, global = true, value_delimiter = ',', value_name = "OWNER/REPO")]
    pub repos: Option<Vec<String>>,

    /// File with one owner/repo per line; '#' starts a comment
    #[arg(long, global = true, value_name = "PATH", conflicts_with = "repos")]
    pub repos_file: Option<PathBuf>,

    /// Directory receiving dora.json and testing.json
    #[arg(long, global = true, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Print documents to stdout instead of writing files
    #[arg(long, global = true)]
    pub stdout: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Deployment frequency, lead time, change-failure rate and time to restore
    Dora,
    /// Test automation rate and defect leakage
    Testing,
    /// Both documents from one pass over the repositories
    All,
}

impl Cli {
    /// Layer command-line flags over the loaded configuration.
    pub fn apply_overrides(&self, config: &mut MetricsConfig) -> Result<()> {
        if let Some(days) = self.window_days {
            config.window_days = days;
        }
        if let Some(repos) = &self.repos {
            config.repos = repos.clone();
        }
        if let Some(path) = &self.repos_file {
            config.repos = read_repos_file(path)?;
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        config.validate()
    }

    pub fn resolve_config(&self) -> Result<MetricsConfig> {
        let mut config = MetricsConfig::load(self.config.as_deref())?;
        self.apply_overrides(&mut config)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parses_subcommand_and_global_flags() {
        let cli = Cli::try_parse_from([
            "delivery-metrics",
            "all",
            "--window-days",
            "7",
            "--repos",
            "acme/api,acme/web",
            "--stdout",
        ])
        .unwrap();

        assert_eq!(cli.command, Commands::All);
        assert!(cli.stdout);

        let mut config = MetricsConfig::default();
        cli.apply_overrides(&mut config).unwrap();
        assert_eq!(config.window_days, 7);
        assert_eq!(config.repos, vec!["acme/api", "acme/web"]);
    }

    #[test]
    fn test_repos_file_override() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "# fleet\nacme/api\n").unwrap();

        let cli = Cli::try_parse_from([
            "delivery-metrics",
            "--repos-file",
            file.path().to_str().unwrap(),
            "dora",
        ])
        .unwrap();

        let mut config = MetricsConfig::default();
        cli.apply_overrides(&mut config).unwrap();
        assert_eq!(config.repos, vec!["acme/api"]);
    }

    #[test]
    fn test_zero_window_is_rejected() {
        let cli = Cli::try_parse_from(["delivery-metrics", "dora", "--window-days", "0"]).unwrap();
        let mut config = MetricsConfig::default();
        assert!(cli.apply_overrides(&mut config).is_err());
    }

    #[test]
    fn test_subcommand_is_required() {
        assert!(Cli::try_parse_from(["delivery-metrics"]).is_err());
        let both = ["delivery-metrics", "dora", "--repos", "a/b", "--repos-file", "x"];
        assert!(Cli::try_parse_from(both).is_err());
    }
}
