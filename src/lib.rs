// Delivery Metrics Library - DORA and testing health from GitHub Actions
// This exposes the core components for testing and integration

pub mod classify;
pub mod cli;
pub mod config;
pub mod engine;
pub mod github;
pub mod metrics;
pub mod observability;
pub mod telemetry;

// Re-export key types for easy access
pub use classify::{HintTable, RunClassifier, RunSignals, TestEvidence};
pub use config::{read_repos_file, GitHubConfig, MetricsConfig, ObservabilityConfig};
pub use engine::{MetricsEngine, RepoSnapshot};
pub use github::{CiSource, GitHubClient, GitHubError, RepoId};
pub use metrics::{
    DeploymentCalculator, DeploymentMetrics, DoraReport, TestingCalculator, TestingMetrics,
    TestingReport, Window,
};
pub use observability::{create_repository_span, ApiMetrics, ApiStats, OperationTimer};
pub use telemetry::{generate_correlation_id, init_telemetry};
