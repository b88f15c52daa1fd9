pub mod aggregate;
pub mod deployment;
pub mod reports;
pub mod stats;
pub mod testing;
pub mod types;

pub use aggregate::{aggregate_dora, aggregate_testing};
pub use deployment::DeploymentCalculator;
pub use reports::{write_json, DoraReport, ReportError, TestingReport};
pub use testing::{IssueActivity, LeakageCounts, TestingCalculator};
pub use types::{
    DeploymentMetrics, DeploymentOutcome, DoraOverall, LeadTimeDiagnostics, TestingMetrics,
    TestingOverall, Window, TESTING_SOURCE,
};
