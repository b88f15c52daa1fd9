//! Run classification.
//!
//! Two questions are asked of every workflow run: did it deploy to
//! production, and did it execute a test suite. Each question is answered by
//! an ordered list of heuristics; the first heuristic with an opinion wins.

pub mod production;
pub mod testing;

use std::fmt;

use crate::github::{RepoId, Workflow, WorkflowRun};

pub use production::{HintTable, HintTableHeuristic, ProductionKeywordHeuristic};
pub use testing::{ContentInspection, TestKeywordHeuristic, TestPatternCatalogue};

/// The textual fields heuristics look at.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunSignals<'a> {
    pub name: &'a str,
    pub display_title: &'a str,
    pub path: &'a str,
}

impl<'a> RunSignals<'a> {
    pub fn new(name: &'a str, display_title: &'a str, path: &'a str) -> Self {
        Self {
            name,
            display_title,
            path,
        }
    }

    pub fn fields(&self) -> [&'a str; 3] {
        [self.name, self.display_title, self.path]
    }

    /// Lowercased fields joined by single spaces.
    pub fn haystack(&self) -> String {
        self.fields().join(" ").to_lowercase()
    }
}

impl<'a> From<&'a WorkflowRun> for RunSignals<'a> {
    fn from(run: &'a WorkflowRun) -> Self {
        RunSignals::new(
            run.name.as_deref().unwrap_or_default(),
            run.display_title.as_deref().unwrap_or_default(),
            run.path.as_deref().unwrap_or_default(),
        )
    }
}

impl<'a> From<&'a Workflow> for RunSignals<'a> {
    fn from(workflow: &'a Workflow) -> Self {
        RunSignals::new(&workflow.name, "", &workflow.path)
    }
}

/// Input to the test-execution question.
#[derive(Debug, Clone, Copy)]
pub struct TestEvidence<'a> {
    pub signals: RunSignals<'a>,
    /// Workflow definition text, when it could be fetched and decoded.
    pub content: Option<&'a str>,
}

pub trait ProductionHeuristic: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    /// `Some(verdict)` settles the question, `None` defers to the next heuristic.
    fn classify(&self, repo: &RepoId, signals: &RunSignals<'_>) -> Option<bool>;
}

pub trait TestHeuristic: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    fn classify(&self, evidence: &TestEvidence<'_>) -> Option<bool>;
}

/// Ordered heuristic chains for both questions.
#[derive(Debug)]
pub struct RunClassifier {
    production: Vec<Box<dyn ProductionHeuristic>>,
    testing: Vec<Box<dyn TestHeuristic>>,
}

impl RunClassifier {
    pub fn new(
        production: Vec<Box<dyn ProductionHeuristic>>,
        testing: Vec<Box<dyn TestHeuristic>>,
    ) -> Self {
        Self {
            production,
            testing,
        }
    }

    /// Hint table, then keyword fallback; content inspection, then keyword
    /// fallback.
    pub fn standard(hints: HintTable) -> Self {
        Self::new(
            vec![
                Box::new(HintTableHeuristic::new(hints)),
                Box::new(ProductionKeywordHeuristic::default()),
            ],
            vec![
                Box::new(ContentInspection::new(TestPatternCatalogue::standard())),
                Box::new(TestKeywordHeuristic::default()),
            ],
        )
    }

    pub fn is_production(&self, repo: &RepoId, signals: &RunSignals<'_>) -> bool {
        self.production
            .iter()
            .find_map(|heuristic| {
                heuristic.classify(repo, signals).inspect(|verdict| {
                    tracing::trace!(heuristic = heuristic.name(), verdict, "Production verdict");
                })
            })
            .unwrap_or(false)
    }

    pub fn is_production_run(&self, repo: &RepoId, run: &WorkflowRun) -> bool {
        self.is_production(repo, &RunSignals::from(run))
    }

    pub fn is_test_workflow(&self, evidence: &TestEvidence<'_>) -> bool {
        self.testing
            .iter()
            .find_map(|heuristic| {
                heuristic.classify(evidence).inspect(|verdict| {
                    tracing::trace!(heuristic = heuristic.name(), verdict, "Test verdict");
                })
            })
            .unwrap_or(false)
    }
}
