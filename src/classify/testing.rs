use regex::RegexSet;

use super::{TestEvidence, TestHeuristic};

/// Test-runner invocations recognised in workflow definitions.
///
/// Each pattern is anchored on word boundaries so that e.g. `latest` or
/// `contest` never match.
pub const STANDARD_TEST_PATTERNS: &[&str] = &[
    r"\bcargo\s+(test|nextest|tarpaulin|llvm-cov)\b",
    r"\b(npm|pnpm|yarn|bun)\s+(run\s+)?test(:[\w-]+)?\b",
    r"\bnpx\s+(jest|vitest|mocha|playwright\s+test|cypress\s+run)\b",
    r"\b(jest|vitest|mocha|karma)\b",
    r"\bplaywright\s+test\b",
    r"\bcypress\s+run\b",
    r"\bpytest\b",
    r"\bpython[23]?\s+-m\s+(pytest|unittest)\b",
    r"\b(tox|nox)\b",
    r"\bcoverage\s+run\b",
    r"\bgo\s+test\b",
    r"\bdotnet\s+test\b",
    r"\b(mvn|mvnw)\b[^\n]*\b(test|verify)\b",
    r"\bgradlew?\b[^\n]*\b(test|check)\b",
    r"\b(rspec|phpunit|pest)\b",
    r"\bbundle\s+exec\s+rake\s+test\b",
    r"\bmix\s+test\b",
    r"\bswift\s+test\b",
    r"\bctest\b",
];

/// Compiled, case-insensitive catalogue of test-runner patterns.
#[derive(Debug, Clone)]
pub struct TestPatternCatalogue {
    patterns: RegexSet,
}

impl TestPatternCatalogue {
    pub fn new<I, S>(patterns: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|pattern| format!("(?i){}", pattern.as_ref()));
        Ok(Self {
            patterns: RegexSet::new(patterns)?,
        })
    }

    pub fn standard() -> Self {
        Self::new(STANDARD_TEST_PATTERNS).unwrap_or_else(|e| {
            tracing::error!(error = %e, "Built-in test patterns failed to compile");
            Self {
                patterns: RegexSet::empty(),
            }
        })
    }

    pub fn matches(&self, content: &str) -> bool {
        self.patterns.is_match(content)
    }
}

/// Ground truth from the workflow file itself. No opinion without content.
#[derive(Debug, Clone)]
pub struct ContentInspection {
    catalogue: TestPatternCatalogue,
}

impl ContentInspection {
    pub fn new(catalogue: TestPatternCatalogue) -> Self {
        Self { catalogue }
    }
}

impl TestHeuristic for ContentInspection {
    fn name(&self) -> &'static str {
        "content-inspection"
    }

    fn classify(&self, evidence: &TestEvidence<'_>) -> Option<bool> {
        evidence.content.map(|content| self.catalogue.matches(content))
    }
}

/// Name/path keyword fallback for workflows whose file could not be read.
#[derive(Debug, Clone)]
pub struct TestKeywordHeuristic {
    keywords: Vec<String>,
}

impl Default for TestKeywordHeuristic {
    fn default() -> Self {
        Self {
            keywords: [
                "test",
                "jest",
                "vitest",
                "playwright",
                "cypress",
                "e2e",
                "coverage",
                "unit-test",
                "integration-test",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl TestHeuristic for TestKeywordHeuristic {
    fn name(&self) -> &'static str {
        "test-keywords"
    }

    fn classify(&self, evidence: &TestEvidence<'_>) -> Option<bool> {
        let text = evidence.signals.haystack();
        let has_test_keyword = self.keywords.iter().any(|kw| text.contains(kw.as_str()));
        // Deploy pipelines only count when they say "test" outright.
        let deploy_only = text.contains("deploy") && !text.contains("test");

        Some(has_test_keyword && !deploy_only)
    }
}
