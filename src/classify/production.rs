use std::collections::BTreeMap;

use super::{ProductionHeuristic, RunSignals};
use crate::github::RepoId;

/// Per-repository tokens that mark a run as a production deployment.
///
/// Keys are `owner/repo`; tokens are matched case-insensitively as
/// substrings of the run name, display title and workflow path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HintTable {
    entries: BTreeMap<String, Vec<String>>,
}

impl HintTable {
    pub fn new(entries: BTreeMap<String, Vec<String>>) -> Self {
        let entries = entries
            .into_iter()
            .map(|(repo, tokens)| {
                let tokens = tokens
                    .into_iter()
                    .map(|token| token.trim().to_lowercase())
                    .filter(|token| !token.is_empty())
                    .collect();
                (repo.to_lowercase(), tokens)
            })
            .collect();
        Self { entries }
    }

    pub fn tokens_for(&self, repo: &RepoId) -> &[String] {
        self.entries
            .get(&repo.full_name().to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Authoritative explicit hints. Has an opinion only when a token matches.
#[derive(Debug, Clone)]
pub struct HintTableHeuristic {
    table: HintTable,
}

impl HintTableHeuristic {
    pub fn new(table: HintTable) -> Self {
        Self { table }
    }
}

impl ProductionHeuristic for HintTableHeuristic {
    fn name(&self) -> &'static str {
        "hint-table"
    }

    fn classify(&self, repo: &RepoId, signals: &RunSignals<'_>) -> Option<bool> {
        let fields = signals.fields().map(str::to_lowercase);
        let hit = self
            .table
            .tokens_for(repo)
            .iter()
            .any(|token| fields.iter().any(|field| field.contains(token.as_str())));
        hit.then_some(true)
    }
}

/// Keyword fallback: production keywords alone, or deployment keywords
/// together with a standalone `main`/`master` token.
#[derive(Debug, Clone)]
pub struct ProductionKeywordHeuristic {
    production: Vec<String>,
    deployment: Vec<String>,
    branches: Vec<String>,
}

impl Default for ProductionKeywordHeuristic {
    fn default() -> Self {
        Self {
            production: vec!["prod".into(), "production".into()],
            deployment: vec!["deploy".into(), "release".into(), "deployment".into()],
            branches: vec!["main".into(), "master".into()],
        }
    }
}

impl ProductionHeuristic for ProductionKeywordHeuristic {
    fn name(&self) -> &'static str {
        "production-keywords"
    }

    fn classify(&self, _repo: &RepoId, signals: &RunSignals<'_>) -> Option<bool> {
        let text = signals.haystack();
        let has_prod = self.production.iter().any(|kw| text.contains(kw.as_str()));
        let has_deploy = self.deployment.iter().any(|kw| text.contains(kw.as_str()));
        // Whole tokens only: "domain" must not count as "main".
        let has_main_branch = text
            .split_whitespace()
            .any(|word| self.branches.iter().any(|branch| branch == word));

        Some(has_prod || (has_deploy && has_main_branch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> RepoId {
        RepoId::new("Acme", "Web")
    }

    fn keywords(name: &str, title: &str, path: &str) -> bool {
        ProductionKeywordHeuristic::default()
            .classify(&repo(), &RunSignals::new(name, title, path))
            .unwrap()
    }

    #[test]
    fn test_prod_keyword_alone_is_enough() {
        assert!(keywords("Deploy to production", "", ""));
        assert!(keywords("nightly", "", ".github/workflows/prod-sync.yml"));
    }

    #[test]
    fn test_deploy_requires_main_branch_token() {
        assert!(!keywords("deploy-staging", "", ".github/workflows/staging.yml"));
        assert!(keywords("deploy", "merge to main", ""));
        assert!(keywords("Release", "", "master"));
    }

    #[test]
    fn test_main_substring_is_not_a_branch() {
        assert!(!keywords("deploy domain records", "", ""));
        assert!(!keywords("release", "mainline cleanup", ""));
    }

    #[test]
    fn test_hint_table_matches_case_insensitively() {
        let mut entries = BTreeMap::new();
        entries.insert(
            "acme/web".to_string(),
            vec!["Production-Deploy.yml".to_string(), "  ".to_string()],
        );
        let heuristic = HintTableHeuristic::new(HintTable::new(entries));

        let hit = RunSignals::new("CD", "", ".github/workflows/production-deploy.yml");
        assert_eq!(heuristic.classify(&repo(), &hit), Some(true));

        let miss = RunSignals::new("CI", "", ".github/workflows/ci.yml");
        assert_eq!(heuristic.classify(&repo(), &miss), None);
    }

    #[test]
    fn test_hint_table_ignores_other_repositories() {
        let mut entries = BTreeMap::new();
        entries.insert("acme/api".to_string(), vec!["ship".to_string()]);
        let heuristic = HintTableHeuristic::new(HintTable::new(entries));

        let signals = RunSignals::new("ship it", "", "");
        assert_eq!(heuristic.classify(&repo(), &signals), None);
        assert_eq!(
            heuristic.classify(&RepoId::new("acme", "api"), &signals),
            Some(true)
        );
    }
}
