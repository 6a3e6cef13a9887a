use common::config::RenovateConfig;
use normalizer::PullRequest;
use regex::Regex;

lazy_regex!(SEMANTIC_COMMIT_TITLE_RE = r"^(chore|fix)\(deps\): (bump|update) ");

const AUTOCLOSED_SUFFIX: &str = " - autoclosed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrKind {
    Onboarding,
    DependencyUpdate,
    Irrelevant,
}

/// True for the title shapes Renovate uses for dependency update PRs.
///
/// `Update <group>` subsumes `Update dependency <name> to v<version>` and the
/// `(major)` variants, so a prefix check covers the whole Update family.
pub fn has_relevant_title(title: &str) -> bool {
    let title = title.strip_suffix(AUTOCLOSED_SUFFIX).unwrap_or(title);
    title.starts_with("Update ") || SEMANTIC_COMMIT_TITLE_RE.is_match(title)
}

#[derive(Debug, Clone)]
pub struct PrClassifier {
    onboarding_title: Regex,
    required_author: Option<String>,
    required_label: Option<String>,
    ignored_labels: Vec<String>,
}

impl PrClassifier {
    pub fn new(
        onboarding_title_pattern: &str,
        required_author: Option<String>,
        required_label: Option<String>,
        ignored_labels: Vec<String>,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            onboarding_title: Regex::new(onboarding_title_pattern)?,
            required_author,
            required_label,
            ignored_labels,
        })
    }

    pub fn from_config(config: &RenovateConfig) -> Result<Self, regex::Error> {
        Self::new(
            &config.onboarding_title_regex,
            config.bot_user().map(str::to_string),
            config.pr_label().map(str::to_string),
            config.ignore_labels.clone(),
        )
    }

    pub fn classify(&self, pr: &PullRequest) -> PrKind {
        if pr.labels.iter().any(|label| self.ignored_labels.contains(label)) {
            return PrKind::Irrelevant;
        }
        if let Some(required) = &self.required_author {
            let matches = pr
                .author
                .as_deref()
                .is_some_and(|author| same_account(author, required));
            if !matches {
                return PrKind::Irrelevant;
            }
        }

        if self.onboarding_title.is_match(&pr.title) {
            return PrKind::Onboarding;
        }

        let label_ok = self
            .required_label
            .as_deref()
            .map_or(true, |label| pr.has_label(label));
        if label_ok && has_relevant_title(&pr.title) {
            PrKind::DependencyUpdate
        } else {
            PrKind::Irrelevant
        }
    }
}

/// Logins compare case-insensitively; the search qualifier form `app/<name>`
/// names the same account as the `<name>[bot]` login the API reports.
fn same_account(login: &str, configured: &str) -> bool {
    let canonical = |name: &str| match name.strip_prefix("app/") {
        Some(app) => format!("{app}[bot]"),
        None => name.to_string(),
    };
    canonical(login).eq_ignore_ascii_case(&canonical(configured))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use normalizer::RepositoryRef;

    fn pr(title: &str, labels: &[&str], author: &str) -> PullRequest {
        PullRequest {
            repo: RepositoryRef::new("acme", "web"),
            number: 1,
            url: "https://github.com/acme/web/pull/1".into(),
            title: title.into(),
            body: String::new(),
            labels: labels.iter().map(|l| l.to_string()).collect(),
            author: Some(author.into()),
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            closed_at: None,
            merged_at: None,
        }
    }

    fn classifier() -> PrClassifier {
        PrClassifier::new(
            "^Configure Renovate",
            Some("renovate[bot]".into()),
            Some("dependencies".into()),
            vec!["wontfix".into()],
        )
        .unwrap()
    }

    #[test]
    fn relevant_titles() {
        for title in [
            "Update dependency lodash to v4.17.21",
            "Update dependency lodash to v4.17.21 - autoclosed",
            "Update all non-major dependencies",
            "Update react monorepo (major)",
            "Update babel monorepo to v7.24.0 (major) - autoclosed",
            "chore(deps): bump lodash from 4.17.20 to 4.17.21",
            "chore(deps): update dependency eslint to v9",
            "fix(deps): update module github.com/pkg/errors to v0.9.1",
        ] {
            assert!(has_relevant_title(title), "{title}");
        }
        for title in ["Updated docs", "chore: update lockfile", "feat(deps): update x", "Pin dependencies"] {
            assert!(!has_relevant_title(title), "{title}");
        }
    }

    #[test]
    fn onboarding_takes_precedence_over_label_check() {
        let classifier = classifier();
        assert_eq!(
            classifier.classify(&pr("Configure Renovate", &[], "renovate[bot]")),
            PrKind::Onboarding
        );
    }

    #[test]
    fn dependency_update_requires_label_when_configured() {
        let classifier = classifier();
        let labelled = pr("Update dependency lodash to v4.17.21", &["dependencies"], "renovate[bot]");
        let unlabelled = pr("Update dependency lodash to v4.17.21", &[], "renovate[bot]");
        assert_eq!(classifier.classify(&labelled), PrKind::DependencyUpdate);
        assert_eq!(classifier.classify(&unlabelled), PrKind::Irrelevant);
    }

    #[test]
    fn author_filter_and_ignored_labels() {
        let classifier = classifier();
        assert_eq!(
            classifier.classify(&pr("Update dependency a to v2", &["dependencies"], "someone")),
            PrKind::Irrelevant
        );
        assert_eq!(
            classifier.classify(&pr("Configure Renovate", &["wontfix"], "renovate[bot]")),
            PrKind::Irrelevant
        );
        assert_eq!(
            classifier.classify(&pr("Update dependency a to v2", &["dependencies"], "Renovate[bot]")),
            PrKind::DependencyUpdate
        );
    }

    #[test]
    fn app_qualifier_matches_bot_login() {
        assert!(same_account("renovate[bot]", "app/renovate"));
        assert!(!same_account("renovate", "app/renovate"));
    }

    #[test]
    fn without_filters_only_title_decides() {
        let classifier = PrClassifier::new("^Configure Renovate", None, None, vec![]).unwrap();
        let mut anonymous = pr("Update dependency a to v2", &[], "x");
        anonymous.author = None;
        assert_eq!(classifier.classify(&anonymous), PrKind::DependencyUpdate);
    }
}
