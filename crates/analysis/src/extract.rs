use common::config::RenovateConfig;
use normalizer::PullRequest;

use crate::errors::ExtractError;
use crate::records::{DependencyUpdate, PullRequestRecord};
use crate::table::parse_update_table;
use crate::version::VersionClassifier;

/// Turns a dependency update PR into its output record.
#[derive(Debug, Clone)]
pub struct RecordExtractor {
    versions: VersionClassifier,
    security_label: String,
}

impl RecordExtractor {
    pub fn new(versions: VersionClassifier, security_label: impl Into<String>) -> Self {
        Self {
            versions,
            security_label: security_label.into(),
        }
    }

    pub fn from_config(config: &RenovateConfig) -> Self {
        Self::new(
            VersionClassifier::new(config.detect_multiple_major),
            config.security_label.clone(),
        )
    }

    /// All rows or nothing: the first failing row fails the pull request.
    pub fn extract(&self, pr: &PullRequest) -> Result<PullRequestRecord, ExtractError> {
        let security = pr.has_label(&self.security_label);
        let updates = parse_update_table(&pr.body)?
            .into_iter()
            .map(|row| {
                let update_type =
                    self.versions
                        .classify(&row.old_version, &row.new_version, security)?;
                Ok(DependencyUpdate {
                    dependency_name: row.dependency_name,
                    old_version: row.old_version,
                    new_version: row.new_version,
                    update_type,
                })
            })
            .collect::<Result<Vec<_>, ExtractError>>()?;
        Ok(PullRequestRecord::new(pr, updates))
    }
}
