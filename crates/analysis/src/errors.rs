/// Reasons a single pull request yields no records.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    #[error("malformed update table: {0}")]
    MalformedUpdateTable(String),
    #[error("unparseable version {version:?}: {reason}")]
    UnparseableVersion { version: String, reason: String },
}

impl ExtractError {
    pub(crate) fn table(message: impl Into<String>) -> Self {
        Self::MalformedUpdateTable(message.into())
    }

    pub(crate) fn version(version: &str, reason: impl Into<String>) -> Self {
        Self::UnparseableVersion {
            version: version.to_string(),
            reason: reason.into(),
        }
    }
}
