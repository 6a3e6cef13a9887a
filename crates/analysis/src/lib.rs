macro_rules! lazy_regex {
    ($name:ident = $pattern:expr) => {
        static $name: once_cell::sync::Lazy<regex::Regex> =
            once_cell::sync::Lazy::new(|| regex::Regex::new($pattern).expect("invalid regex"));
    };
}

pub mod classifier;
pub mod errors;
pub mod extract;
pub mod markdown;
pub mod onboarding;
pub mod records;
pub mod source;
pub mod table;
pub mod timeline;
pub mod version;

pub use classifier::{has_relevant_title, PrClassifier, PrKind};
pub use errors::ExtractError;
pub use extract::RecordExtractor;
pub use onboarding::{OnboardingReconstructor, SamplingSchedule};
pub use records::{
    CloseType, DependencyUpdate, OnboardingStatus, PullRequestRecord, RepositoryOnboardingStatus,
    UpdateType,
};
pub use source::{PullRequestFilter, ScmSource, SharedSource, SourceError};
pub use table::{parse_update_table, UpdateRow};
pub use timeline::CommitTimeline;
pub use version::{clean_version, is_digest, VersionClassifier};
