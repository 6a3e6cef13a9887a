use std::path::Path;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::errors::{AppError, Result};

/// Upper bound for `onboarding.max_weeks` and `onboarding.interval_weeks` (about a century).
pub const MAX_SAMPLING_WEEKS: u32 = 5_200;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub github: GithubConfig,
    pub renovate: RenovateConfig,
    #[serde(default)]
    pub onboarding: OnboardingConfig,
    #[serde(default)]
    pub collector: CollectorConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path(".")
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Config::builder()
            .add_source(
                File::with_name(
                    path.as_ref()
                        .join("config/default")
                        .to_string_lossy()
                        .as_ref(),
                )
                .required(false),
            )
            .add_source(
                File::with_name(
                    path.as_ref()
                        .join("config/local")
                        .to_string_lossy()
                        .as_ref(),
                )
                .required(false),
            )
            .add_source(
                Environment::default()
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("github.repos")
                    .with_list_parse_key("renovate.ignore_labels")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Checks the cross-field constraints serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.github.token.trim().is_empty() {
            return Err(AppError::invalid(
                "github.token must be set to a valid personal access token",
            ));
        }
        if self.github.repos.iter().all(|entry| entry.trim().is_empty()) {
            return Err(AppError::invalid(
                "github.repos must list at least one '<owner>/<repo>', '<owner>' or 'user:<login>' entry",
            ));
        }
        self.renovate.validate()?;
        self.onboarding.validate()?;
        if self.collector.max_concurrent_repos == 0 {
            return Err(AppError::invalid(
                "collector.max_concurrent_repos must be at least 1",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default)]
    pub test_admin_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GithubConfig {
    pub token: String,
    #[serde(default = "GithubConfig::default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "GithubConfig::default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub repos: Vec<String>,
}

impl GithubConfig {
    fn default_api_base_url() -> String {
        "https://api.github.com/".to_string()
    }

    fn default_user_agent() -> String {
        "renovate-insights".to_string()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenovateConfig {
    #[serde(default)]
    pub pr_label: Option<String>,
    pub security_label: String,
    #[serde(default)]
    pub bot_user: Option<String>,
    #[serde(default)]
    pub ignore_labels: Vec<String>,
    #[serde(default)]
    pub detect_multiple_major: bool,
    #[serde(default = "RenovateConfig::default_onboarding_title_regex")]
    pub onboarding_title_regex: String,
}

impl RenovateConfig {
    pub fn default_onboarding_title_regex() -> String {
        "^Configure Renovate".to_string()
    }

    /// Label filter with blank values treated as unset.
    pub fn pr_label(&self) -> Option<&str> {
        non_blank(self.pr_label.as_deref())
    }

    /// Bot account filter with blank values treated as unset.
    pub fn bot_user(&self) -> Option<&str> {
        non_blank(self.bot_user.as_deref())
    }

    fn validate(&self) -> Result<()> {
        if self.pr_label().is_none() && self.bot_user().is_none() {
            return Err(AppError::invalid(
                "at least one of renovate.pr_label or renovate.bot_user must be set",
            ));
        }
        if self.security_label.trim().is_empty() {
            return Err(AppError::invalid(
                "renovate.security_label must name the label Renovate puts on security PRs (e.g. 'security')",
            ));
        }
        if self.onboarding_title_regex.trim().is_empty() {
            return Err(AppError::invalid(
                "renovate.onboarding_title_regex must not be empty",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OnboardingConfig {
    #[serde(default = "OnboardingConfig::default_max_weeks")]
    pub max_weeks: u32,
    #[serde(default = "OnboardingConfig::default_interval_weeks")]
    pub interval_weeks: u32,
}

impl Default for OnboardingConfig {
    fn default() -> Self {
        Self {
            max_weeks: Self::default_max_weeks(),
            interval_weeks: Self::default_interval_weeks(),
        }
    }
}

impl OnboardingConfig {
    const fn default_max_weeks() -> u32 {
        52
    }

    const fn default_interval_weeks() -> u32 {
        1
    }

    fn validate(&self) -> Result<()> {
        if self.max_weeks == 0 || self.interval_weeks == 0 {
            return Err(AppError::invalid(
                "onboarding.max_weeks and onboarding.interval_weeks must be positive numbers",
            ));
        }
        if self.max_weeks > MAX_SAMPLING_WEEKS || self.interval_weeks > MAX_SAMPLING_WEEKS {
            return Err(AppError::invalid(format!(
                "onboarding.max_weeks and onboarding.interval_weeks must not exceed {MAX_SAMPLING_WEEKS}"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectorConfig {
    #[serde(default = "CollectorConfig::default_page_size")]
    pub page_size: u32,
    #[serde(default = "CollectorConfig::default_max_concurrent_repos")]
    pub max_concurrent_repos: usize,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            page_size: Self::default_page_size(),
            max_concurrent_repos: Self::default_max_concurrent_repos(),
        }
    }
}

impl CollectorConfig {
    const fn default_page_size() -> u32 {
        100
    }

    const fn default_max_concurrent_repos() -> usize {
        1
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "ObservabilityConfig::default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub metrics_file: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
            metrics_file: None,
        }
    }
}

impl ObservabilityConfig {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
