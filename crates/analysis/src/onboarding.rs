//! Point-in-time onboarding status, reconstructed from commit history.

use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Utc};
use common::config::{OnboardingConfig, MAX_SAMPLING_WEEKS};
use normalizer::PullRequest;
use tracing::debug;

use crate::records::{OnboardingStatus, RepositoryOnboardingStatus};
use crate::source::SourceError;
use crate::timeline::CommitTimeline;

const SAMPLE_HOUR: u32 = 8;

/// Weekly sampling grid anchored on Monday 08:00 UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingSchedule {
    max_weeks: u32,
    interval_weeks: u32,
}

impl SamplingSchedule {
    /// Returns `None` for a zero interval or when either value exceeds
    /// [`MAX_SAMPLING_WEEKS`].
    pub fn new(max_weeks: u32, interval_weeks: u32) -> Option<Self> {
        let in_range = interval_weeks > 0
            && interval_weeks <= MAX_SAMPLING_WEEKS
            && max_weeks <= MAX_SAMPLING_WEEKS;
        in_range.then_some(Self {
            max_weeks,
            interval_weeks,
        })
    }

    pub fn from_config(config: &OnboardingConfig) -> Option<Self> {
        Self::new(config.max_weeks, config.interval_weeks)
    }

    pub fn interval(&self) -> Duration {
        Duration::weeks(i64::from(self.interval_weeks))
    }

    /// The most recent Monday 08:00 UTC that is not after `now`.
    pub fn anchor(now: DateTime<Utc>) -> DateTime<Utc> {
        let days_since_monday = i64::from(now.weekday().num_days_from_monday());
        let monday = now.date_naive() - Duration::days(days_since_monday);
        let time = NaiveTime::from_hms_opt(SAMPLE_HOUR, 0, 0).unwrap_or_default();
        let anchor = Utc.from_utc_datetime(&monday.and_time(time));
        if anchor > now {
            anchor - Duration::weeks(1)
        } else {
            anchor
        }
    }

    /// Sample dates, oldest first, ending at the anchor.
    ///
    /// Points that would fall outside the representable date range are left out.
    pub fn sample_dates(&self, now: DateTime<Utc>) -> Vec<DateTime<Utc>> {
        let anchor = Self::anchor(now);
        let steps = i64::from(self.max_weeks / self.interval_weeks);
        let interval = i64::from(self.interval_weeks);
        let mut samples: Vec<_> = (0..=steps)
            .map_while(|step| {
                step.checked_mul(interval)
                    .and_then(Duration::try_weeks)
                    .and_then(|offset| anchor.checked_sub_signed(offset))
            })
            .collect();
        samples.reverse();
        samples
    }

    /// Commits older than this are never needed: one week before the first sample.
    pub fn commit_cutoff(samples: &[DateTime<Utc>]) -> Option<DateTime<Utc>> {
        samples
            .iter()
            .min()
            .and_then(|first| first.checked_sub_signed(Duration::weeks(1)))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OnboardingReconstructor {
    interval: Duration,
}

impl OnboardingReconstructor {
    pub fn new(schedule: &SamplingSchedule) -> Self {
        Self {
            interval: schedule.interval(),
        }
    }

    /// One status per sample date, in the order of `samples`.
    ///
    /// A config file in the tree means onboarded. Without one, an onboarding PR
    /// that was open at the sample and stayed open for at least another full
    /// interval means onboarding is in progress.
    pub async fn reconstruct(
        &self,
        timeline: &mut CommitTimeline,
        onboarding_prs: &[PullRequest],
        samples: &[DateTime<Utc>],
    ) -> Result<Vec<RepositoryOnboardingStatus>, SourceError> {
        let repo = timeline.repo().full_name();
        let mut statuses = Vec::with_capacity(samples.len());
        for &sample_date in samples {
            let status = if timeline.has_config_file(sample_date).await? {
                OnboardingStatus::Onboarded
            } else if self.has_open_onboarding_pr(onboarding_prs, sample_date) {
                OnboardingStatus::InProgress
            } else {
                OnboardingStatus::Disabled
            };
            debug!(repo = %repo, sample = %sample_date, status = %status, "sampled onboarding status");
            statuses.push(RepositoryOnboardingStatus {
                repo: repo.clone(),
                sample_date,
                status,
            });
        }
        Ok(statuses)
    }

    fn has_open_onboarding_pr(&self, prs: &[PullRequest], sample_date: DateTime<Utc>) -> bool {
        prs.iter().any(|pr| {
            pr.created_at <= sample_date
                && pr
                    .closed_or_merged_at()
                    .map_or(true, |closed| closed > sample_date + self.interval)
        })
    }
}
