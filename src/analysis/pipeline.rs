//! Squad report computation.
//!
//! Fetches each member's worklogs, classifies them with bounded concurrent
//! issue lookups, folds them into member reports and merges those into the
//! squad report. Members are processed concurrently; merging happens once
//! every member report is final.

use crate::analysis::{fold_user, merge_squad};
use crate::classify::{Classifier, Taxonomy};
use crate::client::{CachedLookup, IssueLookup, WorklogSource};
use crate::config::{FailurePolicy, GeneralConfig};
use crate::error::{ReportError, Result};
use crate::models::{Category, MemberFailure, Period, SquadReport, User, UserReport, WorklogEntry};
use futures::stream::{self, StreamExt, TryStreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, info, warn};

/// Options for a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Members processed at once, and issue lookups in flight across the run.
    pub concurrency: usize,
    pub on_member_failure: FailurePolicy,
    pub show_progress: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            concurrency: 4,
            on_member_failure: FailurePolicy::Abort,
            show_progress: false,
        }
    }
}

impl From<&GeneralConfig> for PipelineOptions {
    fn from(general: &GeneralConfig) -> Self {
        Self {
            concurrency: general.concurrency,
            on_member_failure: general.on_member_failure,
            show_progress: false,
        }
    }
}

/// Computes squad reports from a worklog source and an issue lookup.
pub struct Pipeline<S, L> {
    source: S,
    classifier: Classifier<CachedLookup<L>>,
    options: PipelineOptions,
}

impl<S: WorklogSource, L: IssueLookup> Pipeline<S, L> {
    /// Create a pipeline. Issue lookups are cached for the pipeline's lifetime.
    pub fn new(source: S, lookup: L, taxonomy: Taxonomy, options: PipelineOptions) -> Self {
        let lookup = CachedLookup::new(lookup, options.concurrency.max(1));
        Self {
            source,
            classifier: Classifier::new(taxonomy, lookup),
            options,
        }
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        self.classifier.taxonomy()
    }

    fn concurrency(&self) -> usize {
        self.options.concurrency.max(1)
    }

    /// Compute the report of `squad` over `period`.
    ///
    /// Under [`FailurePolicy::Abort`] the first failing member fails the
    /// whole run. Under [`FailurePolicy::Partial`] failed members are listed
    /// in `missing` and contribute nothing to the totals.
    pub async fn squad_report(
        &self,
        squad: &str,
        users: &[User],
        period_name: &str,
        period: &Period,
    ) -> Result<SquadReport> {
        info!(
            "Computing {} report of {} ({} members, {} to {})",
            period_name,
            squad,
            users.len(),
            period.start,
            period.end
        );

        let progress = self.progress_bar(users.len());
        let mut outcomes = std::pin::pin!(stream::iter(users)
            .map(|user| {
                let progress = &progress;
                async move {
                    let outcome = self.user_report(user, period).await;
                    progress.set_message(user.id.clone());
                    progress.inc(1);
                    (user, outcome)
                }
            })
            .buffered(self.concurrency()));

        let mut members = Vec::with_capacity(users.len());
        let mut missing = Vec::new();

        while let Some((user, outcome)) = outcomes.next().await {
            match outcome {
                Ok(report) => members.push(report),
                Err(e) => match self.options.on_member_failure {
                    FailurePolicy::Abort => {
                        progress.abandon();
                        error!("{}", e);
                        return Err(e);
                    }
                    FailurePolicy::Partial => {
                        warn!("Leaving {} out of the report: {}", user.id, e);
                        missing.push(MemberFailure {
                            user_id: user.id.clone(),
                            reason: e.to_string(),
                        });
                    }
                },
            }
        }

        progress.finish_and_clear();
        debug!(
            "{} distinct issues looked up",
            self.classifier.lookup().cached().await
        );

        let hours = merge_squad(members.iter().map(|member| &member.hours));
        info!(
            "{} report of {}: {}h logged of {}h expected",
            period_name, squad, hours.logged, hours.expected
        );

        Ok(SquadReport {
            squad: squad.to_string(),
            period_name: period_name.to_string(),
            period: period.clone(),
            hours,
            members,
            missing,
        })
    }

    /// Compute the report of a single member.
    ///
    /// Any worklog or lookup failure fails the member; entries are never
    /// dropped or defaulted.
    pub async fn user_report(&self, user: &User, period: &Period) -> Result<UserReport> {
        let entries = self
            .source
            .worklogs(&user.id, period)
            .await
            .map_err(|source| ReportError::Source {
                user: user.id.clone(),
                source,
            })?;
        debug!("{} has {} worklogs", user.id, entries.len());

        let categories: Vec<Category> = stream::iter(&entries)
            .map(|entry| self.classifier.classify(entry, &user.squad_name))
            .buffered(self.concurrency())
            .try_collect()
            .await
            .map_err(|e| e.for_member(&user.id))?;

        let classified: Vec<(WorklogEntry, Category)> =
            entries.into_iter().zip(categories).collect();
        let report = fold_user(&classified, period, user);
        debug_assert_eq!(report.hours.bucket_total(), report.hours.logged);

        debug!(
            "{}: {}h logged, {}h worked",
            user.id,
            report.hours.logged,
            report.hours.worked()
        );
        Ok(report)
    }

    fn progress_bar(&self, members: usize) -> ProgressBar {
        if !self.options.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(members as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb
    }
}
