//! Resume decision logic
//!
//! Matches a new run request against stored checkpoints and classifies the
//! result as start-new, auto-resume, or suggest.

use crate::checkpoint::{Checkpoint, CheckpointStore, CheckpointSummary};
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

/// Maximum age of a resume candidate, in hours.
/// A run untouched for more than a day is stale: the filing data may have
/// moved on and the operator has likely forgotten the run existed, so it is
/// never auto-resumed or suggested.
pub const DEFAULT_MAX_AGE_HOURS: i64 = 24;

/// Minimum progress (percent, strict) before a run is auto-resumed.
/// Below this a run has barely started and starting fresh is cheaper than
/// reconciling a near-empty checkpoint.
pub const MIN_AUTO_RESUME_PROGRESS: f64 = 10.0;

/// Maximum company-count deviation (percent, inclusive) for auto-resume.
/// Within 20% the previous roster is close enough that continuing it serves
/// the new request; beyond that the operator probably wants a different run.
pub const MAX_COUNT_DEVIATION_PCT: f64 = 20.0;

/// Outcome of matching a run request against the checkpoint store
#[derive(Debug)]
pub enum ResumeDecision {
    /// No usable checkpoint; the caller should start a fresh run
    StartNew {
        /// Why nothing was resumable
        reason: String,
    },
    /// A checkpoint is confidently resumable without asking
    AutoResume {
        /// The loaded checkpoint to continue
        checkpoint: Box<Checkpoint>,
        /// Why it was accepted
        reason: String,
    },
    /// A candidate exists but confidence is insufficient; the caller decides
    Suggest {
        /// The loaded candidate checkpoint
        checkpoint: Box<Checkpoint>,
        /// Which acceptance criterion failed
        reason: String,
    },
}

impl ResumeDecision {
    /// Short machine-friendly name of the outcome
    pub fn label(&self) -> &'static str {
        match self {
            ResumeDecision::StartNew { .. } => "start_new",
            ResumeDecision::AutoResume { .. } => "auto_resume",
            ResumeDecision::Suggest { .. } => "suggest",
        }
    }
}

/// Resume decision engine over a checkpoint store
pub struct ResumeEngine {
    store: CheckpointStore,
    max_age: Duration,
    auto_resume: bool,
}

impl ResumeEngine {
    /// Create an engine with the default 24-hour candidate window
    pub fn new(store: CheckpointStore) -> Self {
        Self {
            store,
            max_age: Duration::hours(DEFAULT_MAX_AGE_HOURS),
            auto_resume: true,
        }
    }

    /// Override the candidate max-age window
    pub fn with_max_age_hours(mut self, hours: i64) -> Self {
        self.max_age = Duration::hours(hours);
        self
    }

    /// Enable or disable resume entirely; when disabled every request
    /// starts a fresh run
    pub fn with_auto_resume(mut self, enabled: bool) -> Self {
        self.auto_resume = enabled;
        self
    }

    /// Decide how a run request relates to stored checkpoints
    ///
    /// `requested_count` is the number of companies the new request covers;
    /// when given it ranks candidates by count similarity and gates
    /// auto-resume on a close match.
    pub fn find_resumable(
        &self,
        target_year: i32,
        requested_count: Option<u32>,
        force_new: bool,
    ) -> ResumeDecision {
        if force_new {
            info!(target_year, "Fresh run forced, skipping checkpoint search");
            return ResumeDecision::StartNew {
                reason: "fresh run forced".to_string(),
            };
        }
        if !self.auto_resume {
            info!(target_year, "Resume disabled, starting fresh");
            return ResumeDecision::StartNew {
                reason: "auto-resume disabled".to_string(),
            };
        }

        self.find_resumable_at(target_year, requested_count, Utc::now())
    }

    /// Decision algorithm with an injected clock; the age filter is a pure
    /// function of `now`
    fn find_resumable_at(
        &self,
        target_year: i32,
        requested_count: Option<u32>,
        now: DateTime<Utc>,
    ) -> ResumeDecision {
        let summaries = self.store.list();
        debug!(
            target_year,
            stored = summaries.len(),
            "Searching for resumable checkpoints"
        );

        let candidates =
            select_candidates(summaries, target_year, now, self.max_age, requested_count);

        let Some(best) = candidates.first() else {
            info!(target_year, "No resumable checkpoint found");
            return ResumeDecision::StartNew {
                reason: format!(
                    "no checkpoint for year {} saved within the last {} hours",
                    target_year,
                    self.max_age.num_hours()
                ),
            };
        };

        debug!(
            analysis_id = %best.analysis_id,
            progress = best.progress_percentage(),
            candidates = candidates.len(),
            "Selected best resume candidate"
        );

        let Some(checkpoint) = self.store.load(&best.analysis_id, best.target_year) else {
            warn!(
                analysis_id = %best.analysis_id,
                "Best candidate failed to load, starting fresh"
            );
            return ResumeDecision::StartNew {
                reason: format!("checkpoint {} could not be loaded", best.analysis_id),
            };
        };

        let progress = checkpoint.progress_percentage();
        match acceptance_failure(progress, checkpoint.total_companies(), requested_count) {
            None => {
                let reason = format!(
                    "{} is {:.1}% complete ({} of {} companies) and matches the request",
                    checkpoint.analysis_id(),
                    progress,
                    checkpoint.completed_companies() + checkpoint.failed_companies(),
                    checkpoint.total_companies()
                );
                info!(
                    analysis_id = %checkpoint.analysis_id(),
                    progress,
                    "Auto-resuming checkpoint"
                );
                ResumeDecision::AutoResume {
                    checkpoint: Box::new(checkpoint),
                    reason,
                }
            }
            Some(failure) => {
                info!(
                    analysis_id = %checkpoint.analysis_id(),
                    progress,
                    reason = %failure,
                    "Candidate found but not auto-resumable"
                );
                ResumeDecision::Suggest {
                    checkpoint: Box::new(checkpoint),
                    reason: failure,
                }
            }
        }
    }
}

/// Filter and rank resume candidates
///
/// Keeps checkpoints for the requested year saved within the max-age
/// window, prefers incomplete runs exclusively when any exist, then sorts
/// by company-count distance to the request (ties keep the incoming
/// most-recent-first order).
fn select_candidates(
    summaries: Vec<CheckpointSummary>,
    target_year: i32,
    now: DateTime<Utc>,
    max_age: Duration,
    requested_count: Option<u32>,
) -> Vec<CheckpointSummary> {
    let mut candidates: Vec<CheckpointSummary> = summaries
        .into_iter()
        .filter(|s| s.target_year == target_year)
        .filter(|s| now.signed_duration_since(s.last_updated) <= max_age)
        .collect();

    if candidates.iter().any(|s| !s.is_complete()) {
        candidates.retain(|s| !s.is_complete());
    }

    if let Some(count) = requested_count {
        candidates.sort_by_key(|s| (i64::from(s.total_companies) - i64::from(count)).abs());
    }

    candidates
}

/// Check the auto-resume acceptance criteria
///
/// Returns `None` when the candidate qualifies for silent resume, or a
/// human-readable reason naming the first criterion that failed.
fn acceptance_failure(
    progress: f64,
    total_companies: u32,
    requested_count: Option<u32>,
) -> Option<String> {
    if progress >= 100.0 {
        return Some("the run is already complete".to_string());
    }
    if progress <= MIN_AUTO_RESUME_PROGRESS {
        return Some(format!(
            "only {progress:.1}% complete, at or below the {MIN_AUTO_RESUME_PROGRESS:.0}% auto-resume threshold"
        ));
    }
    if let Some(requested) = requested_count {
        let deviation = (i64::from(total_companies) - i64::from(requested)).abs() as f64 * 100.0
            / requested as f64;
        if deviation > MAX_COUNT_DEVIATION_PCT {
            return Some(format!(
                "company count {total_companies} deviates {deviation:.1}% from the requested {requested} (limit {MAX_COUNT_DEVIATION_PCT:.0}%)"
            ));
        }
    }
    None
}
