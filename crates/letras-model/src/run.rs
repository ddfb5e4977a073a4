use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::song::{SongJob, SongResult};

/// Phases of a single artist run.
///
/// `Failed` is only reachable from `Listing`: once a job list exists, item
/// failures are recorded per song and the run carries on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Listing,
    Fetching,
    Saving,
    Reporting,
    Done,
    Failed,
}

impl RunState {
    pub fn can_transition_to(self, next: RunState) -> bool {
        use RunState::*;
        matches!(
            (self, next),
            (Listing, Fetching)
                | (Listing, Failed)
                | (Fetching, Saving)
                | (Saving, Reporting)
                | (Reporting, Done)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Done | RunState::Failed)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Listing => "listing",
            RunState::Fetching => "fetching",
            RunState::Saving => "saving",
            RunState::Reporting => "reporting",
            RunState::Done => "done",
            RunState::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid run transition {from} -> {to}")]
pub struct TransitionError {
    pub from: RunState,
    pub to: RunState,
}

/// All state for one end-to-end execution for one artist.
#[derive(Debug)]
pub struct Run {
    pub artist: String,
    pub jobs: Vec<SongJob>,
    pub succeeded: Vec<SongResult>,
    pub failed: Vec<SongResult>,
    pub started_at: DateTime<Utc>,
    state: RunState,
}

impl Run {
    pub fn new(artist: impl Into<String>) -> Self {
        Self {
            artist: artist.into(),
            jobs: Vec::new(),
            succeeded: Vec::new(),
            failed: Vec::new(),
            started_at: Utc::now(),
            state: RunState::Listing,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn transition(&mut self, next: RunState) -> Result<(), TransitionError> {
        if !self.state.can_transition_to(next) {
            return Err(TransitionError {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }

    /// Number of results recorded so far, across both partitions.
    pub fn processed(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    /// Sort both partitions back into listing order.
    pub fn sort_by_listing_order(&mut self) {
        self.succeeded.sort_by_key(|r| r.job.index);
        self.failed.sort_by_key(|r| r.job.index);
    }

    pub fn report(&self, cancelled: bool) -> RunReport {
        let finished_at = Utc::now();
        RunReport {
            artist: self.artist.clone(),
            total: self.jobs.len(),
            succeeded: self.succeeded.iter().map(|r| r.job.title.clone()).collect(),
            failed: self
                .failed
                .iter()
                .map(|r| FailedSong {
                    title: r.job.title.clone(),
                    url: r.job.url.clone(),
                    cause: r
                        .error
                        .as_ref()
                        .map(|e| e.to_string())
                        .unwrap_or_default(),
                })
                .collect(),
            cancelled,
            started_at: self.started_at,
            elapsed_secs: (finished_at - self.started_at).num_milliseconds() as f64 / 1000.0,
        }
    }
}

/// A song that could not be fetched or saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedSong {
    pub title: String,
    pub url: String,
    pub cause: String,
}

/// Summary of a finished run, suitable for logging or writing as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub artist: String,
    pub total: usize,
    pub succeeded: Vec<String>,
    pub failed: Vec<FailedSong>,
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub elapsed_secs: f64,
}

impl RunReport {
    pub fn succeeded_count(&self) -> usize {
        self.succeeded.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;

    #[test]
    fn test_happy_path_transitions() {
        let mut run = Run::new("coldplay");
        for next in [
            RunState::Fetching,
            RunState::Saving,
            RunState::Reporting,
            RunState::Done,
        ] {
            run.transition(next).unwrap();
        }
        assert!(run.state().is_terminal());
    }

    #[test]
    fn test_failed_only_reachable_from_listing() {
        assert!(RunState::Listing.can_transition_to(RunState::Failed));
        assert!(!RunState::Fetching.can_transition_to(RunState::Failed));
        assert!(!RunState::Saving.can_transition_to(RunState::Failed));

        let mut run = Run::new("coldplay");
        run.transition(RunState::Fetching).unwrap();
        let err = run.transition(RunState::Failed).unwrap_err();
        assert_eq!(err.from, RunState::Fetching);
        assert_eq!(run.state(), RunState::Fetching);
    }

    #[test]
    fn test_report_lists_failures_with_cause() {
        let mut run = Run::new("coldplay");
        run.jobs = vec![
            SongJob::new(0, "Yellow", "https://example.com/yellow/"),
            SongJob::new(1, "Clocks", "https://example.com/clocks/"),
        ];
        run.succeeded
            .push(SongResult::success(run.jobs[0].clone(), "text".into()));
        run.failed.push(SongResult::failure(
            run.jobs[1].clone(),
            FetchError::empty("lyrics"),
        ));

        let report = run.report(false);
        assert_eq!(report.total, 2);
        assert_eq!(report.succeeded, vec!["Yellow".to_string()]);
        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.failed[0].cause, "no lyrics found on page");

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"cancelled\":false"));
    }

    #[test]
    fn test_sort_by_listing_order() {
        let mut run = Run::new("a");
        for (i, title) in [(2, "C"), (0, "A"), (1, "B")] {
            run.succeeded.push(SongResult::success(
                SongJob::new(i, title, format!("https://example.com/{title}/")),
                String::new(),
            ));
        }
        run.sort_by_listing_order();
        let titles: Vec<_> = run.succeeded.iter().map(|r| r.title()).collect();
        assert_eq!(titles, ["A", "B", "C"]);
    }
}
