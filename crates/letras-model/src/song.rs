use serde::{Deserialize, Serialize};

use crate::error::FetchError;

/// One unit of fetch work: a song title and the page its lyrics live on.
///
/// `index` is the song's position in the artist listing. Results arrive in
/// whatever order the workers finish, so output writers sort on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongJob {
    pub index: usize,
    pub title: String,
    pub url: String,
}

impl SongJob {
    pub fn new(index: usize, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            index,
            title: title.into(),
            url: url.into(),
        }
    }
}

/// Outcome of processing one [`SongJob`].
#[derive(Debug, Clone, PartialEq)]
pub struct SongResult {
    pub job: SongJob,
    /// Raw lyrics as extracted from the page. Empty when `error` is set.
    pub lyrics: String,
    pub error: Option<FetchError>,
}

impl SongResult {
    pub fn success(job: SongJob, lyrics: String) -> Self {
        Self {
            job,
            lyrics,
            error: None,
        }
    }

    pub fn failure(job: SongJob, error: FetchError) -> Self {
        Self {
            job,
            lyrics: String::new(),
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn title(&self) -> &str {
        &self.job.title
    }

    /// Mark a previously successful result as failed, e.g. when saving it
    /// to disk did not work. The fetched lyrics are kept.
    pub fn fail_with(mut self, error: FetchError) -> Self {
        self.error = Some(error);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_and_failure_constructors() {
        let job = SongJob::new(0, "Yellow", "https://example.com/coldplay/yellow/");
        let ok = SongResult::success(job.clone(), "Look at the stars".into());
        assert!(ok.is_success());
        assert_eq!(ok.title(), "Yellow");

        let failed = SongResult::failure(job, FetchError::Cancelled);
        assert!(!failed.is_success());
        assert!(failed.lyrics.is_empty());
    }

    #[test]
    fn test_fail_with_keeps_lyrics() {
        let job = SongJob::new(3, "Clocks", "https://example.com/coldplay/clocks/");
        let result = SongResult::success(job, "Lights go out".into()).fail_with(
            FetchError::Persist {
                path: "lyrics/coldplay/Clocks.txt".into(),
                message: "disk full".into(),
            },
        );
        assert!(!result.is_success());
        assert_eq!(result.lyrics, "Lights go out");
    }
}
