use std::path::PathBuf;
use std::time::Duration;

use crate::fetch::FetchSettings;
use crate::retry::RetryPolicy;

/// Settings for one run, normally built from command-line arguments.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    /// Number of concurrent workers. Fixed for the whole run.
    pub workers: usize,
    pub retry: RetryPolicy,
    /// Pause each worker takes between songs, to go easy on the server.
    pub polite_delay: Duration,
    /// Root directory; each artist gets a subdirectory.
    pub output_dir: PathBuf,
    pub fetch: FetchSettings,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            workers: 5,
            retry: RetryPolicy::default(),
            polite_delay: Duration::from_secs(1),
            output_dir: PathBuf::from("lyrics"),
            fetch: FetchSettings::default(),
        }
    }
}

impl ScrapeConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.workers >= 1, "worker count must be at least 1");
        anyhow::ensure!(
            !self.retry.initial_backoff.is_zero(),
            "retry backoff must be greater than zero"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ScrapeConfig::default();
        assert_eq!(config.workers, 5);
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.initial_backoff, Duration::from_secs(2));
        assert_eq!(config.polite_delay, Duration::from_secs(1));
        assert_eq!(config.fetch.request_timeout, Duration::from_secs(30));
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let config = ScrapeConfig {
            workers: 0,
            ..ScrapeConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
