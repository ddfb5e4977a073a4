//! End-to-end run for one artist: list songs, fetch them concurrently,
//! save what arrived and report what didn't.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use letras_model::{FetchError, Run, RunReport, RunState, SongJob, SongResult};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::ScrapeConfig;
use crate::fetch::{LetrasClient, ResourceFetcher, SongSource};
use crate::output;
use crate::pool::{WorkerContext, WorkerPool};
use crate::progress::{NoProgress, Progress};
use crate::prompt::{Confirm, FixedAnswer};
use crate::retry::{RetryExecutor, Sleeper, TokioSleeper};

pub const LLM_PROMPT: &str =
    "Would you like to save all lyrics in a single file optimized for LLM ingestion?";

pub struct Pipeline {
    config: ScrapeConfig,
    source: Arc<dyn SongSource>,
    sleeper: Arc<dyn Sleeper>,
    download_progress: Arc<dyn Progress>,
    save_progress: Arc<dyn Progress>,
    confirm: Arc<dyn Confirm>,
    cancel: CancellationToken,
}

impl Pipeline {
    pub fn new(config: ScrapeConfig, source: Arc<dyn SongSource>, cancel: CancellationToken) -> Self {
        Self {
            config,
            source,
            sleeper: Arc::new(TokioSleeper),
            download_progress: Arc::new(NoProgress),
            save_progress: Arc::new(NoProgress),
            confirm: Arc::new(FixedAnswer(false)),
            cancel,
        }
    }

    /// A pipeline talking to the real site described by `config.fetch`.
    pub fn from_config(config: ScrapeConfig, cancel: CancellationToken) -> Result<Self> {
        config.validate()?;
        let client = LetrasClient::new(&config.fetch).context("Failed to build HTTP client")?;
        Ok(Self::new(config, Arc::new(client), cancel))
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_progress(mut self, download: Arc<dyn Progress>, save: Arc<dyn Progress>) -> Self {
        self.download_progress = download;
        self.save_progress = save;
        self
    }

    pub fn with_confirm(mut self, confirm: Arc<dyn Confirm>) -> Self {
        self.confirm = confirm;
        self
    }

    /// Run the whole pipeline for `artist`.
    ///
    /// Errors only when the config is invalid, the output directory can't be
    /// created or the song list can't be fetched. Per-song failures end up in the report.
    pub async fn run(&self, artist: &str) -> Result<RunReport> {
        self.config.validate().context("Invalid configuration")?;

        let mut run = Run::new(artist);
        let dir = output::artist_dir(&self.config.output_dir, artist);
        output::ensure_output_dir(&dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

        let fetch_retry = RetryExecutor::new(self.config.retry, self.sleeper.clone(), self.cancel.clone());
        // Saving keeps going after cancellation so finished downloads are not lost.
        let persist_retry =
            RetryExecutor::new(self.config.retry, self.sleeper.clone(), CancellationToken::new());
        let fetcher = ResourceFetcher::new(self.source.clone(), fetch_retry);

        tracing::info!(artist, "Fetching song list");
        let jobs = match fetcher.list(artist).await {
            Ok(jobs) => jobs,
            Err(err) => {
                transition(&mut run, RunState::Failed)?;
                return Err(anyhow::Error::new(err)
                    .context(format!("Failed to get song list for {artist}")));
            }
        };
        tracing::info!(artist, songs = jobs.len(), "Found songs");
        run.jobs = jobs;

        transition(&mut run, RunState::Fetching)?;
        self.fetch_and_save(&mut run, &dir, fetcher, &persist_retry).await;

        transition(&mut run, RunState::Saving)?;
        run.sort_by_listing_order();
        self.write_combined(&run, &dir, &persist_retry).await;

        transition(&mut run, RunState::Reporting)?;
        let report = run.report(self.cancel.is_cancelled());
        log_summary(&report);

        transition(&mut run, RunState::Done)?;
        Ok(report)
    }

    /// Fan the jobs out to the worker pool and drain results as they
    /// arrive. Each successful result is written to its own file right away;
    /// failed writes move the song to the failed list.
    async fn fetch_and_save(
        &self,
        run: &mut Run,
        dir: &Path,
        fetcher: ResourceFetcher,
        persist_retry: &RetryExecutor,
    ) {
        let total = run.jobs.len();
        let capacity = total.max(1);
        let (job_tx, job_rx) = mpsc::channel(capacity);
        let (result_tx, mut result_rx) = mpsc::channel(capacity);

        let files = output::SongFiles::assign(&run.artist, &run.jobs);

        self.download_progress.start(total);
        self.save_progress.start(total);

        let pool = WorkerPool::spawn(
            self.config.workers,
            job_rx,
            result_tx,
            WorkerContext {
                fetcher,
                progress: self.download_progress.clone(),
                sleeper: self.sleeper.clone(),
                polite_delay: self.config.polite_delay,
                cancel: self.cancel.clone(),
            },
        );
        let feeder = tokio::spawn(feed_jobs(run.jobs.clone(), job_tx, self.cancel.clone()));

        while let Some(result) = result_rx.recv().await {
            if let Some(err) = &result.error {
                tracing::warn!(title = %result.title(), error = %err, "Error processing song");
                run.failed.push(result);
            } else {
                match save_song(persist_retry, dir, &files.name(&result.job), &run.artist, &result).await {
                    Ok(()) => {
                        tracing::debug!(title = %result.title(), "Successfully processed");
                        run.succeeded.push(result);
                    }
                    Err(err) => {
                        tracing::warn!(title = %result.title(), error = %err, "Error saving song");
                        run.failed.push(result.fail_with(err));
                    }
                }
            }
            self.save_progress.advance();
        }

        let enqueued = match feeder.await {
            Ok(count) => count,
            Err(err) => {
                tracing::error!(error = %err, "Job feeder failed");
                0
            }
        };
        let processed = pool.join().await;

        self.download_progress.finish();
        self.save_progress.finish();

        tracing::debug!(total, enqueued, processed, drained = run.processed(), "Fetching finished");
        if !self.cancel.is_cancelled() && run.processed() != total {
            tracing::warn!(total, drained = run.processed(), "Some songs produced no result");
        }
    }

    async fn write_combined(&self, run: &Run, dir: &Path, persist_retry: &RetryExecutor) {
        if run.succeeded.is_empty() {
            tracing::warn!("No songs were saved, skipping combined files");
            return;
        }

        let combined = persist_retry
            .run("saving combined lyrics", || async {
                output::write_all_lyrics(dir, &run.artist, &run.succeeded)
            })
            .await;
        if let Err(err) = combined {
            tracing::error!(error = %err, "Failed to save combined lyrics");
        }

        if self.confirm.confirm(LLM_PROMPT) {
            let llm = persist_retry
                .run("saving LLM format", || async {
                    output::write_llm_format(dir, &run.artist, &run.succeeded)
                })
                .await;
            match llm {
                Ok(_) => tracing::info!("Successfully saved LLM format file"),
                Err(err) => tracing::warn!(error = %err, "Failed to save LLM format"),
            }
        }
    }
}

/// Push every job onto the queue unless the run is cancelled first. The
/// sender is dropped on return, which closes the queue either way.
async fn feed_jobs(
    jobs: Vec<SongJob>,
    queue: mpsc::Sender<SongJob>,
    cancel: CancellationToken,
) -> usize {
    let mut enqueued = 0;
    for job in jobs {
        let title = job.title.clone();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(enqueued, "Cancelled, no more songs queued");
                break;
            }
            sent = queue.send(job) => {
                if sent.is_err() {
                    break;
                }
                tracing::debug!(title = %title, "Queued song");
                enqueued += 1;
            }
        }
    }
    enqueued
}

async fn save_song(
    retry: &RetryExecutor,
    dir: &Path,
    file_name: &str,
    artist: &str,
    song: &SongResult,
) -> Result<(), FetchError> {
    retry
        .run(&format!("saving {}", song.title()), || async {
            output::write_song(dir, file_name, artist, song).map(|_| ())
        })
        .await
}

fn transition(run: &mut Run, next: RunState) -> Result<()> {
    tracing::debug!(artist = %run.artist, from = %run.state(), to = %next, "Run state");
    run.transition(next)?;
    Ok(())
}

fn log_summary(report: &RunReport) {
    tracing::info!(
        artist = %report.artist,
        total = report.total,
        succeeded = report.succeeded_count(),
        failed = report.failed_count(),
        cancelled = report.cancelled,
        elapsed_secs = report.elapsed_secs,
        "Scraping completed"
    );
    for failure in &report.failed {
        tracing::warn!(title = %failure.title, cause = %failure.cause, "Failed song");
    }
}
