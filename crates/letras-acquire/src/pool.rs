//! Fixed-size pool of workers draining a shared job queue.
//!
//! The queue is a bounded `mpsc` channel whose receiver is shared behind a
//! mutex, so each job is handed to exactly one worker. Every worker owns a
//! clone of the results sender; the results channel closes when the last
//! worker exits, which is how the consumer knows the pool is done.

use std::sync::Arc;
use std::time::Duration;

use letras_model::{SongJob, SongResult};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::fetch::ResourceFetcher;
use crate::progress::Progress;
use crate::retry::Sleeper;

/// Everything a worker needs besides the channels.
#[derive(Clone)]
pub struct WorkerContext {
    pub fetcher: ResourceFetcher,
    pub progress: Arc<dyn Progress>,
    pub sleeper: Arc<dyn Sleeper>,
    pub polite_delay: Duration,
    pub cancel: CancellationToken,
}

pub struct WorkerPool {
    workers: JoinSet<usize>,
}

impl WorkerPool {
    /// Start `size` workers. Panics if `size` is zero.
    pub fn spawn(
        size: usize,
        jobs: mpsc::Receiver<SongJob>,
        results: mpsc::Sender<SongResult>,
        ctx: WorkerContext,
    ) -> Self {
        assert!(size >= 1, "worker pool needs at least one worker");

        let queue = Arc::new(Mutex::new(jobs));
        let mut workers = JoinSet::new();
        for id in 0..size {
            workers.spawn(worker(id, queue.clone(), results.clone(), ctx.clone()));
        }

        Self { workers }
    }

    /// Wait for every worker to exit and return the number of jobs processed.
    pub async fn join(mut self) -> usize {
        let mut processed = 0;
        while let Some(joined) = self.workers.join_next().await {
            match joined {
                Ok(count) => processed += count,
                Err(err) => tracing::error!(error = %err, "Worker task failed"),
            }
        }
        processed
    }
}

async fn worker(
    id: usize,
    queue: Arc<Mutex<mpsc::Receiver<SongJob>>>,
    results: mpsc::Sender<SongResult>,
    ctx: WorkerContext,
) -> usize {
    let mut processed = 0;

    loop {
        let next = queue.lock().await.recv().await;
        let Some(job) = next else {
            break;
        };

        if ctx.cancel.is_cancelled() {
            tracing::debug!(worker = id, title = %job.title, "Cancelled, leaving job unprocessed");
            break;
        }

        tracing::debug!(worker = id, title = %job.title, "Processing");
        let result = match ctx.fetcher.content(&job).await {
            Ok(lyrics) => SongResult::success(job, lyrics),
            Err(err) => SongResult::failure(job, err),
        };

        if results.send(result).await.is_err() {
            tracing::warn!(worker = id, "Result receiver dropped, stopping");
            break;
        }
        processed += 1;
        ctx.progress.advance();

        ctx.sleeper.sleep(ctx.polite_delay).await;
    }

    tracing::debug!(worker = id, processed, "Worker finished");
    processed
}
