use std::sync::Arc;
use std::time::Duration;

use letras_model::{FetchError, SongJob};

use crate::extract::{self, Strategy, LYRICS_STRATEGIES, SONG_LIST_STRATEGIES};
use crate::retry::RetryExecutor;

pub const DEFAULT_BASE_URL: &str = "https://letras.mus.br";

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    /// Upper bound for a single request, independent of retry backoff.
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            user_agent: format!("letras/{} (lyrics archiver)", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// The two remote lookups a run needs. Implementations make a single
/// attempt; retries are layered on by [`ResourceFetcher`].
#[async_trait::async_trait]
pub trait SongSource: Send + Sync {
    async fn list_songs(&self, artist: &str) -> Result<Vec<SongJob>, FetchError>;

    async fn fetch_lyrics(&self, url: &str) -> Result<String, FetchError>;
}

/// [`SongSource`] backed by the letras.mus.br website.
#[derive(Debug, Clone)]
pub struct LetrasClient {
    client: reqwest::Client,
    base_url: String,
    list_strategies: &'static [Strategy],
    lyrics_strategies: &'static [Strategy],
}

impl LetrasClient {
    pub fn new(settings: &FetchSettings) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&settings.user_agent)
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            list_strategies: SONG_LIST_STRATEGIES,
            lyrics_strategies: LYRICS_STRATEGIES,
        })
    }

    pub fn artist_url(&self, artist: &str) -> String {
        format!("{}/{}/", self.base_url, artist.trim_matches('/'))
    }

    async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| transport_error(url, err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::NotFound {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|err| transport_error(url, err))
    }
}

#[async_trait::async_trait]
impl SongSource for LetrasClient {
    async fn list_songs(&self, artist: &str) -> Result<Vec<SongJob>, FetchError> {
        let url = self.artist_url(artist);
        tracing::debug!(url = %url, "Fetching artist page");
        let html = self.fetch_page(&url).await?;

        let jobs = extract::extract_song_links(&html, &self.base_url, self.list_strategies);
        if jobs.is_empty() {
            return Err(FetchError::empty(format!("songs for artist {artist}")));
        }
        Ok(jobs)
    }

    async fn fetch_lyrics(&self, url: &str) -> Result<String, FetchError> {
        let html = self.fetch_page(url).await?;
        extract::extract_lyrics(&html, self.lyrics_strategies)
            .ok_or_else(|| FetchError::empty("lyrics"))
    }
}

fn transport_error(url: &str, err: reqwest::Error) -> FetchError {
    let message = if err.is_timeout() {
        format!("timed out: {err}")
    } else {
        err.to_string()
    };
    FetchError::Transport {
        url: url.to_string(),
        message,
    }
}

/// A [`SongSource`] with every lookup routed through the retry executor.
#[derive(Clone)]
pub struct ResourceFetcher {
    source: Arc<dyn SongSource>,
    retry: RetryExecutor,
}

impl ResourceFetcher {
    pub fn new(source: Arc<dyn SongSource>, retry: RetryExecutor) -> Self {
        Self { source, retry }
    }

    pub fn retry(&self) -> &RetryExecutor {
        &self.retry
    }

    pub async fn list(&self, artist: &str) -> Result<Vec<SongJob>, FetchError> {
        let jobs = self
            .retry
            .run(&format!("listing {artist}"), || self.source.list_songs(artist))
            .await?;
        Ok(extract::dedup_by_url(jobs))
    }

    pub async fn content(&self, job: &SongJob) -> Result<String, FetchError> {
        self.retry
            .run(&format!("downloading {}", job.title), || {
                self.source.fetch_lyrics(&job.url)
            })
            .await
    }
}
