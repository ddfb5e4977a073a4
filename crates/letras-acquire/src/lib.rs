//! Lyrics acquisition: fetch an artist's songs concurrently with retries,
//! normalize the text and write it out.

pub mod config;
pub mod extract;
pub mod fetch;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod pool;
pub mod progress;
pub mod prompt;
pub mod retry;

pub use config::ScrapeConfig;
pub use fetch::{FetchSettings, LetrasClient, ResourceFetcher, SongSource};
pub use pipeline::Pipeline;
pub use progress::{NoProgress, Progress, TerminalProgress};
pub use prompt::{Confirm, FixedAnswer, StdinConfirm};
pub use retry::{backoff_delay, RetryExecutor, RetryPolicy, Sleeper, TokioSleeper};
