use std::future::Future;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use letras_acquire::fetch::DEFAULT_BASE_URL;
use letras_acquire::{
    Confirm, FetchSettings, FixedAnswer, Pipeline, RetryPolicy, ScrapeConfig, StdinConfirm,
    TerminalProgress,
};
use letras_model::RunReport;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "letras")]
#[command(about = "Download every song by an artist from letras.mus.br")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("BUILD_HASH"), ")"))]
struct Cli {
    /// Artist as it appears in the site URL (e.g., "coldplay"). Asked for when omitted.
    artist: Option<String>,

    /// Number of concurrent workers
    #[arg(short, long, default_value_t = 5)]
    workers: usize,

    /// Maximum number of retries per request
    #[arg(short, long, default_value_t = 3)]
    retries: u32,

    /// Initial retry backoff, doubled after every failed attempt (e.g., "2s", "500ms")
    #[arg(long, default_value = "2s", value_parser = parse_duration)]
    backoff: Duration,

    /// Pause each worker takes between songs
    #[arg(long, default_value = "1s", value_parser = parse_duration)]
    delay: Duration,

    /// Timeout for a single HTTP request
    #[arg(long, default_value = "30s", value_parser = parse_duration)]
    timeout: Duration,

    /// Root output directory; each artist gets a subdirectory
    #[arg(short = 'O', long, default_value = "lyrics")]
    output_dir: PathBuf,

    /// Site to fetch from
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Also write the LLM-oriented combined file without asking
    #[arg(long, conflicts_with = "no_llm_format")]
    llm_format: bool,

    /// Never write the LLM-oriented combined file, and don't ask
    #[arg(long)]
    no_llm_format: bool,

    /// Write the run summary as JSON to this path
    #[arg(long)]
    summary_json: Option<PathBuf>,

    /// Enable debug logging (same as --log-level debug)
    #[arg(long)]
    debug: bool,

    /// Log level: error, warn, info, debug, trace
    #[arg(long, default_value = "info", value_enum)]
    log_level: LogLevel,

    /// Use UTC timestamps instead of local time
    #[arg(long)]
    utc: bool,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl Cli {
    fn config(&self) -> ScrapeConfig {
        ScrapeConfig {
            workers: self.workers,
            retry: RetryPolicy {
                max_retries: self.retries,
                initial_backoff: self.backoff,
            },
            polite_delay: self.delay,
            output_dir: self.output_dir.clone(),
            fetch: FetchSettings {
                base_url: self.base_url.clone(),
                request_timeout: self.timeout,
                ..FetchSettings::default()
            },
        }
    }

    fn confirm(&self) -> Arc<dyn Confirm> {
        if self.llm_format {
            Arc::new(FixedAnswer(true))
        } else if self.no_llm_format {
            Arc::new(FixedAnswer(false))
        } else {
            Arc::new(StdinConfirm)
        }
    }

    fn log_filter(&self) -> &'static str {
        let level = if self.debug {
            LogLevel::Debug
        } else {
            self.log_level
        };
        // Keep the HTML parser crates quiet at debug/trace
        match level {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug,selectors=warn,html5ever=warn",
            LogLevel::Trace => "trace,selectors=warn,html5ever=warn",
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    let artist = match cli.artist.clone() {
        Some(artist) => artist,
        None => prompt_artist()?,
    };
    let artist = artist.trim().trim_matches('/').to_string();
    anyhow::ensure!(!artist.is_empty(), "No artist given");

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if watch_interrupts(tokio::signal::ctrl_c, interrupt).await {
            tracing::error!("Interrupted again, exiting without saving");
            std::process::exit(130);
        }
    });

    let pipeline = Pipeline::from_config(cli.config(), cancel)?
        .with_progress(
            Arc::new(TerminalProgress::new("[1/2] Downloading lyrics...")),
            Arc::new(TerminalProgress::new("[2/2] Saving files...")),
        )
        .with_confirm(cli.confirm());

    tracing::info!(artist = %artist, workers = cli.workers, "Acquiring lyrics");
    let report = pipeline.run(&artist).await?;

    if let Some(path) = &cli.summary_json {
        write_summary(path, &report)?;
    }

    Ok(())
}

/// Cancel the run on the first interrupt. Returns `true` when a second one
/// arrives, `false` if the signal source fails first.
async fn watch_interrupts<S, F>(mut next_signal: S, cancel: CancellationToken) -> bool
where
    S: FnMut() -> F,
    F: Future<Output = io::Result<()>>,
{
    if next_signal().await.is_err() {
        return false;
    }
    tracing::warn!("Interrupted, saving what has been downloaded so far (Ctrl-C again to quit)");
    cancel.cancel();

    next_signal().await.is_ok()
}

fn init_logging(cli: &Cli) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(cli.log_filter()));

    // Timestamp format: 2026-02-14 19:44:09.123 -08:00
    let time_format = "%Y-%m-%d %H:%M:%S%.3f %:z";

    if cli.utc {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(io::stderr)
            .with_timer(tracing_subscriber::fmt::time::ChronoUtc::new(time_format.to_string()))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(io::stderr)
            .with_timer(tracing_subscriber::fmt::time::ChronoLocal::new(time_format.to_string()))
            .init();
    }
}

fn prompt_artist() -> Result<String> {
    print!("Enter artist name (as it appears in the URL): ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read artist name")?;
    Ok(line.trim().to_string())
}

fn write_summary(path: &Path, report: &RunReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, &json)
        .with_context(|| format!("Failed to write summary to {}", path.display()))?;
    tracing::info!(path = %path.display(), "Wrote run summary");
    Ok(())
}

/// Parse durations like `500ms`, `2s`, `1m` or a bare number of seconds.
fn parse_duration(input: &str) -> Result<Duration, String> {
    let input = input.trim();
    let split = input
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(input.len());
    let (number, unit) = input.split_at(split);
    let value: f64 = number
        .parse()
        .map_err(|_| format!("invalid duration '{input}'"))?;

    let seconds = match unit.trim() {
        "ms" => value / 1000.0,
        "" | "s" => value,
        "m" => value * 60.0,
        other => return Err(format!("unknown duration unit '{other}' (use ms, s or m)")),
    };
    Duration::try_from_secs_f64(seconds).map_err(|e| format!("invalid duration '{input}': {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("1m").unwrap(), Duration::from_secs(60));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
        assert_eq!(parse_duration("1.5s").unwrap(), Duration::from_millis(1500));
        assert!(parse_duration("fast").is_err());
        assert!(parse_duration("2h").is_err());
    }

    #[test]
    fn test_cli_builds_config() {
        let cli = Cli::parse_from([
            "letras", "coldplay", "--workers", "2", "--retries", "0", "--backoff", "250ms",
            "--no-llm-format",
        ]);
        let config = cli.config();
        assert_eq!(config.workers, 2);
        assert_eq!(config.retry.max_retries, 0);
        assert_eq!(config.retry.initial_backoff, Duration::from_millis(250));
        assert_eq!(config.fetch.request_timeout, Duration::from_secs(30));
        assert_eq!(cli.artist.as_deref(), Some("coldplay"));
        assert!(!cli.confirm().confirm("?"));
    }

    #[test]
    fn test_debug_flag_overrides_log_level() {
        let cli = Cli::parse_from(["letras", "--debug", "--log-level", "warn"]);
        assert!(cli.log_filter().starts_with("debug"));
    }

    #[test]
    fn test_llm_flags_conflict() {
        assert!(Cli::try_parse_from(["letras", "--llm-format", "--no-llm-format"]).is_err());
    }

    #[tokio::test]
    async fn test_second_interrupt_requests_exit() {
        let cancel = CancellationToken::new();
        let mut signals = 0;
        let exit = watch_interrupts(
            || {
                signals += 1;
                async { Ok(()) }
            },
            cancel.clone(),
        )
        .await;

        assert!(exit);
        assert!(cancel.is_cancelled());
        assert_eq!(signals, 2);
    }

    #[tokio::test]
    async fn test_failed_signal_source_leaves_run_alone() {
        let cancel = CancellationToken::new();
        let exit = watch_interrupts(
            || async { Err(io::Error::other("no signal handler")) },
            cancel.clone(),
        )
        .await;

        assert!(!exit);
        assert!(!cancel.is_cancelled());
    }
}
