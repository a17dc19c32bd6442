//! CLI for braid: fetch one URL with parallel range requests, printing progress.

mod progress;

use anyhow::{Context, Result};
use braid_core::config::{self, BraidConfig};
use braid_core::{CancelToken, Request};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Fetch a single HTTP resource using multiple parallel range requests.
#[derive(Debug, Parser)]
#[command(name = "braid")]
#[command(about = "Fetch one HTTP resource over several parallel range requests", long_about = None)]
pub struct Cli {
    /// URL to fetch.
    #[arg(long)]
    pub url: String,

    /// File to write the result to (created or truncated).
    #[arg(long, value_name = "PATH")]
    pub filename: PathBuf,

    /// Number of parallel range requests (default from config, else 5).
    #[arg(long, value_name = "N")]
    pub jobs: Option<usize>,

    /// User-Agent header to send.
    #[arg(long, value_name = "UA")]
    pub user_agent: Option<String>,

    /// Progress print interval in milliseconds.
    #[arg(long, default_value = "1000", value_name = "MS")]
    pub interval_ms: u64,

    /// Print braid's diagnostic lines to stderr.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Build the request: config file values, then command-line overrides.
    fn request(&self, cfg: &BraidConfig) -> Request {
        let mut req = Request::from_config(cfg);
        if let Some(jobs) = self.jobs {
            req.set_jobs(jobs);
        }
        if let Some(ua) = &self.user_agent {
            req.set_user_agent(ua.clone());
        }
        if self.verbose {
            req.set_log_sink(|line| eprintln!("{}", line));
        }
        req
    }
}

pub async fn run_from_args() -> Result<()> {
    let cli = Cli::parse();
    let cfg = match config::load_or_init() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::warn!("could not load config, using defaults: {:#}", e);
            BraidConfig::default()
        }
    };
    tracing::debug!("loaded config: {:?}", cfg);
    run(&cli, &cfg).await
}

async fn run(cli: &Cli, cfg: &BraidConfig) -> Result<()> {
    let req = Arc::new(cli.request(cfg));
    let cancel = CancelToken::new();

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupted, cancelling fetch");
                cancel.cancel();
            }
        });
    }

    let mut fetch = {
        let req = Arc::clone(&req);
        let cancel = cancel.clone();
        let url = cli.url.clone();
        let filename = cli.filename.clone();
        tokio::task::spawn_blocking(move || req.fetch_file(&cancel, &url, &filename))
    };

    let started = Instant::now();
    let mut ticker = tokio::time::interval(Duration::from_millis(cli.interval_ms.max(1)));
    ticker.tick().await;
    let result = loop {
        tokio::select! {
            joined = &mut fetch => break joined.context("fetch task failed")?,
            _ = ticker.tick() => {
                println!("{}", progress::format_progress(&req.stats(), started.elapsed()));
                let _ = std::io::stdout().flush();
            }
        }
    };
    // final newline
    println!();

    let file = result?;
    drop(file);
    let stats = req.stats();
    tracing::info!(
        url = %cli.url,
        path = %cli.filename.display(),
        bytes = stats.read_bytes,
        "fetch finished"
    );
    println!("{}", progress::format_progress(&stats, started.elapsed()));
    Ok(())
}
