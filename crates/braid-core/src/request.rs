//! Fetch coordinator.
//!
//! Opens the destination, probes the length with HEAD, plans one range per
//! job, runs one worker thread per range and folds their failures into a single
//! error once every worker has finished.

use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::mpsc;
use std::sync::{Mutex, PoisonError};
use std::thread;

use crate::config::BraidConfig;
use crate::control::CancelToken;
use crate::diagnostics::Diagnostics;
use crate::error::{FetchError, RangeError, RangeFailure, RangeFailures};
use crate::fetch_head;
use crate::http::HttpOptions;
use crate::segmenter::{plan_ranges, ByteRange};
use crate::stats::{Stat, StatsRegistry};
use crate::storage::OutputFileBuilder;
use crate::worker::{fetch_range, RangeJob};

/// Number of parallel range requests used unless configured otherwise.
pub const DEFAULT_JOBS: usize = 5;

/// Where a fetch currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchPhase {
    #[default]
    Idle,
    /// Opening the file, probing the length and planning ranges.
    Planning,
    /// Starting worker threads.
    Dispatching,
    /// All workers started; waiting for them to finish.
    Awaiting,
    Succeeded,
    /// At least one worker failed. Terminal; nothing is retried.
    PartiallyFailed,
    /// Failed before any worker was started.
    Failed,
}

/// A parallel fetch of one HTTP resource.
///
/// Configure with the `set_*` methods, then call [`fetch_file`](Self::fetch_file).
/// [`stats`](Self::stats) and [`phase`](Self::phase) may be called from any
/// thread while a fetch runs.
#[derive(Debug)]
pub struct Request {
    jobs: usize,
    user_agent: Option<String>,
    http: HttpOptions,
    preallocate: bool,
    diagnostics: Diagnostics,
    stats: StatsRegistry,
    phase: Mutex<FetchPhase>,
}

impl Default for Request {
    fn default() -> Self {
        Self::new()
    }
}

impl Request {
    pub fn new() -> Self {
        Self {
            jobs: DEFAULT_JOBS,
            user_agent: None,
            http: HttpOptions::default(),
            preallocate: false,
            diagnostics: Diagnostics::default(),
            stats: StatsRegistry::new(),
            phase: Mutex::new(FetchPhase::Idle),
        }
    }

    /// Request with jobs, user agent, HTTP options and preallocation taken from `cfg`.
    pub fn from_config(cfg: &BraidConfig) -> Self {
        let mut req = Self::new();
        req.set_jobs(cfg.jobs);
        if let Some(ua) = &cfg.user_agent {
            req.set_user_agent(ua.clone());
        }
        req.set_http_options(cfg.http_options());
        req.set_preallocate(cfg.preallocate);
        req
    }

    /// Number of parallel range requests. Zero is treated as one.
    pub fn set_jobs(&mut self, jobs: usize) {
        self.jobs = jobs;
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// `User-Agent` header sent with the HEAD and every GET. An empty string
    /// keeps curl's default.
    pub fn set_user_agent(&mut self, user_agent: impl Into<String>) {
        let ua = user_agent.into();
        self.user_agent = if ua.is_empty() { None } else { Some(ua) };
    }

    pub fn set_http_options(&mut self, http: HttpOptions) {
        self.http = http;
    }

    /// Reserve the full length on disk before workers start.
    pub fn set_preallocate(&mut self, preallocate: bool) {
        self.preallocate = preallocate;
    }

    /// Install a diagnostic sink. Lines are prefixed with `braid: `.
    /// Without a sink nothing is emitted.
    pub fn set_log_sink<F>(&mut self, sink: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.diagnostics = Diagnostics::new(sink);
    }

    /// Totals summed across all workers. Zero before a fetch starts.
    pub fn stats(&self) -> Stat {
        self.stats.snapshot()
    }

    pub fn per_worker_stats(&self) -> Vec<Stat> {
        self.stats.per_worker()
    }

    pub fn phase(&self) -> FetchPhase {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_phase(&self, phase: FetchPhase) {
        tracing::debug!(?phase, "fetch phase");
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner) = phase;
    }

    /// Fetch `url` into `filename` using parallel range requests.
    ///
    /// The file is created if missing and truncated. On success the open file
    /// is returned; closing it (dropping it) is the caller's business. When some
    /// ranges fail, every worker still runs to completion and the file comes
    /// back inside [`FetchError::Partial`].
    pub fn fetch_file(
        &self,
        cancel: &CancelToken,
        url: &str,
        filename: impl AsRef<Path>,
    ) -> Result<File, FetchError> {
        self.set_phase(FetchPhase::Planning);
        let result = self.run(cancel, url, filename.as_ref());
        self.set_phase(match &result {
            Ok(_) => FetchPhase::Succeeded,
            Err(FetchError::Partial { .. }) => FetchPhase::PartiallyFailed,
            Err(_) => FetchPhase::Failed,
        });
        result
    }

    fn run(&self, cancel: &CancelToken, url: &str, path: &Path) -> Result<File, FetchError> {
        // Stats describe the current fetch only, even when it fails early.
        self.stats.reset(&[]);
        let mut builder = OutputFileBuilder::create(path).map_err(|source| FetchError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        validate_url(url)?;
        let head = fetch_head::probe(url, self.user_agent.as_deref(), &self.http, cancel)?;
        let content_length = head.content_length;
        tracing::debug!(url, content_length, accept_ranges = head.accept_ranges, "HEAD ok");

        let jobs = self.jobs.max(1);
        let ranges = plan_ranges(content_length, jobs);
        let slots = self.stats.reset(&ranges);

        if self.preallocate {
            builder
                .preallocate(content_length)
                .map_err(|source| FetchError::Preallocate {
                    path: path.to_path_buf(),
                    source,
                })?;
        }
        let shared = builder.build();

        self.diagnostics.emit(format_args!("fetching {}", url));
        self.diagnostics.emit(format_args!("launching {} jobs", jobs));
        tracing::info!(url, jobs, content_length, "fetch started");

        self.set_phase(FetchPhase::Dispatching);
        let (tx, rx) = mpsc::channel::<(usize, RangeError)>();
        let mut failures = RangeFailures::default();

        thread::scope(|scope| {
            let mut handles = Vec::with_capacity(ranges.len());
            for (index, (range, stat)) in ranges.iter().copied().zip(slots).enumerate() {
                let job = RangeJob {
                    url,
                    user_agent: self.user_agent.as_deref(),
                    http: &self.http,
                    range,
                    content_length,
                    file: shared.clone(),
                    stat,
                    cancel: cancel.clone(),
                };
                let worker_tx = tx.clone();
                let spawned = thread::Builder::new()
                    .name(format!("braid-range-{}", index))
                    .spawn_scoped(scope, move || {
                        if let Err(e) = fetch_range(job) {
                            let _ = worker_tx.send((index, e));
                        }
                    });
                match spawned {
                    Ok(handle) => handles.push((index, handle)),
                    Err(e) => {
                        self.record_failure(&mut failures, index, range, spawn_failure(&e));
                    }
                }
            }
            drop(tx);
            self.set_phase(FetchPhase::Awaiting);

            // Ends once every worker has dropped its sender, i.e. finished.
            for (index, error) in rx.iter() {
                self.record_failure(&mut failures, index, ranges[index], error);
            }
            for (index, handle) in handles {
                if let Err(panic) = handle.join() {
                    let error = RangeError::Panicked(panic_message(panic.as_ref()));
                    self.record_failure(&mut failures, index, ranges[index], error);
                }
            }
        });

        let file = shared.into_file().map_err(|source| FetchError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        let total = self.stats();
        if failures.is_empty() {
            tracing::info!(read = total.read_bytes, "fetch complete");
            Ok(file)
        } else {
            tracing::warn!(
                failed = failures.len(),
                read = total.read_bytes,
                total = total.total_bytes,
                "fetch finished with failed ranges"
            );
            Err(FetchError::Partial { file, failures })
        }
    }

    fn record_failure(
        &self,
        failures: &mut RangeFailures,
        index: usize,
        range: ByteRange,
        error: RangeError,
    ) {
        tracing::warn!(worker = index, %range, %error, "range failed");
        self.diagnostics
            .emit(format_args!("range {} {} failed: {}", index, range, error));
        failures.push(RangeFailure {
            index,
            range,
            error,
        });
    }
}

fn validate_url(raw: &str) -> Result<(), FetchError> {
    let parsed = url::Url::parse(raw).map_err(|source| FetchError::InvalidUrl {
        url: raw.to_string(),
        source,
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(FetchError::UnsupportedScheme(other.to_string())),
    }
}

fn spawn_failure(err: &io::Error) -> RangeError {
    RangeError::Panicked(format!("cannot spawn worker: {}", err))
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}
