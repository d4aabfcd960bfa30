//! Background scan lifecycle.
//!
//! [`ScanOrchestrator`] runs one scan at a time on a dedicated thread:
//!
//! ```text
//! Idle ──start_scan──▶ Scanning ──▶ Completed ──▶ Idle
//!   │                     └──────▶ Cancelled ──▶ Idle
//!   └──invalid root──▶ Failed ──▶ Idle
//! ```
//!
//! A second request while scanning is rejected with [`ScanError::Busy`];
//! an invalid root is rejected before the scan starts. Neither produces a
//! [`ScanHandle`].
//!
//! # Batching
//!
//! Candidates from the [`DirectoryWalker`] are collected into batches of
//! `batch_size`, or whatever arrived within `batch_interval_ms`. Each
//! batch is extracted on a bounded rayon pool and announced with
//! [`ScanEvent::ProjectsFound`] and [`ScanEvent::Progress`]. The interval
//! is checked after every directory visited, so a walk through a large
//! tree with few projects still reports progress at that rate.
//!
//! # Cancellation
//!
//! Cancellation is cooperative. The walker checks the token at every
//! directory pop and the orchestrator checks it before each batch and
//! before committing. A batch already being extracted runs to completion,
//! so the latency is bounded by one batch's extraction. A cancelled scan
//! never writes the cache.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use parking_lot::Mutex;
use prj_core::{ProjectRecord, ScanConfig, ScanPhase};
use rayon::prelude::*;
use rayon::ThreadPool;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::cache::CacheStore;
use crate::collection::MergeSummary;
use crate::error::{Diagnostic, ScanError};
use crate::filter::DirFilter;
use crate::metadata::MetadataExtractor;
use crate::session::{ScanGuard, ScanSession};
use crate::stats::StatsSnapshot;
use crate::walker::{self, Candidate, DirectoryWalker, WalkStep};

/// Summary of a finished scan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanReport {
    /// Canonical scan root.
    pub root: Utf8PathBuf,
    /// Final counters.
    pub stats: StatsSnapshot,
    /// Wall-clock duration in milliseconds.
    pub elapsed_ms: u64,
    /// Per-path problems absorbed during the scan.
    pub diagnostics: Vec<Diagnostic>,
    /// What the commit changed; zero for a cancelled scan.
    pub merge: MergeSummary,
    /// Whether the cache files were written.
    pub persisted: bool,
}

/// How a scan ended.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    /// The walk was exhausted and the result merged.
    Completed(ScanReport),
    /// Cancellation was requested; the cache was not touched.
    Cancelled(ScanReport),
}

impl ScanOutcome {
    /// The report, whichever way the scan ended.
    #[must_use]
    pub const fn report(&self) -> &ScanReport {
        match self {
            Self::Completed(report) | Self::Cancelled(report) => report,
        }
    }

    /// Consumes the outcome, returning the report.
    #[must_use]
    pub fn into_report(self) -> ScanReport {
        match self {
            Self::Completed(report) | Self::Cancelled(report) => report,
        }
    }

    /// Returns `true` for a cancelled scan.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }

    /// The terminal phase this outcome corresponds to.
    #[must_use]
    pub const fn phase(&self) -> ScanPhase {
        match self {
            Self::Completed(_) => ScanPhase::Completed,
            Self::Cancelled(_) => ScanPhase::Cancelled,
        }
    }
}

/// Notification sent while a scan runs.
#[derive(Debug, Clone)]
pub enum ScanEvent {
    /// The worker started walking `root`.
    Started {
        /// Canonical scan root.
        root: Utf8PathBuf,
    },
    /// Counters after a batch, or after `batch_interval_ms` without one.
    Progress(StatsSnapshot),
    /// Freshly extracted records, not yet merged.
    ProjectsFound(Vec<ProjectRecord>),
    /// Always the last event.
    Finished(ScanOutcome),
}

/// Handle to a running scan.
#[derive(Debug)]
pub struct ScanHandle {
    session: ScanSession,
    events: mpsc::UnboundedReceiver<ScanEvent>,
    worker: JoinHandle<ScanOutcome>,
}

impl ScanHandle {
    /// The running session.
    #[must_use]
    pub const fn session(&self) -> &ScanSession {
        &self.session
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.session.cancel();
    }

    /// Event stream; ends after [`ScanEvent::Finished`].
    pub fn events(&mut self) -> &mut mpsc::UnboundedReceiver<ScanEvent> {
        &mut self.events
    }

    /// Blocks until the worker exits.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Worker`] if the worker panicked.
    pub fn wait(self) -> Result<ScanOutcome, ScanError> {
        self.worker
            .join()
            .map_err(|_| ScanError::Worker("scan thread panicked".to_owned()))
    }
}

/// Owns the scan lifecycle and the shared [`CacheStore`].
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
///
/// use camino::Utf8Path;
/// use prj_core::ScanConfig;
/// use prj_scanner::{CacheStore, ScanOrchestrator};
///
/// let (store, _warnings) = CacheStore::open(Utf8Path::new("data"), 20)?;
/// let orchestrator = ScanOrchestrator::new(ScanConfig::default(), Arc::new(store));
///
/// let outcome = orchestrator.scan(Utf8Path::new("/home/me/src"))?;
/// println!("{} projects", outcome.report().stats.projects_found);
/// # Ok::<(), prj_scanner::ScanError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ScanOrchestrator {
    config: ScanConfig,
    store: Arc<CacheStore>,
    active: Arc<AtomicBool>,
    last_phase: Arc<Mutex<ScanPhase>>,
}

impl ScanOrchestrator {
    /// Creates an idle orchestrator.
    #[must_use]
    pub fn new(config: ScanConfig, store: Arc<CacheStore>) -> Self {
        Self {
            config,
            store,
            active: Arc::new(AtomicBool::new(false)),
            last_phase: Arc::new(Mutex::new(ScanPhase::Idle)),
        }
    }

    /// The shared cache.
    #[must_use]
    pub const fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }

    /// Scan settings.
    #[must_use]
    pub const fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Returns `true` while a scan holds the session slot.
    #[must_use]
    pub fn is_scanning(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Current phase: [`ScanPhase::Scanning`] or [`ScanPhase::Idle`].
    #[must_use]
    pub fn phase(&self) -> ScanPhase {
        if self.is_scanning() {
            ScanPhase::Scanning
        } else {
            ScanPhase::Idle
        }
    }

    /// Terminal phase of the most recent request, or
    /// [`ScanPhase::Idle`] if there has been none.
    #[must_use]
    pub fn last_phase(&self) -> ScanPhase {
        *self.last_phase.lock()
    }

    /// Starts a background scan of `root`.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Busy`] if a scan is running, checked first;
    /// [`ScanError::InvalidRoot`] if `root` is not an existing directory;
    /// [`ScanError::Worker`] if the worker thread cannot be spawned.
    pub fn start_scan(&self, root: &Utf8Path) -> Result<ScanHandle, ScanError> {
        let guard = ScanGuard::acquire(&self.active).ok_or(ScanError::Busy)?;

        let root = walker::validate_root(root).inspect_err(|e| {
            warn!(error = %e, "Rejected scan request");
            *self.last_phase.lock() = ScanPhase::Failed;
        })?;

        let session = ScanSession::new(root);
        let (tx, events) = mpsc::unbounded_channel();
        let worker = self.worker(session.clone(), tx);

        let worker = thread::Builder::new()
            .name("prj-scan".to_owned())
            .spawn(move || worker.run(guard))
            .map_err(|e| ScanError::Worker(e.to_string()))?;

        Ok(ScanHandle {
            session,
            events,
            worker,
        })
    }

    /// Runs a scan to completion on the calling thread's behalf.
    ///
    /// # Errors
    ///
    /// Same as [`start_scan`](Self::start_scan), plus
    /// [`ScanError::Worker`] if the worker panicked.
    pub fn scan(&self, root: &Utf8Path) -> Result<ScanOutcome, ScanError> {
        self.start_scan(root)?.wait()
    }

    fn worker(&self, session: ScanSession, events: mpsc::UnboundedSender<ScanEvent>) -> ScanWorker {
        ScanWorker {
            config: self.config.clone(),
            store: Arc::clone(&self.store),
            session,
            events,
            last_phase: Arc::clone(&self.last_phase),
        }
    }
}

/// Everything the worker thread owns.
struct ScanWorker {
    config: ScanConfig,
    store: Arc<CacheStore>,
    session: ScanSession,
    events: mpsc::UnboundedSender<ScanEvent>,
    last_phase: Arc<Mutex<ScanPhase>>,
}

/// Results accumulated across batches.
#[derive(Default)]
struct Accumulator {
    fresh: Vec<ProjectRecord>,
    diagnostics: Vec<Diagnostic>,
}

impl ScanWorker {
    fn emit(&self, event: ScanEvent) {
        // A dropped receiver only means nobody is listening.
        let _ = self.events.send(event);
    }

    fn run(self, guard: ScanGuard) -> ScanOutcome {
        let root = self.session.root().to_owned();
        info!(root = %root, "Starting scan");
        self.emit(ScanEvent::Started { root: root.clone() });

        let pool = build_pool(self.config.max_parallel_jobs);
        let filter = DirFilter::new()
            .with_skip_dirs(&self.config.skip_dirs)
            .with_include_hidden(self.config.include_hidden);
        let extractor = MetadataExtractor::new(filter, self.config.language_sample_depth);
        let mut walker = DirectoryWalker::new(
            &root,
            &self.config,
            self.session.token(),
            self.session.stats(),
        );

        let batch_size = self.config.batch_size.max(1);
        let interval = Duration::from_millis(self.config.batch_interval_ms);
        let mut batch: Vec<Candidate> = Vec::with_capacity(batch_size);
        let mut acc = Accumulator::default();
        let mut last_flush = Instant::now();

        while let Some(step) = walker.next_step() {
            if let WalkStep::Project(candidate) = step {
                batch.push(candidate);
            }
            if batch.len() >= batch_size || last_flush.elapsed() >= interval {
                self.flush(pool.as_ref(), &extractor, &mut batch, &mut acc);
                last_flush = Instant::now();
            }
        }
        self.flush(pool.as_ref(), &extractor, &mut batch, &mut acc);

        let mut diagnostics = walker.take_diagnostics();
        diagnostics.append(&mut acc.diagnostics);

        let mut report = ScanReport {
            root: root.clone(),
            stats: self.session.progress(),
            elapsed_ms: u64::try_from(self.session.elapsed().as_millis()).unwrap_or(u64::MAX),
            diagnostics,
            merge: MergeSummary::default(),
            persisted: false,
        };

        let outcome = if self.session.is_cancelled() {
            info!(
                root = %root,
                projects_found = report.stats.projects_found,
                "Scan cancelled, cache untouched"
            );
            ScanOutcome::Cancelled(report)
        } else {
            match self.store.commit_scan(&root, acc.fresh) {
                Ok(merge) => {
                    report.merge = merge;
                    report.persisted = true;
                }
                Err(e) => error!(root = %root, error = %e, "Failed to save scan results"),
            }
            info!(
                root = %root,
                dirs_visited = report.stats.dirs_visited,
                projects_found = report.stats.projects_found,
                diagnostics = report.diagnostics.len(),
                elapsed_ms = report.elapsed_ms,
                "Scan completed"
            );
            ScanOutcome::Completed(report)
        };

        *self.last_phase.lock() = outcome.phase();
        drop(guard);
        self.emit(ScanEvent::Finished(outcome.clone()));
        outcome
    }

    /// Extracts one batch and reports progress, unless cancellation was
    /// requested. An empty batch only reports progress.
    fn flush(
        &self,
        pool: Option<&ThreadPool>,
        extractor: &MetadataExtractor,
        batch: &mut Vec<Candidate>,
        acc: &mut Accumulator,
    ) {
        if self.session.is_cancelled() {
            batch.clear();
            return;
        }
        if batch.is_empty() {
            self.emit(ScanEvent::Progress(self.session.progress()));
            return;
        }

        let extract = |candidate: &Candidate| {
            let extraction =
                extractor.extract_reporting(&candidate.path, candidate.classification.language);
            (
                ProjectRecord::new(candidate.path.clone(), extraction.facts),
                extraction.diagnostics,
            )
        };
        let results: Vec<_> = match pool {
            Some(pool) => pool.install(|| batch.par_iter().map(extract).collect()),
            None => batch.iter().map(extract).collect(),
        };
        batch.clear();

        let stats = self.session.stats();
        let mut records = Vec::with_capacity(results.len());
        for (record, diagnostics) in results {
            for _ in &diagnostics {
                stats.increment_errors();
            }
            acc.diagnostics.extend(diagnostics);
            records.push(record);
        }

        debug!(count = records.len(), "Extracted batch");
        self.emit(ScanEvent::ProjectsFound(records.clone()));
        self.emit(ScanEvent::Progress(self.session.progress()));
        acc.fresh.extend(records);
    }
}

fn build_pool(jobs: Option<usize>) -> Option<ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(jobs.unwrap_or(0))
        .thread_name(|i| format!("prj-extract-{i}"))
        .build()
        .inspect_err(|e| warn!(error = %e, "Falling back to sequential extraction"))
        .ok()
}
