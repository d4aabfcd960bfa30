//! Project discovery engine for the prj project browser.
//!
//! This crate walks a directory tree, recognises project roots, extracts
//! their metadata and dependencies, and reconciles the result with a
//! persistent cache of user annotations.
//!
//! # Overview
//!
//! The main entry point is [`ScanOrchestrator`], which combines:
//!
//! - [`DirectoryWalker`]: depth-bounded traversal that stops at project roots
//! - [`PathClassifier`]: project-root detection and language selection
//! - [`MetadataExtractor`]: per-project facts, extracted in parallel with rayon
//! - [`DependencyInspector`]: manifest parsing for thirteen formats
//! - [`CacheStore`]: the collection plus side tables, persisted atomically
//! - [`ScanStats`]: atomic counters for progress reporting
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use camino::Utf8Path;
//! use prj_core::ScanConfig;
//! use prj_scanner::{CacheStore, ScanEvent, ScanOrchestrator};
//!
//! let (store, _warnings) = CacheStore::open(Utf8Path::new("data"), 20)?;
//! let orchestrator = ScanOrchestrator::new(ScanConfig::default(), Arc::new(store));
//!
//! let mut handle = orchestrator.start_scan(Utf8Path::new("/home/me/src"))?;
//! while let Some(event) = handle.events().blocking_recv() {
//!     if let ScanEvent::Progress(stats) = event {
//!         println!("{} projects so far", stats.projects_found);
//!     }
//! }
//! let outcome = handle.wait()?;
//! println!("added {}", outcome.report().merge.added);
//! # Ok::<(), prj_scanner::ScanError>(())
//! ```
//!
//! # Architecture
//!
//! ```text
//! ScanOrchestrator (one scan at a time, worker thread)
//!     │
//!     ├── DirectoryWalker (explicit stack, cancellation-aware)
//!     │       │
//!     │       └── PathClassifier ── registry (language table)
//!     │
//!     ├── MetadataExtractor (rayon pool, per batch)
//!     │       │
//!     │       ├── version_file readers
//!     │       └── DependencyInspector
//!     │
//!     └── CacheStore (RwLock<Collection> + side tables)
//!             │
//!             └── persist (temp file + rename)
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

mod cache;
mod classifier;
mod collection;
pub mod dependencies;
mod error;
mod filter;
mod metadata;
mod orchestrator;
mod persist;
pub mod registry;
mod session;
pub mod side_tables;
mod stats;
mod version_file;
pub mod walker;

pub use cache::{CacheStore, LoadWarning};
pub use classifier::{Classification, PathClassifier};
pub use collection::{Collection, CollectionSummary, MergeSummary};
pub use dependencies::{DependencyInspector, DependencyStatistics};
pub use error::{Diagnostic, DiagnosticKind, ScanError};
pub use filter::DirFilter;
pub use metadata::{Extraction, MetadataExtractor};
pub use orchestrator::{ScanEvent, ScanHandle, ScanOrchestrator, ScanOutcome, ScanReport};
pub use session::ScanSession;
pub use side_tables::RecentEntry;
pub use stats::{ScanStats, StatsSnapshot};
pub use walker::{Candidate, DirectoryWalker, WalkStep};
