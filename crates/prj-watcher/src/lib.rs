//! Keeps the project cache fresh while projects change on disk.
//!
//! [`ProjectWatcher`] watches known project directories with `notify`,
//! debounced through `notify-debouncer-mini`, and streams one
//! [`ProjectChange`] per changed project. [`Rescanner`] turns those changes
//! into scans on a [`ScanOrchestrator`](prj_scanner::ScanOrchestrator),
//! coalescing overlapping roots and retrying while another scan runs.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────── blocking task ────────────────┐
//! │ notify ──▶ debouncer ──▶ ProjectFilter        │
//! │                           │ group by project  │
//! └───────────────────────────┼───────────────────┘
//!                             ▼ mpsc
//!            Rescanner ──▶ RescanQueue ──▶ ScanOrchestrator::start_scan
//!                ▲                                │ Busy
//!                └────────── retry tick ◀─────────┘
//! ```
//!
//! The set of watched projects is fixed when the watcher starts.
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use camino::Utf8Path;
//! use prj_core::{ScanConfig, WatchConfig};
//! use prj_scanner::{CacheStore, ScanOrchestrator};
//! use prj_watcher::{ProjectFilter, ProjectWatcher, Rescanner};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let (store, _) = CacheStore::open(Utf8Path::new("data"), 20)?;
//! let projects: Vec<_> = store.snapshot().iter().map(|r| r.path.clone()).collect();
//! let orchestrator = ScanOrchestrator::new(ScanConfig::default(), Arc::new(store));
//!
//! let config = WatchConfig::default();
//! let filter = ProjectFilter::new(&config.ignore).ignoring("data");
//! let mut watcher = ProjectWatcher::new(projects, &config, filter)?;
//!
//! Rescanner::new(orchestrator, Duration::from_millis(config.debounce_ms))
//!     .run(&mut watcher, CancellationToken::new())
//!     .await;
//! # Ok(())
//! # }
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod error;
pub mod events;
pub mod filter;
pub mod rescan;
pub mod watcher;

pub use error::WatchError;
pub use events::{ProjectChange, ProjectIndex};
pub use filter::{AcceptAllFilter, ChangeFilter, ProjectFilter};
pub use rescan::{RescanQueue, Rescanner, ScanStarter};
pub use watcher::ProjectWatcher;
