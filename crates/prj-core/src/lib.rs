//! Core types, errors, and configuration for the prj project browser.
//!
//! This crate provides the foundational types used across the workspace:
//!
//! - [`ProjectRecord`] and its two views: scan-derived [`ScanFacts`] and
//!   user-owned [`UserAnnotations`]
//! - [`Language`], [`ProjectVersion`] and [`DependencySummary`]
//! - Predefined project categories and tag normalisation
//! - Configuration structures ([`Config`], [`ScanConfig`], [`StoreConfig`],
//!   [`WatchConfig`])
//! - [`ConfigError`] for configuration failures

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod types;

pub use config::{Config, ScanConfig, StoreConfig, WatchConfig, MIN_DEBOUNCE_MS};
pub use error::ConfigError;
pub use types::{
    normalize_tag, suggest_category, BuiltinCategory, CategoryDef, DependencySummary, Language,
    ProjectRecord, ProjectVersion, ScanFacts, ScanPhase, SemanticVersion, UserAnnotations,
    DEFAULT_CATEGORY, MAX_TAG_LEN, PREDEFINED_CATEGORIES,
};
