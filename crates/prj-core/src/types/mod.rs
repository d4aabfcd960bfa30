//! Domain types for the prj project browser.
//!
//! # Module Organization
//!
//! - [`project`] - Project records and their scan/user views
//! - [`language`] - Primary language tags
//! - [`version`] - Version strings and semantic version parsing
//! - [`category`] - Predefined categories, suggestion, tag normalisation
//! - [`status`] - Scan lifecycle phase
//!
//! All public types are re-exported here and at the crate root:
//!
//! ```
//! use prj_core::{Language, ProjectRecord, ProjectVersion};
//! ```

pub mod category;
pub mod language;
pub mod project;
pub mod status;
pub mod version;

pub use category::{
    normalize_tag, suggest_category, BuiltinCategory, CategoryDef, DEFAULT_CATEGORY, MAX_TAG_LEN,
    PREDEFINED_CATEGORIES,
};
pub use language::Language;
pub use project::{DependencySummary, ProjectRecord, ScanFacts, UserAnnotations};
pub use status::ScanPhase;
pub use version::{ProjectVersion, SemanticVersion};
