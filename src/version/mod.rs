//! Version-safety evaluation
//!
//! Classifies published versions by release age, overlays vulnerability
//! advisories and selects upgrade targets per major line. The fetch
//! collaborators live here too but the engine modules never call them.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Registry   │────▶│ Quarantine  │────▶│   Overlay   │────▶│  Selection  │
//! │  (fetch)    │     │ (classify)  │     │ (annotate)  │     │ (recommend) │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//!        │                                       ▲
//!        ▼                                       │
//! ┌─────────────┐                         ┌─────────────┐
//! │  TtlCache   │◀────────────────────────│    Audit    │
//! └─────────────┘                         └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`quarantine`]: release-age classification
//! - [`overlay`]: advisory matching, blocking and status helpers
//! - [`range`]: npm range expressions
//! - [`selection`]: best version per major line
//! - [`cache`]: in-memory TTL cache
//! - [`registry`] / [`registries`]: package document fetching
//! - [`audit`]: bulk advisory client
//! - [`error`]: error types for the fetch collaborators
//! - [`semver`]: version string helpers
//! - [`types`]: shared data types

pub mod audit;
pub mod cache;
pub mod error;
pub mod overlay;
pub mod quarantine;
pub mod range;
pub mod registries;
pub mod registry;
pub mod selection;
pub mod semver;
pub mod types;
