//! OpenTelemetry semantic conventions
//!
//! - `catalog`: canonical attribute keys and well-known enum values
//! - `normalizer`: deprecated-to-current key rewriting

pub mod catalog;
mod normalizer;

pub use normalizer::{deprecated_mappings, is_deprecated, normalize, normalize_attributes};
