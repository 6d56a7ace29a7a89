//! Domain layer: semantic conventions, the span model, vendor dialects and
//! log source locations.

pub mod logs;
pub mod semconv;
pub mod spans;
pub mod vendor;

/// Ordered attribute map shared by spans, events and log records.
pub type Attributes = serde_json::Map<String, serde_json::Value>;
