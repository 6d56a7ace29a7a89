//! Span model and attribute promotion

mod intern;
mod model;
mod promote;

pub use intern::intern;
pub use model::{SpanBatch, SpanEvent, SpanKind, SpanStorageRow, StatusCode, UNKNOWN_SERVICE};
pub use promote::RowBuilder;
