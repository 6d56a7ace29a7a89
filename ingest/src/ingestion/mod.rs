//! OTLP trace ingestion: transport decoding, conversion and batch hand-off

pub mod convert;
pub mod encoding;
pub mod error;
pub mod json;
pub mod pipeline;
pub mod protobuf;
pub mod sink;

pub use convert::convert_trace_request;
pub use encoding::{PayloadFormat, decode_request, is_json_content_type, is_protobuf_content_type};
pub use error::{DecodeError, IngestError, SinkError};
pub use json::{ReaderOptions, parse_export_request};
pub use pipeline::TraceIngestor;
pub use protobuf::{decode_trace_request, decode_trace_request_segments};
pub use sink::{JsonLinesSink, SpanSink};
