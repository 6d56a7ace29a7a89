//! OTLP/JSON decoding

mod parser;
pub mod reader;

pub use parser::{parse_export_request, parse_export_request_with};
pub use reader::{JsonReader, ReaderOptions};
