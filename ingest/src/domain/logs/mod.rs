//! Log records and their source locations

mod record;
mod source_location;

pub use record::LogRecord;
pub use source_location::{
    SourceLocation, SourceLocationResolver, location_from_attributes, parse_stack_trace,
};
