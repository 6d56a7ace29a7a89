//! Trace ingestion pipeline
//!
//! Routes a request body to the JSON parser or the protobuf decoder plus
//! converter, runs the vendor mappers over the result and hands the batch
//! to a [`SpanSink`].

use std::borrow::Cow;

use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;

use super::convert::convert_trace_request;
use super::encoding::PayloadFormat;
use super::error::{DecodeError, IngestError};
use super::json::{ReaderOptions, parse_export_request_with};
use super::protobuf::decode_trace_request;
use super::sink::SpanSink;
use crate::domain::spans::SpanBatch;
use crate::domain::vendor::VendorRegistry;

/// Stateless apart from its settings; share one instance across threads.
#[derive(Debug)]
pub struct TraceIngestor {
    reader_options: ReaderOptions,
    vendors: VendorRegistry,
}

impl Default for TraceIngestor {
    fn default() -> Self {
        Self::new(ReaderOptions::lenient(), VendorRegistry::with_defaults())
    }
}

impl TraceIngestor {
    pub fn new(reader_options: ReaderOptions, vendors: VendorRegistry) -> Self {
        Self {
            reader_options,
            vendors,
        }
    }

    /// Decode a body by its `Content-Type`. Anything other than OTLP JSON or
    /// protobuf is rejected.
    pub fn ingest(&self, body: &[u8], content_type: &str) -> Result<SpanBatch, DecodeError> {
        let format = PayloadFormat::from_content_type(content_type)
            .ok_or_else(|| DecodeError::UnsupportedContentType(content_type.to_string()))?;
        self.ingest_as(body, format)
    }

    pub fn ingest_as(&self, body: &[u8], format: PayloadFormat) -> Result<SpanBatch, DecodeError> {
        let batch = match format {
            PayloadFormat::Json => {
                SpanBatch::new(parse_export_request_with(body, self.reader_options)?)
            }
            PayloadFormat::Protobuf => {
                let request = decode_trace_request(body)?;
                SpanBatch::new(convert_trace_request(&request))
            }
        };
        Ok(self.apply_vendors(batch))
    }

    /// Requests that arrive already decoded, e.g. from a gRPC service.
    pub fn ingest_request(&self, request: &ExportTraceServiceRequest) -> SpanBatch {
        self.apply_vendors(SpanBatch::new(convert_trace_request(request)))
    }

    /// Decode, map and write to `sink`. Returns the number of spans written.
    pub fn ingest_into(
        &self,
        body: &[u8],
        content_type: &str,
        sink: &dyn SpanSink,
    ) -> Result<usize, IngestError> {
        let batch = self.ingest(body, content_type)?;
        if batch.is_empty() {
            return Ok(0);
        }
        sink.write_batch(&batch)?;
        Ok(batch.len())
    }

    fn apply_vendors(&self, batch: SpanBatch) -> SpanBatch {
        let mapped = match self.vendors.transform_batch(&batch) {
            Cow::Borrowed(_) => None,
            Cow::Owned(mapped) => Some(mapped),
        };
        mapped.unwrap_or(batch)
    }
}
