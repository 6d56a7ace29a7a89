//! OTLP/Protobuf decoding
//!
//! Decodes `ExportTraceServiceRequest` from the binary wire format, either
//! from one contiguous buffer or from a chunked body without first copying it
//! into one.

use bytes::Buf;
use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;
use prost::Message;

use super::error::DecodeError;

/// Decode a trace export request. Empty input is a valid, empty request.
pub fn decode_trace_request(body: &[u8]) -> Result<ExportTraceServiceRequest, DecodeError> {
    decode_message(body)
}

/// Decode a trace export request split across several buffers.
pub fn decode_trace_request_segments<S: AsRef<[u8]>>(
    segments: &[S],
) -> Result<ExportTraceServiceRequest, DecodeError> {
    decode_message(SegmentedBuf::new(segments))
}

fn decode_message<T, B>(buf: B) -> Result<T, DecodeError>
where
    T: Message + Default,
    B: Buf,
{
    if !buf.has_remaining() {
        return Ok(T::default());
    }
    let len = buf.remaining();
    T::decode(buf).map_err(|e| {
        tracing::debug!(error = %e, bytes = len, "Protobuf decode failed");
        DecodeError::Protobuf(e.to_string())
    })
}

// ============================================================================
// SEGMENTED BUFFER
// ============================================================================

/// Read-only [`Buf`] over a sequence of byte slices.
struct SegmentedBuf<'a, S> {
    segments: &'a [S],
    index: usize,
    offset: usize,
    remaining: usize,
}

impl<'a, S: AsRef<[u8]>> SegmentedBuf<'a, S> {
    fn new(segments: &'a [S]) -> Self {
        let remaining = segments.iter().map(|s| s.as_ref().len()).sum();
        let mut buf = Self {
            segments,
            index: 0,
            offset: 0,
            remaining,
        };
        buf.skip_exhausted();
        buf
    }

    fn skip_exhausted(&mut self) {
        while let Some(segment) = self.segments.get(self.index) {
            if self.offset < segment.as_ref().len() {
                break;
            }
            self.index += 1;
            self.offset = 0;
        }
    }
}

impl<S: AsRef<[u8]>> Buf for SegmentedBuf<'_, S> {
    fn remaining(&self) -> usize {
        self.remaining
    }

    fn chunk(&self) -> &[u8] {
        match self.segments.get(self.index) {
            Some(segment) => &segment.as_ref()[self.offset..],
            None => &[],
        }
    }

    fn advance(&mut self, cnt: usize) {
        let mut cnt = cnt.min(self.remaining);
        self.remaining -= cnt;
        while cnt > 0 {
            let Some(segment) = self.segments.get(self.index) else {
                break;
            };
            let available = segment.as_ref().len() - self.offset;
            if cnt < available {
                self.offset += cnt;
                cnt = 0;
            } else {
                cnt -= available;
                self.index += 1;
                self.offset = 0;
            }
        }
        self.skip_exhausted();
    }
}
