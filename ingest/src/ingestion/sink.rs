//! Batch hand-off to storage

use std::io::Write;

use parking_lot::Mutex;
use serde::Serialize;

use super::error::SinkError;
use crate::domain::spans::{SpanBatch, SpanStorageRow};
use crate::utils::time::nanos_to_rfc3339;

/// Destination for normalized span batches.
pub trait SpanSink: Send + Sync {
    fn write_batch(&self, batch: &SpanBatch) -> Result<(), SinkError>;
}

/// One JSON object per line. Each span is written with a leading RFC 3339
/// `timestamp` taken from its start time.
pub struct JsonLinesSink<W: Write + Send> {
    writer: Mutex<W>,
    pretty: bool,
}

#[derive(Serialize)]
struct Line<'a> {
    timestamp: String,
    #[serde(flatten)]
    span: &'a SpanStorageRow,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            pretty: false,
        }
    }

    /// Indented output, one blank-line separated object per span.
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

/// Serialize `value` as one line (or one indented block) into `out`.
pub(crate) fn write_json_line<W: Write, T: Serialize>(
    out: &mut W,
    value: &T,
    pretty: bool,
) -> Result<(), SinkError> {
    if pretty {
        serde_json::to_writer_pretty(&mut *out, value)?;
    } else {
        serde_json::to_writer(&mut *out, value)?;
    }
    out.write_all(b"\n")?;
    Ok(())
}

impl<W: Write + Send> SpanSink for JsonLinesSink<W> {
    fn write_batch(&self, batch: &SpanBatch) -> Result<(), SinkError> {
        // Serialize outside the lock
        let mut buf = Vec::with_capacity(batch.len() * 512);
        for span in &batch.spans {
            let line = Line {
                timestamp: nanos_to_rfc3339(span.start_time_unix_nano),
                span,
            };
            write_json_line(&mut buf, &line, self.pretty)?;
        }

        let mut writer = self.writer.lock();
        writer.write_all(&buf)?;
        writer.flush()?;
        tracing::trace!(spans = batch.len(), bytes = buf.len(), "Wrote span batch");
        Ok(())
    }
}
