//! OTLP proto graph to storage rows
//!
//! Used for OTLP/HTTP protobuf bodies and for requests delivered by a gRPC
//! stack. Attributes go through the same [`RowBuilder`] as the JSON parser.

use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;
use opentelemetry_proto::tonic::trace::v1::Span;
use opentelemetry_proto::tonic::trace::v1::span::Event;

use crate::domain::semconv::normalize_attributes;
use crate::domain::spans::{
    RowBuilder, SpanEvent, SpanKind, SpanStorageRow, StatusCode, UNKNOWN_SERVICE, intern,
};
use crate::utils::otlp::{
    SPAN_ID_LEN, TRACE_ID_LEN, any_value_to_json, build_attributes, id_from_bytes,
    resource_service_name,
};

/// Convert every span in the request, in `resource -> scope -> span` order.
/// Spans without a valid trace id are dropped.
pub fn convert_trace_request(request: &ExportTraceServiceRequest) -> Vec<SpanStorageRow> {
    let capacity = request
        .resource_spans
        .iter()
        .flat_map(|rs| &rs.scope_spans)
        .map(|ss| ss.spans.len())
        .sum();
    let mut rows = Vec::with_capacity(capacity);
    let mut dropped = 0usize;

    for resource_spans in &request.resource_spans {
        let service_name = resource_service_name(resource_spans.resource.as_ref())
            .unwrap_or_else(|| UNKNOWN_SERVICE.to_string());

        for scope_spans in &resource_spans.scope_spans {
            for span in &scope_spans.spans {
                match convert_span(span, &service_name) {
                    Some(row) => rows.push(row),
                    None => dropped += 1,
                }
            }
        }
    }

    tracing::debug!(
        spans = rows.len(),
        dropped,
        "Converted OTLP trace request"
    );
    rows
}

fn convert_span(span: &Span, service_name: &str) -> Option<SpanStorageRow> {
    let Some(trace_id) = id_from_bytes(&span.trace_id, TRACE_ID_LEN) else {
        tracing::trace!(
            trace_id_len = span.trace_id.len(),
            "Dropping span without valid traceId"
        );
        return None;
    };

    let mut builder = RowBuilder::new();
    {
        let row = builder.row_mut();
        row.trace_id = trace_id;
        row.span_id = id_from_bytes(&span.span_id, SPAN_ID_LEN).unwrap_or_default();
        row.parent_span_id = id_from_bytes(&span.parent_span_id, SPAN_ID_LEN);
        row.name = intern(&span.name);
        row.kind = SpanKind::from_i32(span.kind);
        row.start_time_unix_nano = span.start_time_unix_nano;
        row.end_time_unix_nano = span.end_time_unix_nano;
        row.service_name = service_name.to_string();
        if let Some(status) = &span.status {
            row.status_code = StatusCode::from_i32(status.code);
            row.status_message = Some(status.message.clone()).filter(|m| !m.is_empty());
        }
    }

    for kv in &span.attributes {
        if let Some(value) = kv.value.as_ref().and_then(any_value_to_json) {
            builder.attribute(&kv.key, value);
        }
    }
    for event in &span.events {
        builder.event(convert_event(event));
    }

    Some(builder.finish())
}

fn convert_event(event: &Event) -> SpanEvent {
    SpanEvent {
        time_unix_nano: event.time_unix_nano,
        name: event.name.clone(),
        attributes: normalize_attributes(build_attributes(&event.attributes)),
    }
}
