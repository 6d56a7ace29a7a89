//! OTLP/JSON trace request parser.
//!
//! Walks `resourceSpans -> scopeSpans -> spans` with [`JsonReader`] and feeds
//! every span straight into a [`RowBuilder`], so no intermediate document is
//! materialized.

use std::borrow::Cow;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::Value as JsonValue;

use super::reader::{JsonReader, ReaderOptions, ValueKind, parse_i64};
use crate::domain::Attributes;
use crate::domain::semconv::normalize_attributes;
use crate::domain::spans::{
    RowBuilder, SpanEvent, SpanKind, SpanStorageRow, StatusCode, UNKNOWN_SERVICE, intern,
};
use crate::ingestion::error::DecodeError;
use crate::utils::otlp::{
    SPAN_ID_LEN, TRACE_ID_LEN, double_to_json, id_from_hex, service_name_from,
};

type Result<T> = std::result::Result<T, DecodeError>;

/// Parse an OTLP/JSON `ExportTraceServiceRequest` with lenient tokenizing.
pub fn parse_export_request(body: &[u8]) -> Result<Vec<SpanStorageRow>> {
    parse_export_request_with(body, ReaderOptions::lenient())
}

/// Parse an OTLP/JSON `ExportTraceServiceRequest`.
///
/// Spans without a valid trace id are dropped; any structural error rejects
/// the whole request.
pub fn parse_export_request_with(
    body: &[u8],
    options: ReaderOptions,
) -> Result<Vec<SpanStorageRow>> {
    let mut reader = JsonReader::new(body, options);
    let mut out = Collected::default();

    if reader.peek_kind()? != ValueKind::Object {
        return Err(reader.error("expected a JSON object"));
    }
    reader.begin_object()?;
    while let Some(key) = reader.next_key()? {
        match &*key {
            "resourceSpans" | "resource_spans" => {
                if begin_array_or_null(&mut reader)? {
                    while reader.next_element()? {
                        parse_resource_spans(&mut reader, &mut out)?;
                    }
                }
            }
            _ => reader.skip_value()?,
        }
    }
    reader.finish()?;

    tracing::debug!(
        spans = out.rows.len(),
        dropped = out.dropped,
        "Parsed OTLP/JSON trace request"
    );
    Ok(out.rows)
}

#[derive(Default)]
struct Collected {
    rows: Vec<SpanStorageRow>,
    dropped: usize,
}

// ============================================================================
// RESOURCE / SCOPE
// ============================================================================

fn parse_resource_spans(reader: &mut JsonReader<'_>, out: &mut Collected) -> Result<()> {
    if !begin_object_or_null(reader)? {
        return Ok(());
    }

    // `resource` may follow `scopeSpans`; patch service names once the
    // object is closed.
    let first_row = out.rows.len();
    let mut service_name = None;

    while let Some(key) = reader.next_key()? {
        match &*key {
            "resource" => service_name = parse_resource(reader)?,
            "scopeSpans" | "scope_spans" | "instrumentationLibrarySpans" => {
                if begin_array_or_null(reader)? {
                    while reader.next_element()? {
                        parse_scope_spans(reader, out)?;
                    }
                }
            }
            _ => reader.skip_value()?,
        }
    }

    let service_name = service_name.unwrap_or_else(|| UNKNOWN_SERVICE.to_string());
    for row in &mut out.rows[first_row..] {
        row.service_name.clone_from(&service_name);
    }
    Ok(())
}

/// Returns the resource's `service.name` (first non-empty string wins).
fn parse_resource(reader: &mut JsonReader<'_>) -> Result<Option<String>> {
    let mut service_name = None;
    if !begin_object_or_null(reader)? {
        return Ok(None);
    }
    while let Some(key) = reader.next_key()? {
        match &*key {
            "attributes" => {
                parse_key_values(reader, |key, value| {
                    if service_name.is_none() {
                        service_name = service_name_from(key, value);
                    }
                })?;
            }
            _ => reader.skip_value()?,
        }
    }
    Ok(service_name)
}

fn parse_scope_spans(reader: &mut JsonReader<'_>, out: &mut Collected) -> Result<()> {
    if !begin_object_or_null(reader)? {
        return Ok(());
    }
    while let Some(key) = reader.next_key()? {
        match &*key {
            "spans" => {
                if begin_array_or_null(reader)? {
                    while reader.next_element()? {
                        match parse_span(reader)? {
                            Some(row) => out.rows.push(row),
                            None => out.dropped += 1,
                        }
                    }
                }
            }
            _ => reader.skip_value()?,
        }
    }
    Ok(())
}

// ============================================================================
// SPAN
// ============================================================================

/// Parse one span. `Ok(None)` when it has no usable trace id.
fn parse_span(reader: &mut JsonReader<'_>) -> Result<Option<SpanStorageRow>> {
    if !begin_object_or_null(reader)? {
        return Ok(None);
    }

    let mut builder = RowBuilder::new();
    let mut trace_id = None;

    while let Some(key) = reader.next_key()? {
        match &*key {
            "traceId" | "trace_id" => trace_id = read_id(reader, TRACE_ID_LEN)?,
            "spanId" | "span_id" => {
                builder.row_mut().span_id = read_id(reader, SPAN_ID_LEN)?.unwrap_or_default();
            }
            "parentSpanId" | "parent_span_id" => {
                builder.row_mut().parent_span_id = read_id(reader, SPAN_ID_LEN)?;
            }
            "name" => {
                let name = read_str_or_null(reader)?;
                builder.row_mut().name = intern(name.as_deref().unwrap_or_default());
            }
            "kind" => builder.row_mut().kind = read_kind(reader)?,
            "startTimeUnixNano" | "start_time_unix_nano" => {
                builder.row_mut().start_time_unix_nano = reader.read_u64_lenient()?;
            }
            "endTimeUnixNano" | "end_time_unix_nano" => {
                builder.row_mut().end_time_unix_nano = reader.read_u64_lenient()?;
            }
            "attributes" => {
                parse_key_values(reader, |key, value| builder.attribute(key, value))?;
            }
            "events" => {
                if begin_array_or_null(reader)? {
                    while reader.next_element()? {
                        if let Some(event) = parse_event(reader)? {
                            builder.event(event);
                        }
                    }
                }
            }
            "status" => parse_status(reader, builder.row_mut())?,
            _ => reader.skip_value()?,
        }
    }

    let Some(trace_id) = trace_id else {
        tracing::trace!(offset = reader.offset(), "Dropping span without valid traceId");
        return Ok(None);
    };
    builder.row_mut().trace_id = trace_id;
    Ok(Some(builder.finish()))
}

fn read_id(reader: &mut JsonReader<'_>, len: usize) -> Result<Option<String>> {
    match reader.peek_kind()? {
        ValueKind::String => Ok(id_from_hex(&reader.read_string()?, len)),
        _ => {
            reader.skip_value()?;
            Ok(None)
        }
    }
}

/// Integer kind, or the enum name (`SPAN_KIND_SERVER`).
fn read_kind(reader: &mut JsonReader<'_>) -> Result<SpanKind> {
    match reader.peek_kind()? {
        ValueKind::Number => Ok(match read_enum_number(reader)? {
            Some(value) => SpanKind::from_i32(value),
            None => {
                tracing::trace!("Span kind is not an i32, using unspecified");
                SpanKind::Unspecified
            }
        }),
        ValueKind::String => {
            let text = reader.read_string()?;
            Ok(SpanKind::from_name(&text)
                .or_else(|| text.trim().parse().ok().map(SpanKind::from_i32))
                .unwrap_or_default())
        }
        _ => {
            reader.skip_value()?;
            Ok(SpanKind::Unspecified)
        }
    }
}

/// Integer enum value from a JSON number; `None` outside the `i32` range.
fn read_enum_number(reader: &mut JsonReader<'_>) -> Result<Option<i32>> {
    let text = reader.read_number()?;
    Ok(parse_i64(text).and_then(|value| i32::try_from(value).ok()))
}

fn parse_status(reader: &mut JsonReader<'_>, row: &mut SpanStorageRow) -> Result<()> {
    if !begin_object_or_null(reader)? {
        return Ok(());
    }
    while let Some(key) = reader.next_key()? {
        match &*key {
            "code" => {
                row.status_code = match reader.peek_kind()? {
                    ValueKind::Number => read_enum_number(reader)?
                        .map(StatusCode::from_i32)
                        .unwrap_or_default(),
                    ValueKind::String => {
                        let text = reader.read_string()?;
                        StatusCode::from_name(&text)
                            .or_else(|| text.trim().parse().ok().map(StatusCode::from_i32))
                            .unwrap_or_default()
                    }
                    _ => {
                        reader.skip_value()?;
                        StatusCode::Unset
                    }
                };
            }
            "message" => {
                row.status_message = read_string_or_null(reader)?.filter(|m| !m.is_empty());
            }
            _ => reader.skip_value()?,
        }
    }
    Ok(())
}

fn parse_event(reader: &mut JsonReader<'_>) -> Result<Option<SpanEvent>> {
    if !begin_object_or_null(reader)? {
        return Ok(None);
    }
    let mut event = SpanEvent::default();
    let mut attributes = Attributes::new();
    while let Some(key) = reader.next_key()? {
        match &*key {
            "timeUnixNano" | "time_unix_nano" => event.time_unix_nano = reader.read_u64_lenient()?,
            "name" => event.name = read_string_or_null(reader)?.unwrap_or_default(),
            "attributes" => parse_key_values(reader, |key, value| {
                attributes.insert(key.to_string(), value);
            })?,
            _ => reader.skip_value()?,
        }
    }
    event.attributes = normalize_attributes(attributes);
    Ok(Some(event))
}

// ============================================================================
// ATTRIBUTES / ANY VALUE
// ============================================================================

/// Parse a `KeyValue[]` array, calling `sink` for every entry with a
/// non-empty value.
fn parse_key_values<F>(reader: &mut JsonReader<'_>, mut sink: F) -> Result<()>
where
    F: FnMut(&str, JsonValue),
{
    if !begin_array_or_null(reader)? {
        return Ok(());
    }
    while reader.next_element()? {
        if !begin_object_or_null(reader)? {
            continue;
        }
        let mut key = None;
        let mut value = None;
        while let Some(field) = reader.next_key()? {
            match &*field {
                "key" => key = read_str_or_null(reader)?,
                "value" => value = parse_any_value(reader)?,
                _ => reader.skip_value()?,
            }
        }
        if let (Some(key), Some(value)) = (key, value) {
            sink(key.as_ref(), value);
        }
    }
    Ok(())
}

/// Parse an `AnyValue` object. `None` when no value field is set.
fn parse_any_value(reader: &mut JsonReader<'_>) -> Result<Option<JsonValue>> {
    if !begin_object_or_null(reader)? {
        return Ok(None);
    }
    let mut value = None;
    while let Some(key) = reader.next_key()? {
        if reader.peek_kind()? == ValueKind::Null {
            reader.read_null()?;
            continue;
        }
        match &*key {
            "stringValue" | "string_value" => {
                value = Some(JsonValue::String(reader.read_string()?.into_owned()));
            }
            "boolValue" | "bool_value" => value = Some(JsonValue::Bool(reader.read_bool()?)),
            "intValue" | "int_value" => value = Some(JsonValue::from(reader.read_i64_lenient()?)),
            "doubleValue" | "double_value" => {
                value = Some(double_to_json(reader.read_f64_lenient()?));
            }
            "bytesValue" | "bytes_value" => {
                let encoded = reader.read_string()?;
                let bytes = BASE64
                    .decode(encoded.as_bytes())
                    .map_err(|e| reader.error(format!("invalid base64 in bytesValue: {}", e)))?;
                value = Some(JsonValue::String(hex::encode(bytes)));
            }
            "arrayValue" | "array_value" => {
                let mut items = Vec::new();
                parse_values_wrapper(reader, |r| {
                    items.push(parse_any_value(r)?.unwrap_or(JsonValue::Null));
                    Ok(())
                })?;
                value = Some(JsonValue::Array(items));
            }
            "kvlistValue" | "kvlist_value" => {
                let mut map = Attributes::new();
                parse_values_wrapper(reader, |r| {
                    parse_key_value_entry(r, &mut map)
                })?;
                value = Some(JsonValue::Object(map));
            }
            _ => reader.skip_value()?,
        }
    }
    Ok(value)
}

/// `{"values": [...]}` wrapper used by `arrayValue` and `kvlistValue`.
fn parse_values_wrapper<'a, F>(reader: &mut JsonReader<'a>, mut element: F) -> Result<()>
where
    F: FnMut(&mut JsonReader<'a>) -> Result<()>,
{
    if !begin_object_or_null(reader)? {
        return Ok(());
    }
    while let Some(key) = reader.next_key()? {
        if key == "values" && begin_array_or_null(reader)? {
            while reader.next_element()? {
                element(reader)?;
            }
        } else if key != "values" {
            reader.skip_value()?;
        }
    }
    Ok(())
}

/// One nested `KeyValue`; empty values are skipped.
fn parse_key_value_entry(reader: &mut JsonReader<'_>, map: &mut Attributes) -> Result<()> {
    if !begin_object_or_null(reader)? {
        return Ok(());
    }
    let mut key = None;
    let mut value = None;
    while let Some(field) = reader.next_key()? {
        match &*field {
            "key" => key = read_str_or_null(reader)?,
            "value" => value = parse_any_value(reader)?,
            _ => reader.skip_value()?,
        }
    }
    if let (Some(key), Some(value)) = (key, value) {
        map.insert(key.into_owned(), value);
    }
    Ok(())
}

// ============================================================================
// HELPERS
// ============================================================================

fn read_str_or_null<'a>(reader: &mut JsonReader<'a>) -> Result<Option<Cow<'a, str>>> {
    if reader.peek_kind()? == ValueKind::Null {
        reader.read_null()?;
        return Ok(None);
    }
    reader.read_string().map(Some)
}

fn read_string_or_null(reader: &mut JsonReader<'_>) -> Result<Option<String>> {
    Ok(read_str_or_null(reader)?.map(Cow::into_owned))
}

fn begin_object_or_null(reader: &mut JsonReader<'_>) -> Result<bool> {
    if reader.peek_kind()? == ValueKind::Null {
        reader.read_null()?;
        return Ok(false);
    }
    reader.begin_object()?;
    Ok(true)
}

fn begin_array_or_null(reader: &mut JsonReader<'_>) -> Result<bool> {
    if reader.peek_kind()? == ValueKind::Null {
        reader.read_null()?;
        return Ok(false);
    }
    reader.begin_array()?;
    Ok(true)
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
