//! Attribute promotion shared by the JSON and Protobuf paths.
//!
//! Both transports feed every attribute through [`RowBuilder::attribute`],
//! which normalizes the key, promotes well-known attributes into typed
//! fields, and keeps the rest. Precedence between a current key and its
//! deprecated aliases is decided by rank, so the result does not depend on
//! attribute order.

use std::sync::LazyLock;

use rustc_hash::FxHashMap;
use serde_json::Value as JsonValue;

use super::intern::intern;
use super::model::{SpanEvent, SpanStorageRow, UNKNOWN_SERVICE};
use crate::domain::Attributes;
use crate::domain::semconv::catalog::{self, deprecated, keys};
use crate::domain::semconv::normalize;

// ============================================================================
// PROMOTION TABLE
// ============================================================================

/// Typed fields on [`SpanStorageRow`] that attributes are promoted into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    ProviderName,
    RequestModel,
    ResponseModel,
    OperationName,
    InputTokens,
    OutputTokens,
    TotalTokens,
    Temperature,
    MaxTokens,
    FinishReasons,
    ToolName,
    ToolType,
    ToolCallId,
    ToolCallResult,
    SessionId,
    ConversationId,
    CostUsd,
    ErrorType,
    ExceptionMessage,
    CodeFunctionName,
    CodeFilePath,
    CodeLineNumber,
}

const FIELD_COUNT: usize = Field::CodeLineNumber as usize + 1;

/// Source keys per field, most preferred first. The first key is the
/// current semantic-convention name.
const PROMOTIONS: &[(Field, &[&str])] = &[
    (
        Field::ProviderName,
        &[keys::GEN_AI_PROVIDER_NAME, deprecated::GEN_AI_SYSTEM],
    ),
    (Field::RequestModel, &[keys::GEN_AI_REQUEST_MODEL]),
    (Field::ResponseModel, &[keys::GEN_AI_RESPONSE_MODEL]),
    (Field::OperationName, &[keys::GEN_AI_OPERATION_NAME]),
    (
        Field::InputTokens,
        &[
            keys::GEN_AI_USAGE_INPUT_TOKENS,
            deprecated::GEN_AI_USAGE_PROMPT_TOKENS,
            deprecated::GEN_AI_RESPONSE_PROMPT_TOKENS,
        ],
    ),
    (
        Field::OutputTokens,
        &[
            keys::GEN_AI_USAGE_OUTPUT_TOKENS,
            deprecated::GEN_AI_USAGE_COMPLETION_TOKENS,
            deprecated::GEN_AI_RESPONSE_COMPLETION_TOKENS,
        ],
    ),
    (
        Field::TotalTokens,
        &[
            keys::GEN_AI_USAGE_TOTAL_TOKENS,
            deprecated::LLM_TOKEN_COUNT_TOTAL,
        ],
    ),
    (Field::Temperature, &[keys::GEN_AI_REQUEST_TEMPERATURE]),
    (Field::MaxTokens, &[keys::GEN_AI_REQUEST_MAX_TOKENS]),
    (
        Field::FinishReasons,
        &[
            keys::GEN_AI_RESPONSE_FINISH_REASONS,
            deprecated::GEN_AI_RESPONSE_FINISH_REASON,
        ],
    ),
    (
        Field::ToolName,
        &[keys::GEN_AI_TOOL_NAME, deprecated::AGENTS_TOOL_NAME],
    ),
    (Field::ToolType, &[keys::GEN_AI_TOOL_TYPE]),
    (
        Field::ToolCallId,
        &[keys::GEN_AI_TOOL_CALL_ID, deprecated::AGENTS_TOOL_CALL_ID],
    ),
    (Field::ToolCallResult, &[keys::GEN_AI_TOOL_CALL_RESULT]),
    (Field::SessionId, &[keys::SESSION_ID]),
    (Field::ConversationId, &[keys::GEN_AI_CONVERSATION_ID]),
    (Field::CostUsd, &[keys::GEN_AI_USAGE_COST]),
    (Field::ErrorType, &[keys::ERROR_TYPE]),
    (Field::ExceptionMessage, &[keys::EXCEPTION_MESSAGE]),
    (
        Field::CodeFunctionName,
        &[keys::CODE_FUNCTION_NAME, deprecated::CODE_FUNCTION],
    ),
    (
        Field::CodeFilePath,
        &[keys::CODE_FILE_PATH, deprecated::CODE_FILEPATH],
    ),
    (
        Field::CodeLineNumber,
        &[keys::CODE_LINE_NUMBER, deprecated::CODE_LINENO],
    ),
];

/// Original attribute key -> (field, rank). Lower rank wins.
static PROMOTION_INDEX: LazyLock<FxHashMap<&'static str, (Field, u8)>> = LazyLock::new(|| {
    PROMOTIONS
        .iter()
        .flat_map(|&(field, sources)| {
            sources
                .iter()
                .enumerate()
                .map(move |(rank, &key)| (key, (field, rank as u8)))
        })
        .collect()
});

// ============================================================================
// ROW BUILDER
// ============================================================================

/// Incrementally builds a [`SpanStorageRow`].
///
/// Transports set identity and timing through [`RowBuilder::row_mut`] and feed
/// attributes one at a time; [`RowBuilder::finish`] derives the remaining
/// fields.
#[derive(Debug)]
pub struct RowBuilder {
    row: SpanStorageRow,
    ranks: [u8; FIELD_COUNT],
}

impl Default for RowBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RowBuilder {
    pub fn new() -> Self {
        Self {
            row: SpanStorageRow {
                service_name: UNKNOWN_SERVICE.to_string(),
                ..Default::default()
            },
            ranks: [u8::MAX; FIELD_COUNT],
        }
    }

    /// Rebuild `row` from a full attribute map, as produced by
    /// [`SpanStorageRow::export_attributes`] and possibly rewritten since.
    pub fn rebuild(row: &SpanStorageRow, attributes: Attributes) -> SpanStorageRow {
        let mut builder = Self::new();
        builder.row = SpanStorageRow {
            trace_id: row.trace_id.clone(),
            span_id: row.span_id.clone(),
            parent_span_id: row.parent_span_id.clone(),
            name: row.name.clone(),
            kind: row.kind,
            start_time_unix_nano: row.start_time_unix_nano,
            end_time_unix_nano: row.end_time_unix_nano,
            status_code: row.status_code,
            status_message: row.status_message.clone(),
            service_name: row.service_name.clone(),
            events: row.events.clone(),
            ..Default::default()
        };
        for (key, value) in attributes {
            builder.attribute(&key, value);
        }
        builder.finish()
    }

    /// Identity, timing and status fields.
    pub fn row_mut(&mut self) -> &mut SpanStorageRow {
        &mut self.row
    }

    /// Normalize, then promote or keep one attribute.
    pub fn attribute(&mut self, key: &str, value: JsonValue) {
        if let Some(&(field, rank)) = PROMOTION_INDEX.get(key) {
            let slot = field as usize;
            if rank > self.ranks[slot] {
                // A more specific key already set this field
                return;
            }
            if self.assign(field, &value) {
                self.ranks[slot] = rank;
                return;
            }
        }
        self.keep(key, value);
    }

    pub fn event(&mut self, event: SpanEvent) {
        self.row.events.push(event);
    }

    pub fn finish(mut self) -> SpanStorageRow {
        let row = &mut self.row;
        row.duration_ns = row
            .end_time_unix_nano
            .saturating_sub(row.start_time_unix_nano);

        if row.provider_name.is_none()
            && row.request_model.is_some()
            && let Some(provider) = row
                .attributes
                .get(keys::SERVER_ADDRESS)
                .and_then(JsonValue::as_str)
                .and_then(catalog::provider_for_host)
        {
            tracing::trace!(provider, "Provider detected from server.address");
            row.provider_name = Some(intern(provider));
        }
        self.row
    }

    /// Store an unpromoted value under its normalized key. A value arriving
    /// under the current key replaces one carried over from an alias.
    fn keep(&mut self, key: &str, value: JsonValue) {
        let normalized = normalize(key);
        if normalized == key {
            self.row.attributes.insert(key.to_string(), value);
        } else if !self.row.attributes.contains_key(normalized) {
            self.row.attributes.insert(normalized.to_string(), value);
        }
    }

    /// Coerce `value` into `field`. Returns false when the value has the
    /// wrong shape, leaving the field untouched.
    fn assign(&mut self, field: Field, value: &JsonValue) -> bool {
        let row = &mut self.row;
        match field {
            Field::ProviderName => set(&mut row.provider_name, as_text(value).map(intern)),
            Field::RequestModel => set(&mut row.request_model, as_text(value).map(intern)),
            Field::ResponseModel => set(&mut row.response_model, as_text(value).map(intern)),
            Field::OperationName => set(&mut row.operation_name, as_text(value).map(intern)),
            Field::ToolType => set(&mut row.tool_type, as_text(value).map(intern)),
            Field::InputTokens => set(&mut row.input_tokens, as_i64(value)),
            Field::OutputTokens => set(&mut row.output_tokens, as_i64(value)),
            Field::TotalTokens => set(&mut row.total_tokens, as_i64(value)),
            Field::MaxTokens => set(&mut row.max_tokens, as_i64(value)),
            Field::CodeLineNumber => set(&mut row.code_line_number, as_i64(value)),
            Field::Temperature => set(&mut row.temperature, as_f64(value)),
            Field::CostUsd => set(&mut row.cost_usd, as_f64(value)),
            Field::FinishReasons => set(&mut row.finish_reasons, as_reasons(value)),
            Field::SessionId => set(&mut row.session_id, as_session_id(value)),
            Field::ToolCallResult => set(&mut row.tool_call_result, as_result(value)),
            Field::ToolName => set(&mut row.tool_name, as_owned(value)),
            Field::ToolCallId => set(&mut row.tool_call_id, as_owned(value)),
            Field::ConversationId => set(&mut row.conversation_id, as_owned(value)),
            Field::ErrorType => set(&mut row.error_type, as_owned(value)),
            Field::ExceptionMessage => set(&mut row.exception_message, as_owned(value)),
            Field::CodeFunctionName => set(&mut row.code_function_name, as_owned(value)),
            Field::CodeFilePath => set(&mut row.code_file_path, as_owned(value)),
        }
    }
}

// ============================================================================
// COERCION
// ============================================================================

#[inline]
fn set<T>(slot: &mut Option<T>, value: Option<T>) -> bool {
    match value {
        Some(v) => {
            *slot = Some(v);
            true
        }
        None => false,
    }
}

fn as_text(value: &JsonValue) -> Option<&str> {
    value.as_str().filter(|s| !s.is_empty())
}

fn as_owned(value: &JsonValue) -> Option<String> {
    as_text(value).map(str::to_owned)
}

fn as_i64(value: &JsonValue) -> Option<i64> {
    match value {
        JsonValue::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_f64(value: &JsonValue) -> Option<f64> {
    match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

/// Finish reasons always end up as a JSON array string.
fn as_reasons(value: &JsonValue) -> Option<String> {
    let reasons: Vec<&str> = match value {
        JsonValue::Array(items) => items.iter().filter_map(JsonValue::as_str).collect(),
        JsonValue::String(s) if s.trim_start().starts_with('[') => {
            let parsed: Vec<String> = serde_json::from_str(s).ok()?;
            return serde_json::to_string(&parsed).ok();
        }
        JsonValue::String(s) if !s.is_empty() => vec![s.as_str()],
        _ => return None,
    };
    if reasons.is_empty() {
        return None;
    }
    serde_json::to_string(&reasons).ok()
}

/// Canonical 32-hex form of a GUID session id.
fn as_session_id(value: &JsonValue) -> Option<String> {
    let raw = value.as_str()?.trim();
    uuid::Uuid::parse_str(raw)
        .ok()
        .map(|id| id.simple().to_string())
}

fn as_result(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Null => None,
        JsonValue::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
#[path = "promote_tests.rs"]
mod tests;
