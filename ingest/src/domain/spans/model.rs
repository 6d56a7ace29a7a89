//! Storage-ready span representation shared by every transport.

use std::borrow::Cow;
use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::Value as JsonValue;

use crate::domain::Attributes;
use crate::domain::semconv::catalog::keys;

/// Default `service_name` when the resource does not carry `service.name`.
pub const UNKNOWN_SERVICE: &str = "unknown";

// ============================================================================
// SPAN KIND
// ============================================================================

/// OTLP span kind. Wire values outside 0-5 are kept as `Unknown`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SpanKind {
    #[default]
    Unspecified,
    Internal,
    Server,
    Client,
    Producer,
    Consumer,
    Unknown(i32),
}

impl SpanKind {
    pub fn from_i32(value: i32) -> Self {
        match value {
            0 => Self::Unspecified,
            1 => Self::Internal,
            2 => Self::Server,
            3 => Self::Client,
            4 => Self::Producer,
            5 => Self::Consumer,
            other => Self::Unknown(other),
        }
    }

    /// Parse the protobuf enum name (`SPAN_KIND_SERVER`) or its short form.
    pub fn from_name(name: &str) -> Option<Self> {
        let short = name.strip_prefix("SPAN_KIND_").unwrap_or(name);
        match short.to_ascii_uppercase().as_str() {
            "UNSPECIFIED" => Some(Self::Unspecified),
            "INTERNAL" => Some(Self::Internal),
            "SERVER" => Some(Self::Server),
            "CLIENT" => Some(Self::Client),
            "PRODUCER" => Some(Self::Producer),
            "CONSUMER" => Some(Self::Consumer),
            _ => None,
        }
    }

    pub fn as_i32(self) -> i32 {
        match self {
            Self::Unspecified => 0,
            Self::Internal => 1,
            Self::Server => 2,
            Self::Client => 3,
            Self::Producer => 4,
            Self::Consumer => 5,
            Self::Unknown(v) => v,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unspecified => "UNSPECIFIED",
            Self::Internal => "INTERNAL",
            Self::Server => "SERVER",
            Self::Client => "CLIENT",
            Self::Producer => "PRODUCER",
            Self::Consumer => "CONSUMER",
            Self::Unknown(_) => "UNKNOWN",
        }
    }
}

impl fmt::Display for SpanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(v) => write!(f, "UNKNOWN({})", v),
            other => f.write_str(other.as_str()),
        }
    }
}

// Serialized as the wire integer so unknown kinds survive a round trip
impl Serialize for SpanKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.as_i32())
    }
}

// ============================================================================
// STATUS CODE
// ============================================================================

/// OTLP status code. Out-of-range wire values map to `Unset`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StatusCode {
    #[default]
    Unset,
    Ok,
    Error,
}

impl StatusCode {
    pub fn from_i32(value: i32) -> Self {
        match value {
            1 => Self::Ok,
            2 => Self::Error,
            _ => Self::Unset,
        }
    }

    /// Parse `STATUS_CODE_ERROR` or `ERROR` (any case).
    pub fn from_name(name: &str) -> Option<Self> {
        let short = name.strip_prefix("STATUS_CODE_").unwrap_or(name);
        match short.to_ascii_uppercase().as_str() {
            "UNSET" => Some(Self::Unset),
            "OK" => Some(Self::Ok),
            "ERROR" => Some(Self::Error),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unset => "UNSET",
            Self::Ok => "OK",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SPAN ROW
// ============================================================================

/// A timestamped annotation on a span.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SpanEvent {
    pub time_unix_nano: u64,
    pub name: String,
    #[serde(skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
}

/// One normalized span, ready for storage.
///
/// Well-known GenAI and source-code attributes are promoted into typed fields
/// and removed from `attributes`; everything else stays in `attributes` under
/// its normalized key.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SpanStorageRow {
    pub trace_id: String,
    pub span_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_span_id: Option<String>,
    pub name: Cow<'static, str>,
    pub kind: SpanKind,
    pub start_time_unix_nano: u64,
    pub end_time_unix_nano: u64,
    pub duration_ns: u64,
    pub status_code: StatusCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    pub service_name: String,

    // GenAI
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_name: Option<Cow<'static, str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_model: Option<Cow<'static, str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_model: Option<Cow<'static, str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<Cow<'static, str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_tokens: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_tokens: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<i64>,
    /// JSON array string, e.g. `["stop"]`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reasons: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_type: Option<Cow<'static, str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_result: Option<String>,
    /// 32 lowercase hex chars, hyphens stripped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_usd: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception_message: Option<String>,

    // Source code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_function_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_line_number: Option<i64>,

    pub attributes: Attributes,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<SpanEvent>,
}

impl SpanStorageRow {
    /// Duration in whole milliseconds.
    #[inline]
    pub fn duration_ms(&self) -> u64 {
        self.duration_ns / 1_000_000
    }

    /// Attributes with every promoted field written back under its current
    /// key. Feeding the result through promotion again yields this row.
    pub fn export_attributes(&self) -> Attributes {
        let mut out = Attributes::with_capacity(self.attributes.len() + 8);

        let mut put_str = |key: &str, value: Option<&str>| {
            if let Some(v) = value {
                out.insert(key.to_string(), JsonValue::from(v));
            }
        };
        put_str(keys::GEN_AI_PROVIDER_NAME, self.provider_name.as_deref());
        put_str(keys::GEN_AI_REQUEST_MODEL, self.request_model.as_deref());
        put_str(keys::GEN_AI_RESPONSE_MODEL, self.response_model.as_deref());
        put_str(keys::GEN_AI_OPERATION_NAME, self.operation_name.as_deref());
        put_str(keys::GEN_AI_TOOL_NAME, self.tool_name.as_deref());
        put_str(keys::GEN_AI_TOOL_TYPE, self.tool_type.as_deref());
        put_str(keys::GEN_AI_TOOL_CALL_ID, self.tool_call_id.as_deref());
        put_str(keys::GEN_AI_TOOL_CALL_RESULT, self.tool_call_result.as_deref());
        put_str(keys::SESSION_ID, self.session_id.as_deref());
        put_str(keys::GEN_AI_CONVERSATION_ID, self.conversation_id.as_deref());
        put_str(keys::ERROR_TYPE, self.error_type.as_deref());
        put_str(keys::EXCEPTION_MESSAGE, self.exception_message.as_deref());
        put_str(keys::CODE_FUNCTION_NAME, self.code_function_name.as_deref());
        put_str(keys::CODE_FILE_PATH, self.code_file_path.as_deref());

        let ints = [
            (keys::GEN_AI_USAGE_INPUT_TOKENS, self.input_tokens),
            (keys::GEN_AI_USAGE_OUTPUT_TOKENS, self.output_tokens),
            (keys::GEN_AI_USAGE_TOTAL_TOKENS, self.total_tokens),
            (keys::GEN_AI_REQUEST_MAX_TOKENS, self.max_tokens),
            (keys::CODE_LINE_NUMBER, self.code_line_number),
        ];
        for (key, value) in ints {
            if let Some(v) = value {
                out.insert(key.to_string(), JsonValue::from(v));
            }
        }

        let floats = [
            (keys::GEN_AI_REQUEST_TEMPERATURE, self.temperature),
            (keys::GEN_AI_USAGE_COST, self.cost_usd),
        ];
        for (key, value) in floats {
            if let Some(n) = value.and_then(serde_json::Number::from_f64) {
                out.insert(key.to_string(), JsonValue::Number(n));
            }
        }

        if let Some(reasons) = &self.finish_reasons {
            let value = serde_json::from_str::<JsonValue>(reasons)
                .unwrap_or_else(|_| JsonValue::from(reasons.as_str()));
            out.insert(keys::GEN_AI_RESPONSE_FINISH_REASONS.to_string(), value);
        }

        for (key, value) in &self.attributes {
            out.entry(key.clone()).or_insert_with(|| value.clone());
        }
        out
    }
}

/// Ordered spans from one export request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SpanBatch {
    pub spans: Vec<SpanStorageRow>,
}

impl SpanBatch {
    pub fn new(spans: Vec<SpanStorageRow>) -> Self {
        Self { spans }
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }
}

impl From<Vec<SpanStorageRow>> for SpanBatch {
    fn from(spans: Vec<SpanStorageRow>) -> Self {
        Self { spans }
    }
}
