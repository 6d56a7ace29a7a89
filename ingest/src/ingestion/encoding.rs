//! OTLP payload encodings
//!
//! OTLP/HTTP carries either protobuf (`application/x-protobuf`) or JSON
//! (`application/json`). Content types are matched case-insensitively and
//! media-type parameters such as `; charset=utf-8` are ignored.

use std::fmt;
use std::str::FromStr;

use prost::Message;
use serde::Deserialize;

use super::error::DecodeError;

pub const PROTOBUF_CONTENT_TYPE: &str = "application/x-protobuf";
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Wire encoding of an OTLP request body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadFormat {
    Protobuf,
    Json,
}

impl PayloadFormat {
    /// Format for a `Content-Type` header value. `None` for anything that is
    /// neither OTLP encoding.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        if is_protobuf_content_type(content_type) {
            Some(Self::Protobuf)
        } else if is_json_content_type(content_type) {
            Some(Self::Json)
        } else {
            None
        }
    }

    /// Guess the format of a body with no content type. A body whose first
    /// non-whitespace byte opens a JSON object is JSON; anything else
    /// (including an empty body) is protobuf.
    pub fn sniff(body: &[u8]) -> Self {
        let body = body.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(body);
        match body.iter().find(|b| !b.is_ascii_whitespace()) {
            Some(b'{') => Self::Json,
            _ => Self::Protobuf,
        }
    }
}

impl fmt::Display for PayloadFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Protobuf => write!(f, "protobuf"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl FromStr for PayloadFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "protobuf" | "proto" | "pb" => Ok(Self::Protobuf),
            "json" => Ok(Self::Json),
            other => Err(format!(
                "Unknown payload format '{}'. Valid options: json, protobuf",
                other
            )),
        }
    }
}

/// Media type without parameters, e.g. `application/json` for
/// `Application/JSON; charset=utf-8`.
fn media_type(content_type: &str) -> &str {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
}

/// True for `application/x-protobuf`, ignoring case and parameters.
pub fn is_protobuf_content_type(content_type: &str) -> bool {
    media_type(content_type).eq_ignore_ascii_case(PROTOBUF_CONTENT_TYPE)
}

/// True for `application/json`, ignoring case and parameters.
pub fn is_json_content_type(content_type: &str) -> bool {
    media_type(content_type).eq_ignore_ascii_case(JSON_CONTENT_TYPE)
}

/// Decode an OTLP request through its generated types, for signals that do
/// not have a dedicated streaming parser.
pub fn decode_request<T>(body: &[u8], format: PayloadFormat) -> Result<T, DecodeError>
where
    T: Message + Default + for<'de> Deserialize<'de>,
{
    match format {
        PayloadFormat::Protobuf => {
            T::decode(body).map_err(|e| DecodeError::Protobuf(e.to_string()))
        }
        PayloadFormat::Json => serde_json::from_slice(body).map_err(|e| DecodeError::Json {
            offset: json_error_offset(body, e.line(), e.column()),
            reason: e.to_string(),
        }),
    }
}

/// Byte offset for a 1-based line/column from `serde_json`.
fn json_error_offset(body: &[u8], line: usize, column: usize) -> usize {
    let line_start: usize = body
        .split_inclusive(|&b| b == b'\n')
        .take(line.saturating_sub(1))
        .map(<[u8]>::len)
        .sum();
    (line_start + column.saturating_sub(1)).min(body.len())
}
