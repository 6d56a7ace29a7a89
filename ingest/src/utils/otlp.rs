//! OTLP utility functions
//!
//! Conversions between the generated OTLP protobuf types and JSON values,
//! plus trace/span identifier validation shared by both transports.

use opentelemetry_proto::tonic::common::v1::{AnyValue, KeyValue, any_value};
use opentelemetry_proto::tonic::resource::v1::Resource;
use serde_json::Value as JsonValue;

use crate::domain::Attributes;
use crate::domain::semconv::catalog::keys;

pub const TRACE_ID_LEN: usize = 16;
pub const SPAN_ID_LEN: usize = 8;

// ============================================================================
// IDENTIFIERS
// ============================================================================

/// Hex-encode a binary id. `None` unless it is exactly `len` bytes and not
/// all zeros.
pub fn id_from_bytes(bytes: &[u8], len: usize) -> Option<String> {
    if bytes.len() != len || bytes.iter().all(|&b| b == 0) {
        return None;
    }
    Some(hex::encode(bytes))
}

/// Validate a hex id from OTLP/JSON and return it lowercased. `None` unless
/// it decodes to exactly `len` bytes and is not all zeros.
pub fn id_from_hex(text: &str, len: usize) -> Option<String> {
    if text.len() != len * 2 || !text.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    if text.bytes().all(|b| b == b'0') {
        return None;
    }
    Some(text.to_ascii_lowercase())
}

// ============================================================================
// VALUE CONVERSION
// ============================================================================

/// Convert AnyValue to JSON (preserves native types). Returns `None` for an
/// empty value; inside arrays an empty value becomes `null` so positions are
/// kept.
pub fn any_value_to_json(value: &AnyValue) -> Option<JsonValue> {
    let json = match value.value.as_ref()? {
        any_value::Value::StringValue(s) => JsonValue::from(s.as_str()),
        any_value::Value::BoolValue(b) => JsonValue::from(*b),
        any_value::Value::IntValue(i) => JsonValue::from(*i),
        any_value::Value::DoubleValue(d) => double_to_json(*d),
        any_value::Value::ArrayValue(arr) => JsonValue::Array(
            arr.values
                .iter()
                .map(|v| any_value_to_json(v).unwrap_or(JsonValue::Null))
                .collect(),
        ),
        any_value::Value::KvlistValue(kvlist) => JsonValue::Object(build_attributes(&kvlist.values)),
        any_value::Value::BytesValue(b) => JsonValue::from(hex::encode(b)),
    };
    Some(json)
}

/// JSON has no NaN/Infinity; those are carried as strings.
pub fn double_to_json(value: f64) -> JsonValue {
    serde_json::Number::from_f64(value)
        .map(JsonValue::Number)
        .unwrap_or_else(|| JsonValue::from(value.to_string()))
}

/// Build an attribute map from KeyValues, skipping empty values
pub fn build_attributes(attrs: &[KeyValue]) -> Attributes {
    attrs
        .iter()
        .filter_map(|kv| {
            kv.value
                .as_ref()
                .and_then(any_value_to_json)
                .map(|v| (kv.key.clone(), v))
        })
        .collect()
}

/// Service name carried by one resource attribute: the value of a
/// `service.name` key when it is a non-empty string. Both transports apply
/// this to resource attributes in order and keep the first hit.
pub fn service_name_from(key: &str, value: JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) if key == keys::SERVICE_NAME && !s.is_empty() => Some(s),
        _ => None,
    }
}

/// `service.name` from a protobuf resource (first non-empty string wins).
pub fn resource_service_name(resource: Option<&Resource>) -> Option<String> {
    resource?
        .attributes
        .iter()
        .filter(|kv| kv.key == keys::SERVICE_NAME)
        .find_map(|kv| {
            let value = kv.value.as_ref().and_then(any_value_to_json)?;
            service_name_from(&kv.key, value)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry_proto::tonic::common::v1::{ArrayValue, KeyValueList};

    fn string_value(s: &str) -> AnyValue {
        AnyValue {
            value: Some(any_value::Value::StringValue(s.to_string())),
        }
    }

    fn kv(key: &str, value: AnyValue) -> KeyValue {
        KeyValue {
            key: key.to_string(),
            value: Some(value),
        }
    }

    #[test]
    fn test_id_from_bytes() {
        assert_eq!(
            id_from_bytes(&[0xab; 16], TRACE_ID_LEN).as_deref(),
            Some("abababababababababababababababab")
        );
        assert_eq!(id_from_bytes(&[0; 16], TRACE_ID_LEN), None);
        assert_eq!(id_from_bytes(&[1; 8], TRACE_ID_LEN), None);
        assert_eq!(id_from_bytes(&[], SPAN_ID_LEN), None);
    }

    #[test]
    fn test_id_from_hex() {
        assert_eq!(
            id_from_hex("0AF7651916CD43DD8448EB211C80319C", TRACE_ID_LEN).as_deref(),
            Some("0af7651916cd43dd8448eb211c80319c")
        );
        assert_eq!(id_from_hex("00000000000000000000000000000000", TRACE_ID_LEN), None);
        assert_eq!(id_from_hex("b7ad6b716920333", SPAN_ID_LEN), None);
        assert_eq!(id_from_hex("zzad6b7169203331", SPAN_ID_LEN), None);
    }

    #[test]
    fn test_any_value_to_json_scalars() {
        assert_eq!(any_value_to_json(&string_value("x")), Some(JsonValue::from("x")));
        let int = AnyValue {
            value: Some(any_value::Value::IntValue(-3)),
        };
        assert_eq!(any_value_to_json(&int), Some(JsonValue::from(-3)));
        let bytes = AnyValue {
            value: Some(any_value::Value::BytesValue(vec![0xde, 0xad])),
        };
        assert_eq!(any_value_to_json(&bytes), Some(JsonValue::from("dead")));
        assert_eq!(any_value_to_json(&AnyValue { value: None }), None);
    }

    #[test]
    fn test_any_value_to_json_nested() {
        let value = AnyValue {
            value: Some(any_value::Value::KvlistValue(KeyValueList {
                values: vec![
                    kv("a", string_value("1")),
                    kv(
                        "b",
                        AnyValue {
                            value: Some(any_value::Value::ArrayValue(ArrayValue {
                                values: vec![string_value("x"), AnyValue { value: None }],
                            })),
                        },
                    ),
                    kv("empty", AnyValue { value: None }),
                ],
            })),
        };
        assert_eq!(
            any_value_to_json(&value),
            Some(serde_json::json!({"a": "1", "b": ["x", null]}))
        );
    }

    #[test]
    fn test_double_to_json_non_finite() {
        assert_eq!(double_to_json(1.5), JsonValue::from(1.5));
        assert_eq!(double_to_json(f64::NAN), JsonValue::from("NaN"));
        assert_eq!(double_to_json(f64::INFINITY), JsonValue::from("inf"));
    }

    #[test]
    fn test_resource_service_name() {
        let resource = Resource {
            attributes: vec![kv("service.name", string_value("checkout"))],
            ..Default::default()
        };
        assert_eq!(
            resource_service_name(Some(&resource)).as_deref(),
            Some("checkout")
        );
        assert_eq!(resource_service_name(None), None);
        assert_eq!(resource_service_name(Some(&Resource::default())), None);
    }

    #[test]
    fn test_resource_service_name_skips_empty_and_non_string() {
        let resource = Resource {
            attributes: vec![
                kv("service.name", string_value("")),
                kv(
                    "service.name",
                    AnyValue {
                        value: Some(any_value::Value::IntValue(7)),
                    },
                ),
                kv("service.name", string_value("real")),
                kv("service.name", string_value("later")),
            ],
            ..Default::default()
        };
        assert_eq!(resource_service_name(Some(&resource)).as_deref(), Some("real"));
    }

    #[test]
    fn test_service_name_from() {
        assert_eq!(
            service_name_from("service.name", JsonValue::from("api")).as_deref(),
            Some("api")
        );
        assert_eq!(service_name_from("service.name", JsonValue::from("")), None);
        assert_eq!(service_name_from("service.name", JsonValue::from(3)), None);
        assert_eq!(service_name_from("service.namespace", JsonValue::from("api")), None);
    }
}
