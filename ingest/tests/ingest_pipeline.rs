//! End-to-end ingestion through the public API

use std::borrow::Cow;

use opentelemetry_proto::tonic::collector::logs::v1::ExportLogsServiceRequest;
use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;
use opentelemetry_proto::tonic::common::v1::{
    AnyValue, ArrayValue, KeyValue, KeyValueList, any_value,
};
use opentelemetry_proto::tonic::logs::v1::{LogRecord as OtlpLogRecord, ResourceLogs, ScopeLogs};
use opentelemetry_proto::tonic::resource::v1::Resource;
use opentelemetry_proto::tonic::trace::v1::span::Event;
use opentelemetry_proto::tonic::trace::v1::{ResourceSpans, ScopeSpans, Span, Status};
use prost::Message;
use serde_json::json;

use otlp_ingest::domain::logs::{LogRecord, SourceLocationResolver};
use otlp_ingest::domain::spans::{SpanBatch, StatusCode};
use otlp_ingest::domain::vendor::VendorRegistry;
use otlp_ingest::ingestion::{
    JsonLinesSink, PayloadFormat, ReaderOptions, TraceIngestor, convert_trace_request,
    decode_request, decode_trace_request, parse_export_request,
};

const TRACE_ID: [u8; 16] = [
    0x0a, 0xf7, 0x65, 0x19, 0x16, 0xcd, 0x43, 0xdd, 0x84, 0x48, 0xeb, 0x21, 0x1c, 0x80, 0x31, 0x9c,
];
const SPAN_ID: [u8; 8] = [0xb7, 0xad, 0x6b, 0x71, 0x69, 0x20, 0x33, 0x31];
const PARENT_ID: [u8; 8] = [0x00, 0xf0, 0x67, 0xaa, 0x0b, 0xa9, 0x02, 0xb7];

const CHAT_JSON: &str = r#"{
  "resourceSpans": [{
    "resource": {"attributes": [{"key": "service.name", "value": {"stringValue": "chat-api"}}]},
    "scopeSpans": [{
      "spans": [{
        "traceId": "0af7651916cd43dd8448eb211c80319c",
        "spanId": "b7ad6b7169203331",
        "name": "chat gpt-4",
        "kind": 3,
        "startTimeUnixNano": "1700000000000000000",
        "endTimeUnixNano": "1700000000100000000",
        "attributes": [
          {"key": "gen_ai.system", "value": {"stringValue": "openai"}},
          {"key": "gen_ai.request.model", "value": {"stringValue": "gpt-4"}},
          {"key": "gen_ai.usage.input_tokens", "value": {"intValue": "150"}},
          {"key": "gen_ai.usage.output_tokens", "value": {"intValue": 75}}
        ]
      }]
    }]
  }]
}"#;

fn kv(key: &str, value: any_value::Value) -> KeyValue {
    KeyValue {
        key: key.to_string(),
        value: Some(AnyValue { value: Some(value) }),
    }
}

fn str_kv(key: &str, value: &str) -> KeyValue {
    kv(key, any_value::Value::StringValue(value.to_string()))
}

fn chat_request() -> ExportTraceServiceRequest {
    ExportTraceServiceRequest {
        resource_spans: vec![ResourceSpans {
            resource: Some(Resource {
                attributes: vec![str_kv("service.name", "chat-api")],
                ..Default::default()
            }),
            scope_spans: vec![ScopeSpans {
                spans: vec![Span {
                    trace_id: TRACE_ID.to_vec(),
                    span_id: SPAN_ID.to_vec(),
                    name: "chat gpt-4".to_string(),
                    kind: 3,
                    start_time_unix_nano: 1_700_000_000_000_000_000,
                    end_time_unix_nano: 1_700_000_000_100_000_000,
                    attributes: vec![
                        str_kv("gen_ai.system", "openai"),
                        str_kv("gen_ai.request.model", "gpt-4"),
                        kv("gen_ai.usage.input_tokens", any_value::Value::IntValue(150)),
                        kv("gen_ai.usage.output_tokens", any_value::Value::IntValue(75)),
                    ],
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        }],
    }
}

/// Span exercising every field and value type both transports carry.
const RICH_JSON: &str = r#"{
  "resourceSpans": [{
    "resource": {"attributes": [
      {"key": "service.name", "value": {"stringValue": ""}},
      {"key": "service.name", "value": {"stringValue": "chat-api"}}
    ]},
    "scopeSpans": [{
      "spans": [{
        "traceId": "0af7651916cd43dd8448eb211c80319c",
        "spanId": "b7ad6b7169203331",
        "parentSpanId": "00f067aa0ba902b7",
        "name": "chat gpt-4",
        "kind": 3,
        "startTimeUnixNano": "1700000000000000000",
        "endTimeUnixNano": "1700000000250000000",
        "attributes": [
          {"key": "gen_ai.system", "value": {"stringValue": "openai"}},
          {"key": "gen_ai.request.model", "value": {"stringValue": "gpt-4"}},
          {"key": "gen_ai.usage.prompt_tokens", "value": {"intValue": "150"}},
          {"key": "gen_ai.usage.output_tokens", "value": {"intValue": 75}},
          {"key": "gen_ai.request.temperature", "value": {"doubleValue": 0.5}},
          {"key": "gen_ai.response.finish_reasons", "value": {"arrayValue": {"values": [
            {"stringValue": "stop"}
          ]}}},
          {"key": "http.method", "value": {"stringValue": "POST"}},
          {"key": "payload", "value": {"bytesValue": "3q2+7w=="}},
          {"key": "streamed", "value": {"boolValue": true}},
          {"key": "tags", "value": {"arrayValue": {"values": [
            {"stringValue": "a"}, {"intValue": "2"}, {}
          ]}}},
          {"key": "meta", "value": {"kvlistValue": {"values": [
            {"key": "region", "value": {"stringValue": "eu"}},
            {"key": "retries", "value": {"intValue": "3"}}
          ]}}}
        ],
        "events": [{
          "timeUnixNano": "1700000000100000000",
          "name": "exception",
          "attributes": [
            {"key": "exception.message", "value": {"stringValue": "rate limited"}},
            {"key": "code.lineno", "value": {"intValue": "12"}}
          ]
        }],
        "status": {"code": 2, "message": "upstream 429"}
      }]
    }]
  }]
}"#;

fn rich_request() -> ExportTraceServiceRequest {
    let values = |values: Vec<any_value::Value>| {
        values
            .into_iter()
            .map(|v| AnyValue { value: Some(v) })
            .collect::<Vec<_>>()
    };
    let mut tags = values(vec![
        any_value::Value::StringValue("a".to_string()),
        any_value::Value::IntValue(2),
    ]);
    tags.push(AnyValue { value: None });

    ExportTraceServiceRequest {
        resource_spans: vec![ResourceSpans {
            resource: Some(Resource {
                attributes: vec![str_kv("service.name", ""), str_kv("service.name", "chat-api")],
                ..Default::default()
            }),
            scope_spans: vec![ScopeSpans {
                spans: vec![Span {
                    trace_id: TRACE_ID.to_vec(),
                    span_id: SPAN_ID.to_vec(),
                    parent_span_id: PARENT_ID.to_vec(),
                    name: "chat gpt-4".to_string(),
                    kind: 3,
                    start_time_unix_nano: 1_700_000_000_000_000_000,
                    end_time_unix_nano: 1_700_000_000_250_000_000,
                    attributes: vec![
                        str_kv("gen_ai.system", "openai"),
                        str_kv("gen_ai.request.model", "gpt-4"),
                        kv("gen_ai.usage.prompt_tokens", any_value::Value::IntValue(150)),
                        kv("gen_ai.usage.output_tokens", any_value::Value::IntValue(75)),
                        kv("gen_ai.request.temperature", any_value::Value::DoubleValue(0.5)),
                        kv(
                            "gen_ai.response.finish_reasons",
                            any_value::Value::ArrayValue(ArrayValue {
                                values: values(vec![any_value::Value::StringValue(
                                    "stop".to_string(),
                                )]),
                            }),
                        ),
                        str_kv("http.method", "POST"),
                        kv(
                            "payload",
                            any_value::Value::BytesValue(vec![0xde, 0xad, 0xbe, 0xef]),
                        ),
                        kv("streamed", any_value::Value::BoolValue(true)),
                        kv(
                            "tags",
                            any_value::Value::ArrayValue(ArrayValue { values: tags }),
                        ),
                        kv(
                            "meta",
                            any_value::Value::KvlistValue(KeyValueList {
                                values: vec![
                                    str_kv("region", "eu"),
                                    kv("retries", any_value::Value::IntValue(3)),
                                ],
                            }),
                        ),
                    ],
                    events: vec![Event {
                        time_unix_nano: 1_700_000_000_100_000_000,
                        name: "exception".to_string(),
                        attributes: vec![
                            str_kv("exception.message", "rate limited"),
                            kv("code.lineno", any_value::Value::IntValue(12)),
                        ],
                        ..Default::default()
                    }],
                    status: Some(Status {
                        code: 2,
                        message: "upstream 429".to_string(),
                    }),
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        }],
    }
}

// ============================================================================
// Transport parity
// ============================================================================

#[test]
fn test_rich_span_rows_are_identical() {
    let from_json = parse_export_request(RICH_JSON.as_bytes()).unwrap();
    let request = decode_trace_request(&rich_request().encode_to_vec()).unwrap();
    let from_proto = convert_trace_request(&request);

    assert_eq!(from_json.len(), 1);
    assert_eq!(from_json, from_proto);

    let row = &from_json[0];
    assert_eq!(row.service_name, "chat-api");
    assert_eq!(row.parent_span_id.as_deref(), Some("00f067aa0ba902b7"));
    assert_eq!(row.status_code, StatusCode::Error);
    assert_eq!(row.status_message.as_deref(), Some("upstream 429"));
    assert_eq!(row.input_tokens, Some(150));
    assert_eq!(row.temperature, Some(0.5));
    assert_eq!(row.duration_ms(), 250);
    assert_eq!(row.attributes["http.request.method"], json!("POST"));
    assert_eq!(row.attributes["payload"], json!("deadbeef"));
    assert_eq!(row.attributes["streamed"], json!(true));
    assert_eq!(row.attributes["tags"], json!(["a", 2, null]));
    assert_eq!(row.attributes["meta"], json!({"region": "eu", "retries": 3}));
    assert_eq!(row.events.len(), 1);
    assert_eq!(row.events[0].attributes["code.line.number"], json!(12));
}

fn resource_json(attributes: serde_json::Value) -> String {
    json!({
        "resourceSpans": [{
            "resource": {"attributes": attributes},
            "scopeSpans": [{"spans": [{
                "traceId": "0af7651916cd43dd8448eb211c80319c",
                "spanId": "b7ad6b7169203331"
            }]}]
        }]
    })
    .to_string()
}

fn resource_proto(attributes: Vec<KeyValue>) -> ExportTraceServiceRequest {
    ExportTraceServiceRequest {
        resource_spans: vec![ResourceSpans {
            resource: Some(Resource {
                attributes,
                ..Default::default()
            }),
            scope_spans: vec![ScopeSpans {
                spans: vec![Span {
                    trace_id: TRACE_ID.to_vec(),
                    span_id: SPAN_ID.to_vec(),
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        }],
    }
}

#[test]
fn test_service_name_rule_matches_across_transports() {
    let cases = [
        (
            json!([
                {"key": "service.name", "value": {"stringValue": ""}},
                {"key": "service.name", "value": {"stringValue": "real"}}
            ]),
            vec![str_kv("service.name", ""), str_kv("service.name", "real")],
            "real",
        ),
        (
            json!([
                {"key": "service.name", "value": {"intValue": "7"}},
                {"key": "service.name", "value": {"stringValue": "named"}}
            ]),
            vec![
                kv("service.name", any_value::Value::IntValue(7)),
                str_kv("service.name", "named"),
            ],
            "named",
        ),
        (
            json!([
                {"key": "service.name", "value": {"stringValue": "first"}},
                {"key": "service.name", "value": {"stringValue": "second"}}
            ]),
            vec![str_kv("service.name", "first"), str_kv("service.name", "second")],
            "first",
        ),
        (
            json!([{"key": "service.name", "value": {"stringValue": ""}}]),
            vec![str_kv("service.name", "")],
            "unknown",
        ),
    ];

    for (json_attrs, proto_attrs, expected) in cases {
        let from_json = parse_export_request(resource_json(json_attrs).as_bytes()).unwrap();
        let from_proto = convert_trace_request(&resource_proto(proto_attrs));
        assert_eq!(from_json[0].service_name, expected);
        assert_eq!(from_proto[0].service_name, expected);
    }
}

#[test]
fn test_json_and_protobuf_produce_same_row() {
    let from_json = parse_export_request(CHAT_JSON.as_bytes()).unwrap();
    let request = decode_trace_request(&chat_request().encode_to_vec()).unwrap();
    let from_proto = convert_trace_request(&request);

    assert_eq!(from_json.len(), 1);
    assert_eq!(from_proto.len(), 1);
    for row in [&from_json[0], &from_proto[0]] {
        assert_eq!(row.trace_id, "0af7651916cd43dd8448eb211c80319c");
        assert_eq!(row.span_id, "b7ad6b7169203331");
        assert_eq!(row.service_name, "chat-api");
        assert_eq!(row.provider_name.as_deref(), Some("openai"));
        assert_eq!(row.request_model.as_deref(), Some("gpt-4"));
        assert_eq!(row.input_tokens, Some(150));
        assert_eq!(row.output_tokens, Some(75));
        assert_eq!(row.duration_ms(), 100);
        assert_eq!(row.kind.as_i32(), 3);
        assert!(!row.attributes.contains_key("gen_ai.system"));
    }
    assert_eq!(from_json[0].attributes, from_proto[0].attributes);
}

#[test]
fn test_deprecated_provider_key_parity() {
    let json = CHAT_JSON.replace(r#""openai""#, r#""anthropic""#);
    let from_json = parse_export_request(json.as_bytes()).unwrap();

    let mut request = chat_request();
    request.resource_spans[0].scope_spans[0].spans[0].attributes[0] =
        str_kv("gen_ai.system", "anthropic");
    let from_proto = convert_trace_request(&request);

    assert_eq!(from_json[0].provider_name.as_deref(), Some("anthropic"));
    assert_eq!(from_proto[0].provider_name.as_deref(), Some("anthropic"));
}

#[test]
fn test_empty_protobuf_body_is_empty_batch() {
    let batch = TraceIngestor::default()
        .ingest(&[], "application/x-protobuf")
        .unwrap();
    assert!(batch.is_empty());
}

#[test]
fn test_empty_json_body_is_error() {
    assert!(TraceIngestor::default().ingest(b"", "application/json").is_err());
}

// ============================================================================
// Vendor mapping
// ============================================================================

#[test]
fn test_vendor_registry_leaves_plain_batch_alone() {
    let batch = SpanBatch::new(parse_export_request(CHAT_JSON.as_bytes()).unwrap());
    let mapped = VendorRegistry::with_defaults().transform_batch(&batch);
    assert!(matches!(mapped, Cow::Borrowed(_)));
    assert!(std::ptr::eq(mapped.as_ref(), &batch));
}

#[test]
fn test_codex_export_through_pipeline() {
    let mut request = chat_request();
    let span = &mut request.resource_spans[0].scope_spans[0].spans[0];
    span.name = "codex.api_request".to_string();
    span.attributes = vec![
        str_kv("codex.model", "gpt-4o"),
        kv("codex.success", any_value::Value::BoolValue(true)),
        str_kv("codex.thread_id", "thread-9"),
    ];

    let sink = JsonLinesSink::new(Vec::new());
    let written = TraceIngestor::default()
        .ingest_into(&request.encode_to_vec(), "application/x-protobuf", &sink)
        .unwrap();
    assert_eq!(written, 1);

    let out = String::from_utf8(sink.into_inner()).unwrap();
    let line: serde_json::Value = serde_json::from_str(out.trim_end()).unwrap();
    assert_eq!(line["provider_name"], "openai");
    assert_eq!(line["request_model"], "gpt-4o");
    assert_eq!(line["response_model"], "gpt-4o");
    assert_eq!(line["operation_name"], "chat");
    assert_eq!(line["conversation_id"], "thread-9");
}

#[test]
fn test_unknown_vendor_name_rejected() {
    assert!(VendorRegistry::from_names(&["codex", "nope"]).is_err());
    let registry = VendorRegistry::from_names(&[" Codex "]).unwrap();
    assert_eq!(registry.names(), vec!["codex"]);
}

#[test]
fn test_strict_json_option() {
    let body = br#"{"resourceSpans":[],}"#;
    let strict = TraceIngestor::new(ReaderOptions::default(), VendorRegistry::new());
    assert!(strict.ingest_as(body, PayloadFormat::Json).is_err());
    let lenient = TraceIngestor::new(ReaderOptions::lenient(), VendorRegistry::new());
    assert!(lenient.ingest_as(body, PayloadFormat::Json).unwrap().is_empty());
}

// ============================================================================
// Logs
// ============================================================================

fn logs_request() -> ExportLogsServiceRequest {
    let stack = "Traceback (most recent call last):\n  \
                 File \"/srv/app.py\", line 3, in <module>\n  \
                 File \"/srv/jobs.py\", line 41, in run_job\n\
                 KeyError: 'id'";
    ExportLogsServiceRequest {
        resource_logs: vec![ResourceLogs {
            scope_logs: vec![ScopeLogs {
                log_records: vec![
                    OtlpLogRecord {
                        severity_text: "ERROR".to_string(),
                        attributes: vec![str_kv("exception.stacktrace", stack)],
                        ..Default::default()
                    },
                    OtlpLogRecord {
                        severity_text: "INFO".to_string(),
                        attributes: vec![
                            str_kv("code.filepath", "/srv/api.py"),
                            kv("code.lineno", any_value::Value::IntValue(12)),
                        ],
                        ..Default::default()
                    },
                ],
                ..Default::default()
            }],
            ..Default::default()
        }],
    }
}

#[test]
fn test_logs_protobuf_to_enriched_records() {
    let body = logs_request().encode_to_vec();
    let request: ExportLogsServiceRequest =
        decode_request(&body, PayloadFormat::Protobuf).unwrap();
    let mut records = LogRecord::from_request(&request);

    let resolver = SourceLocationResolver::new(64);
    assert_eq!(resolver.enrich_all(&mut records), 2);

    let first = records[0].source_location.as_ref().unwrap();
    assert_eq!(first.file_path, "/srv/jobs.py");
    assert_eq!(first.line, Some(41));
    assert_eq!(first.method.as_deref(), Some("run_job"));

    let second = records[1].source_location.as_ref().unwrap();
    assert_eq!(second.file_path, "/srv/api.py");
    assert_eq!(second.line, Some(12));
    assert!(records[1].attributes.contains_key("code.line.number"));
}
