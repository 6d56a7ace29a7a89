//! Log records from OTLP log export requests

use std::sync::Arc;

use opentelemetry_proto::tonic::collector::logs::v1::ExportLogsServiceRequest;
use opentelemetry_proto::tonic::logs::v1::LogRecord as OtlpLogRecord;
use serde::{Serialize, Serializer};
use serde_json::Value as JsonValue;

use super::source_location::SourceLocation;
use crate::domain::Attributes;
use crate::domain::semconv::normalize_attributes;
use crate::domain::spans::UNKNOWN_SERVICE;
use crate::utils::otlp::{
    SPAN_ID_LEN, TRACE_ID_LEN, any_value_to_json, build_attributes, id_from_bytes,
    resource_service_name,
};

/// One log record with normalized attribute keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LogRecord {
    pub time_unix_nano: u64,
    pub observed_time_unix_nano: u64,
    pub severity_number: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span_id: Option<String>,
    pub service_name: String,
    pub attributes: Attributes,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_location"
    )]
    pub source_location: Option<Arc<SourceLocation>>,
}

fn serialize_location<S: Serializer>(
    location: &Option<Arc<SourceLocation>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    location.as_deref().serialize(serializer)
}

impl LogRecord {
    /// All records in `resource -> scope -> record` order.
    pub fn from_request(request: &ExportLogsServiceRequest) -> Vec<Self> {
        let mut records = Vec::new();
        for resource_logs in &request.resource_logs {
            let service_name = resource_service_name(resource_logs.resource.as_ref())
                .unwrap_or_else(|| UNKNOWN_SERVICE.to_string());
            for scope_logs in &resource_logs.scope_logs {
                records.extend(
                    scope_logs
                        .log_records
                        .iter()
                        .map(|record| Self::from_otlp(record, &service_name)),
                );
            }
        }
        tracing::debug!(records = records.len(), "Converted OTLP logs request");
        records
    }

    fn from_otlp(record: &OtlpLogRecord, service_name: &str) -> Self {
        Self {
            time_unix_nano: record.time_unix_nano,
            observed_time_unix_nano: record.observed_time_unix_nano,
            severity_number: record.severity_number,
            severity_text: Some(record.severity_text.clone()).filter(|s| !s.is_empty()),
            body: record.body.as_ref().and_then(any_value_to_json),
            trace_id: id_from_bytes(&record.trace_id, TRACE_ID_LEN),
            span_id: id_from_bytes(&record.span_id, SPAN_ID_LEN),
            service_name: service_name.to_string(),
            attributes: normalize_attributes(build_attributes(&record.attributes)),
            source_location: None,
        }
    }
}
