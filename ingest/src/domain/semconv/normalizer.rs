//! Deprecated attribute key normalization.
//!
//! Rewrites keys from older semantic-convention versions to their 1.38.0
//! names. The table is an explicit allow-list; keys that are not listed pass
//! through untouched.

use std::sync::LazyLock;

use rustc_hash::FxHashMap;

use super::catalog::{deprecated, keys};
use crate::domain::Attributes;

/// Deprecated key -> current key.
static DEPRECATED_KEYS: &[(&str, &str)] = &[
    // GenAI
    (deprecated::GEN_AI_SYSTEM, keys::GEN_AI_PROVIDER_NAME),
    (
        deprecated::GEN_AI_USAGE_PROMPT_TOKENS,
        keys::GEN_AI_USAGE_INPUT_TOKENS,
    ),
    (
        deprecated::GEN_AI_USAGE_COMPLETION_TOKENS,
        keys::GEN_AI_USAGE_OUTPUT_TOKENS,
    ),
    (deprecated::GEN_AI_OPENAI_REQUEST_SEED, keys::GEN_AI_REQUEST_SEED),
    (
        deprecated::GEN_AI_OPENAI_RESPONSE_FORMAT,
        keys::GEN_AI_OUTPUT_TYPE,
    ),
    (deprecated::GEN_AI_PROMPT, keys::GEN_AI_INPUT_MESSAGES),
    (deprecated::GEN_AI_COMPLETION, keys::GEN_AI_OUTPUT_MESSAGES),
    // Agent frameworks
    (deprecated::AGENTS_AGENT_ID, keys::GEN_AI_AGENT_ID),
    (deprecated::AGENTS_AGENT_NAME, keys::GEN_AI_AGENT_NAME),
    (deprecated::AGENTS_TOOL_NAME, keys::GEN_AI_TOOL_NAME),
    (deprecated::AGENTS_TOOL_CALL_ID, keys::GEN_AI_TOOL_CALL_ID),
    // Source code
    (deprecated::CODE_FUNCTION, keys::CODE_FUNCTION_NAME),
    (deprecated::CODE_FILEPATH, keys::CODE_FILE_PATH),
    (deprecated::CODE_LINENO, keys::CODE_LINE_NUMBER),
    (deprecated::CODE_COLUMN, keys::CODE_COLUMN_NUMBER),
    // Database
    ("db.system", "db.system.name"),
    ("db.name", "db.namespace"),
    ("db.statement", "db.query.text"),
    ("db.operation", "db.operation.name"),
    ("db.sql.table", "db.collection.name"),
    ("db.cosmosdb.container", "db.collection.name"),
    ("db.mongodb.collection", "db.collection.name"),
    ("db.connection_string", "db.client.connection.string"),
    // HTTP
    ("http.method", "http.request.method"),
    ("http.status_code", "http.response.status_code"),
    ("http.url", "url.full"),
    ("http.target", "url.path"),
    ("http.host", "server.address"),
    ("http.server_name", "server.address"),
    ("http.scheme", "url.scheme"),
    ("http.flavor", "network.protocol.version"),
    ("http.user_agent", "user_agent.original"),
    ("http.request_content_length", "http.request.body.size"),
    ("http.response_content_length", "http.response.body.size"),
    ("http.client_ip", "client.address"),
    // Network
    ("net.peer.name", "server.address"),
    ("net.peer.port", "server.port"),
    ("net.host.name", "server.address"),
    ("net.host.port", "server.port"),
    ("net.sock.peer.addr", "network.peer.address"),
    ("net.sock.peer.port", "network.peer.port"),
    ("net.sock.host.addr", "network.local.address"),
    ("net.sock.host.port", "network.local.port"),
    ("net.transport", "network.transport"),
    ("net.protocol.name", "network.protocol.name"),
    ("net.protocol.version", "network.protocol.version"),
    // Messaging
    ("messaging.operation", "messaging.operation.type"),
    ("messaging.destination", "messaging.destination.name"),
    ("messaging.destination_kind", "messaging.destination.kind"),
    ("messaging.temp_destination", "messaging.destination.temporary"),
    ("messaging.protocol", "network.protocol.name"),
    ("messaging.protocol_version", "network.protocol.version"),
    ("messaging.url", "url.full"),
    ("messaging.message_id", "messaging.message.id"),
    (
        "messaging.conversation_id",
        "messaging.message.conversation_id",
    ),
    (
        "messaging.message_payload_size_bytes",
        "messaging.message.body.size",
    ),
    (
        "messaging.message_payload_compressed_size_bytes",
        "messaging.message.envelope.size",
    ),
    (
        "messaging.kafka.destination.partition",
        "messaging.destination.partition.id",
    ),
    ("messaging.kafka.message.offset", "messaging.kafka.offset"),
    // Deployment
    ("deployment.environment", "deployment.environment.name"),
];

static LOOKUP: LazyLock<FxHashMap<&'static str, &'static str>> =
    LazyLock::new(|| DEPRECATED_KEYS.iter().copied().collect());

/// Map a key to its current name. Unknown and current keys are returned as-is.
#[inline]
pub fn normalize(key: &str) -> &str {
    LOOKUP.get(key).copied().unwrap_or(key)
}

/// Whether `key` appears in the deprecated-key table.
#[inline]
pub fn is_deprecated(key: &str) -> bool {
    LOOKUP.contains_key(key)
}

/// The full deprecated -> current table, in declaration order.
pub fn deprecated_mappings() -> &'static [(&'static str, &'static str)] {
    DEPRECATED_KEYS
}

/// Rewrite every deprecated key in `attributes`.
///
/// Values (including `null`) and key order are preserved. When both a
/// deprecated key and its replacement are present the current key's value is
/// kept; among several deprecated keys for one target the first one wins.
pub fn normalize_attributes(attributes: Attributes) -> Attributes {
    if !attributes.keys().any(|k| is_deprecated(k)) {
        return attributes;
    }

    let mut out = Attributes::with_capacity(attributes.len());
    for (key, value) in attributes {
        match LOOKUP.get(key.as_str()).copied() {
            Some(current) => {
                if !out.contains_key(current) {
                    tracing::trace!(from = %key, to = current, "Normalizing deprecated key");
                    out.insert(current.to_string(), value);
                }
            }
            // Current keys replace anything carried over from an alias
            None => {
                out.insert(key, value);
            }
        }
    }
    out
}

#[cfg(test)]
#[path = "normalizer_tests.rs"]
mod tests;
