//! Tests for semantic-convention key normalization

use serde_json::json;

use super::*;

fn attrs(value: serde_json::Value) -> Attributes {
    match value {
        serde_json::Value::Object(map) => map,
        _ => panic!("expected object"),
    }
}

// ============================================================================
// KEY NORMALIZATION
// ============================================================================

#[test]
fn test_normalize_genai_renames() {
    assert_eq!(normalize("gen_ai.system"), "gen_ai.provider.name");
    assert_eq!(
        normalize("gen_ai.usage.prompt_tokens"),
        "gen_ai.usage.input_tokens"
    );
    assert_eq!(
        normalize("gen_ai.usage.completion_tokens"),
        "gen_ai.usage.output_tokens"
    );
    assert_eq!(
        normalize("gen_ai.openai.request.seed"),
        "gen_ai.request.seed"
    );
    assert_eq!(normalize("gen_ai.prompt"), "gen_ai.input.messages");
    assert_eq!(normalize("gen_ai.completion"), "gen_ai.output.messages");
}

#[test]
fn test_normalize_agent_and_code_renames() {
    assert_eq!(normalize("agents.agent.id"), "gen_ai.agent.id");
    assert_eq!(normalize("agents.tool.name"), "gen_ai.tool.name");
    assert_eq!(normalize("agents.tool.call_id"), "gen_ai.tool.call.id");
    assert_eq!(normalize("code.function"), "code.function.name");
    assert_eq!(normalize("code.filepath"), "code.file.path");
    assert_eq!(normalize("code.lineno"), "code.line.number");
    assert_eq!(normalize("db.system"), "db.system.name");
}

#[test]
fn test_normalize_http_renames() {
    let cases = [
        ("http.target", "url.path"),
        ("http.host", "server.address"),
        ("http.server_name", "server.address"),
        ("http.flavor", "network.protocol.version"),
        ("http.method", "http.request.method"),
    ];
    for (old, current) in cases {
        assert_eq!(normalize(old), current, "{}", old);
    }
}

#[test]
fn test_normalize_messaging_renames() {
    let cases = [
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
    ];
    for (old, current) in cases {
        assert_eq!(normalize(old), current, "{}", old);
    }
    // Current names are left alone
    assert_eq!(normalize("messaging.destination.name"), "messaging.destination.name");
}

#[test]
fn test_normalize_db_connection_string() {
    assert_eq!(
        normalize("db.connection_string"),
        "db.client.connection.string"
    );
}

#[test]
fn test_normalize_passes_through_current_and_unknown_keys() {
    assert_eq!(
        normalize("gen_ai.request.max_tokens"),
        "gen_ai.request.max_tokens"
    );
    assert_eq!(normalize("gen_ai.provider.name"), "gen_ai.provider.name");
    assert_eq!(normalize("my.custom.key"), "my.custom.key");
    assert_eq!(normalize(""), "");
}

#[test]
fn test_normalize_is_exact_match_only() {
    // No prefix or case folding
    assert_eq!(normalize("gen_ai.system.extra"), "gen_ai.system.extra");
    assert_eq!(normalize("GEN_AI.SYSTEM"), "GEN_AI.SYSTEM");
    assert_eq!(normalize("http.methods"), "http.methods");
}

#[test]
fn test_normalize_is_idempotent() {
    for (old, _) in deprecated_mappings() {
        let once = normalize(old);
        assert_eq!(normalize(once), once, "not idempotent for {}", old);
    }
}

#[test]
fn test_no_current_key_is_deprecated() {
    for (old, current) in deprecated_mappings() {
        assert!(is_deprecated(old));
        assert!(!is_deprecated(current), "{} is both current and deprecated", current);
    }
}

#[test]
fn test_max_tokens_is_not_deprecated() {
    assert!(!is_deprecated("gen_ai.request.max_tokens"));
}

// ============================================================================
// MAP NORMALIZATION
// ============================================================================

#[test]
fn test_normalize_attributes_rewrites_keys_and_keeps_order() {
    let input = attrs(json!({
        "first": 1,
        "gen_ai.system": "openai",
        "gen_ai.usage.prompt_tokens": 10,
        "last": true,
    }));

    let out = normalize_attributes(input);
    let keys: Vec<&str> = out.keys().map(|k| k.as_str()).collect();
    assert_eq!(
        keys,
        vec![
            "first",
            "gen_ai.provider.name",
            "gen_ai.usage.input_tokens",
            "last"
        ]
    );
    assert_eq!(out["gen_ai.provider.name"], json!("openai"));
    assert_eq!(out["gen_ai.usage.input_tokens"], json!(10));
}

#[test]
fn test_normalize_attributes_current_key_wins_regardless_of_order() {
    let deprecated_first = attrs(json!({
        "gen_ai.system": "old",
        "gen_ai.provider.name": "new",
    }));
    let current_first = attrs(json!({
        "gen_ai.provider.name": "new",
        "gen_ai.system": "old",
    }));

    let a = normalize_attributes(deprecated_first);
    let b = normalize_attributes(current_first);
    assert_eq!(a.len(), 1);
    assert_eq!(b.len(), 1);
    assert_eq!(a["gen_ai.provider.name"], json!("new"));
    assert_eq!(b["gen_ai.provider.name"], json!("new"));
}

#[test]
fn test_normalize_attributes_preserves_null() {
    let out = normalize_attributes(attrs(json!({ "code.lineno": null })));
    assert_eq!(out.get("code.line.number"), Some(&serde_json::Value::Null));
}

#[test]
fn test_normalize_attributes_is_idempotent() {
    let input = attrs(json!({
        "db.system": "postgresql",
        "http.method": "GET",
        "service.name": "api",
    }));
    let once = normalize_attributes(input);
    let twice = normalize_attributes(once.clone());
    assert_eq!(once, twice);
}

#[test]
fn test_normalize_attributes_first_alias_wins() {
    let out = normalize_attributes(attrs(json!({
        "net.peer.name": "db.internal",
        "net.host.name": "app.internal",
    })));
    assert_eq!(out["server.address"], json!("db.internal"));
}

#[test]
fn test_normalize_attributes_legacy_http_and_messaging() {
    let out = normalize_attributes(attrs(json!({
        "http.target": "/v1/chat",
        "http.host": "api.internal",
        "url.path": "/v1/chat?x=1",
        "messaging.destination": "orders",
        "messaging.message_payload_size_bytes": 512,
    })));
    assert_eq!(out["url.path"], json!("/v1/chat?x=1"));
    assert_eq!(out["server.address"], json!("api.internal"));
    assert_eq!(out["messaging.destination.name"], json!("orders"));
    assert_eq!(out["messaging.message.body.size"], json!(512));
    assert!(!out.keys().any(|k| is_deprecated(k)));
}
