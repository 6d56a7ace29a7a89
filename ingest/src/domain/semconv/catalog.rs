//! Attribute catalog for OpenTelemetry semantic conventions 1.38.0.
//!
//! Every component that reads or writes well-known attributes goes through
//! the constants here, so a key is spelled in exactly one place.

/// Semantic-convention version that normalized attributes conform to.
pub const SCHEMA_VERSION: &str = "1.38.0";

/// Schema URL matching [`SCHEMA_VERSION`].
pub const SCHEMA_URL: &str = "https://opentelemetry.io/schemas/1.38.0";

// ============================================================================
// ATTRIBUTE KEYS
// ============================================================================

/// Current (non-deprecated) attribute keys.
pub mod keys {
    // Resource
    pub const SERVICE_NAME: &str = "service.name";

    // GenAI request/response
    pub const GEN_AI_PROVIDER_NAME: &str = "gen_ai.provider.name";
    pub const GEN_AI_OPERATION_NAME: &str = "gen_ai.operation.name";
    pub const GEN_AI_REQUEST_MODEL: &str = "gen_ai.request.model";
    pub const GEN_AI_RESPONSE_MODEL: &str = "gen_ai.response.model";
    pub const GEN_AI_REQUEST_TEMPERATURE: &str = "gen_ai.request.temperature";
    pub const GEN_AI_REQUEST_MAX_TOKENS: &str = "gen_ai.request.max_tokens";
    pub const GEN_AI_REQUEST_SEED: &str = "gen_ai.request.seed";
    pub const GEN_AI_RESPONSE_FINISH_REASONS: &str = "gen_ai.response.finish_reasons";
    pub const GEN_AI_INPUT_MESSAGES: &str = "gen_ai.input.messages";
    pub const GEN_AI_OUTPUT_MESSAGES: &str = "gen_ai.output.messages";
    pub const GEN_AI_OUTPUT_TYPE: &str = "gen_ai.output.type";
    pub const GEN_AI_CONVERSATION_ID: &str = "gen_ai.conversation.id";

    // GenAI usage
    pub const GEN_AI_USAGE_INPUT_TOKENS: &str = "gen_ai.usage.input_tokens";
    pub const GEN_AI_USAGE_OUTPUT_TOKENS: &str = "gen_ai.usage.output_tokens";
    pub const GEN_AI_USAGE_TOTAL_TOKENS: &str = "gen_ai.usage.total_tokens";
    pub const GEN_AI_USAGE_COST: &str = "gen_ai.usage.cost";

    // GenAI agents and tools
    pub const GEN_AI_AGENT_ID: &str = "gen_ai.agent.id";
    pub const GEN_AI_AGENT_NAME: &str = "gen_ai.agent.name";
    pub const GEN_AI_TOOL_NAME: &str = "gen_ai.tool.name";
    pub const GEN_AI_TOOL_TYPE: &str = "gen_ai.tool.type";
    pub const GEN_AI_TOOL_CALL_ID: &str = "gen_ai.tool.call.id";
    pub const GEN_AI_TOOL_CALL_RESULT: &str = "gen_ai.tool.call.result";

    // Session
    pub const SESSION_ID: &str = "session.id";

    // Errors
    pub const ERROR_TYPE: &str = "error.type";
    pub const EXCEPTION_MESSAGE: &str = "exception.message";
    pub const EXCEPTION_STACKTRACE: &str = "exception.stacktrace";

    // Source code
    pub const CODE_FUNCTION_NAME: &str = "code.function.name";
    pub const CODE_FILE_PATH: &str = "code.file.path";
    pub const CODE_LINE_NUMBER: &str = "code.line.number";
    pub const CODE_COLUMN_NUMBER: &str = "code.column.number";

    // Network
    pub const SERVER_ADDRESS: &str = "server.address";
}

/// Keys that older instrumentations still emit.
pub mod deprecated {
    pub const GEN_AI_SYSTEM: &str = "gen_ai.system";
    pub const GEN_AI_USAGE_PROMPT_TOKENS: &str = "gen_ai.usage.prompt_tokens";
    pub const GEN_AI_USAGE_COMPLETION_TOKENS: &str = "gen_ai.usage.completion_tokens";
    /// Token counts some SDKs report under `gen_ai.response.*`.
    pub const GEN_AI_RESPONSE_PROMPT_TOKENS: &str = "gen_ai.response.prompt_tokens";
    pub const GEN_AI_RESPONSE_COMPLETION_TOKENS: &str = "gen_ai.response.completion_tokens";
    pub const GEN_AI_OPENAI_REQUEST_SEED: &str = "gen_ai.openai.request.seed";
    pub const GEN_AI_OPENAI_RESPONSE_FORMAT: &str = "gen_ai.openai.request.response_format";
    pub const GEN_AI_PROMPT: &str = "gen_ai.prompt";
    pub const GEN_AI_COMPLETION: &str = "gen_ai.completion";
    /// Single-valued predecessor of `gen_ai.response.finish_reasons`.
    pub const GEN_AI_RESPONSE_FINISH_REASON: &str = "gen_ai.response.finish_reason";
    /// OpenInference-style total token count.
    pub const LLM_TOKEN_COUNT_TOTAL: &str = "llm.token_count.total";

    pub const AGENTS_AGENT_ID: &str = "agents.agent.id";
    pub const AGENTS_AGENT_NAME: &str = "agents.agent.name";
    pub const AGENTS_TOOL_NAME: &str = "agents.tool.name";
    pub const AGENTS_TOOL_CALL_ID: &str = "agents.tool.call_id";

    pub const CODE_FUNCTION: &str = "code.function";
    pub const CODE_FILEPATH: &str = "code.filepath";
    pub const CODE_LINENO: &str = "code.lineno";
    pub const CODE_COLUMN: &str = "code.column";
}

// ============================================================================
// WELL-KNOWN VALUES
// ============================================================================

/// `gen_ai.provider.name` values.
pub mod providers {
    pub const OPENAI: &str = "openai";
    pub const ANTHROPIC: &str = "anthropic";
    pub const AWS_BEDROCK: &str = "aws.bedrock";
    pub const AZURE_AI_OPENAI: &str = "azure.ai.openai";
    pub const AZURE_AI_INFERENCE: &str = "azure.ai.inference";
    pub const GCP_GEMINI: &str = "gcp.gemini";
    pub const GCP_VERTEX_AI: &str = "gcp.vertex_ai";
    pub const GCP_GEN_AI: &str = "gcp.gen_ai";
    pub const COHERE: &str = "cohere";
    pub const DEEPSEEK: &str = "deepseek";
    pub const GROQ: &str = "groq";
    pub const IBM_WATSONX_AI: &str = "ibm.watsonx.ai";
    pub const MISTRAL_AI: &str = "mistral_ai";
    pub const PERPLEXITY: &str = "perplexity";
    pub const X_AI: &str = "x_ai";

    /// All known provider names.
    pub const ALL: &[&str] = &[
        OPENAI,
        ANTHROPIC,
        AWS_BEDROCK,
        AZURE_AI_OPENAI,
        AZURE_AI_INFERENCE,
        GCP_GEMINI,
        GCP_VERTEX_AI,
        GCP_GEN_AI,
        COHERE,
        DEEPSEEK,
        GROQ,
        IBM_WATSONX_AI,
        MISTRAL_AI,
        PERPLEXITY,
        X_AI,
    ];
}

/// `gen_ai.operation.name` values.
pub mod operations {
    pub const CHAT: &str = "chat";
    pub const GENERATE_CONTENT: &str = "generate_content";
    pub const TEXT_COMPLETION: &str = "text_completion";
    pub const EMBEDDINGS: &str = "embeddings";
    pub const CREATE_AGENT: &str = "create_agent";
    pub const INVOKE_AGENT: &str = "invoke_agent";
    pub const EXECUTE_TOOL: &str = "execute_tool";

    pub const ALL: &[&str] = &[
        CHAT,
        GENERATE_CONTENT,
        TEXT_COMPLETION,
        EMBEDDINGS,
        CREATE_AGENT,
        INVOKE_AGENT,
        EXECUTE_TOOL,
    ];
}

/// `gen_ai.tool.type` values.
pub mod tool_types {
    pub const FUNCTION: &str = "function";
    pub const EXTENSION: &str = "extension";
    pub const DATASTORE: &str = "datastore";
}

// ============================================================================
// PROVIDER DETECTION
// ============================================================================

/// Exact API hosts of GenAI providers.
const PROVIDER_HOSTS: &[(&str, &str)] = &[
    ("api.openai.com", providers::OPENAI),
    ("api.anthropic.com", providers::ANTHROPIC),
    ("generativelanguage.googleapis.com", providers::GCP_GEMINI),
    ("api.cohere.com", providers::COHERE),
    ("api.cohere.ai", providers::COHERE),
    ("api.mistral.ai", providers::MISTRAL_AI),
    ("api.groq.com", providers::GROQ),
    ("api.deepseek.com", providers::DEEPSEEK),
    ("api.x.ai", providers::X_AI),
    ("api.perplexity.ai", providers::PERPLEXITY),
];

/// Detect the GenAI provider from a `server.address` value.
///
/// Matches exact API hosts plus the regional Azure OpenAI, Bedrock and
/// Vertex AI endpoints. Returns `None` for anything else.
pub fn provider_for_host(host: &str) -> Option<&'static str> {
    let host = host.trim().trim_end_matches('.');
    if let Some(&(_, provider)) = PROVIDER_HOSTS
        .iter()
        .find(|(h, _)| host.eq_ignore_ascii_case(h))
    {
        return Some(provider);
    }

    let lower = host.to_ascii_lowercase();
    if lower.ends_with(".openai.azure.com") {
        Some(providers::AZURE_AI_OPENAI)
    } else if lower.starts_with("bedrock-runtime.") && lower.ends_with(".amazonaws.com") {
        Some(providers::AWS_BEDROCK)
    } else if lower.ends_with("-aiplatform.googleapis.com") {
        Some(providers::GCP_VERTEX_AI)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_url_matches_version() {
        assert!(SCHEMA_URL.ends_with(SCHEMA_VERSION));
    }

    #[test]
    fn test_provider_for_exact_hosts() {
        assert_eq!(provider_for_host("api.openai.com"), Some(providers::OPENAI));
        assert_eq!(
            provider_for_host("API.Anthropic.com"),
            Some(providers::ANTHROPIC)
        );
        assert_eq!(provider_for_host("api.x.ai."), Some(providers::X_AI));
    }

    #[test]
    fn test_provider_for_regional_hosts() {
        assert_eq!(
            provider_for_host("my-resource.openai.azure.com"),
            Some(providers::AZURE_AI_OPENAI)
        );
        assert_eq!(
            provider_for_host("bedrock-runtime.us-east-1.amazonaws.com"),
            Some(providers::AWS_BEDROCK)
        );
        assert_eq!(
            provider_for_host("us-central1-aiplatform.googleapis.com"),
            Some(providers::GCP_VERTEX_AI)
        );
    }

    #[test]
    fn test_provider_for_unknown_host() {
        assert_eq!(provider_for_host("localhost"), None);
        assert_eq!(provider_for_host("openai.com.evil.example"), None);
        assert_eq!(provider_for_host(""), None);
    }
}
