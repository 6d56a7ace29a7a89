//! Static intern table for values that repeat across nearly every GenAI span.

use std::borrow::Cow;
use std::sync::LazyLock;

use rustc_hash::FxHashSet;

use crate::domain::semconv::catalog::{operations, providers, tool_types};

/// Common model names seen in the wild.
const COMMON_MODELS: &[&str] = &[
    "gpt-4",
    "gpt-4o",
    "gpt-4o-mini",
    "gpt-4.1",
    "gpt-3.5-turbo",
    "o1",
    "o3-mini",
    "claude-3",
    "claude-sonnet",
    "claude-3-5-sonnet",
    "claude-3-opus",
    "claude-3-haiku",
    "gemini-pro",
    "gemini-1.5-pro",
    "gemini-2.0-flash",
];

/// Legacy provider spellings still emitted as `gen_ai.system`.
const LEGACY_PROVIDERS: &[&str] = &["azure.openai", "vertex_ai", "gemini", "bedrock"];

static INTERNED: LazyLock<FxHashSet<&'static str>> = LazyLock::new(|| {
    providers::ALL
        .iter()
        .chain(operations::ALL)
        .chain(COMMON_MODELS)
        .chain(LEGACY_PROVIDERS)
        .chain(&[
            tool_types::FUNCTION,
            tool_types::EXTENSION,
            tool_types::DATASTORE,
        ])
        .copied()
        .collect()
});

/// Return a borrowed `'static` string when `value` is in the table,
/// otherwise an owned copy.
#[inline]
pub fn intern(value: &str) -> Cow<'static, str> {
    match INTERNED.get(value) {
        Some(&known) => Cow::Borrowed(known),
        None => Cow::Owned(value.to_owned()),
    }
}
