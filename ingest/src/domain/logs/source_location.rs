//! Source location enrichment for log records
//!
//! A location comes verbatim from `code.*` attributes when the record has
//! them, otherwise it is recovered from the innermost useful frame of
//! `exception.stacktrace`. Resolutions are cached by their full input so
//! records emitted from one call site share a single [`Arc<SourceLocation>`].

use std::sync::{Arc, LazyLock};

use moka::sync::Cache;
use regex::{Captures, Regex};
use serde::Serialize;
use serde_json::Value as JsonValue;

use super::record::LogRecord;
use crate::domain::Attributes;
use crate::domain::semconv::catalog::{deprecated, keys};

/// Where a log record was emitted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SourceLocation {
    pub file_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

// ============================================================================
// STACK TRACE PATTERNS
// ============================================================================

/// .NET: `at Namespace.Type.Method(args) in /path/File.cs:line 42`
static DOTNET_FRAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*at (?P<method>.+?) in (?P<path>.+?):line (?P<line>\d+)\s*$")
        .expect("Invalid regex")
});

/// JavaScript: `at fn (/path/file.js:10:5)`
static JS_FRAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^\s*at (?P<method>[^\s(][^(]*?) \((?P<path>[^()]+?):(?P<line>\d+):(?P<column>\d+)\)\s*$",
    )
    .expect("Invalid regex")
});

/// Python: `File "/path/app.py", line 7, in handler`
static PYTHON_FRAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*File "(?P<path>[^"]+)", line (?P<line>\d+), in (?P<method>\S+)\s*$"#)
        .expect("Invalid regex")
});

/// Location of the frame that raised, from a stack trace in any supported
/// format. .NET and JavaScript list the raising frame first, Python last.
pub fn parse_stack_trace(stack: &str) -> Option<SourceLocation> {
    if let Some(caps) = DOTNET_FRAME.captures(stack) {
        let mut location = from_captures(&caps);
        // Drop the parameter list: `Service.Run(String id)` -> `Service.Run`
        location.method = location
            .method
            .map(|m| m.split('(').next().unwrap_or_default().trim().to_string());
        return Some(location);
    }
    if let Some(caps) = JS_FRAME.captures(stack) {
        return Some(from_captures(&caps));
    }
    PYTHON_FRAME
        .captures_iter(stack)
        .last()
        .map(|caps| from_captures(&caps))
}

fn from_captures(caps: &Captures<'_>) -> SourceLocation {
    SourceLocation {
        file_path: caps["path"].trim().to_string(),
        line: caps.name("line").and_then(|m| m.as_str().parse().ok()),
        column: caps.name("column").and_then(|m| m.as_str().parse().ok()),
        method: caps
            .name("method")
            .map(|m| m.as_str().trim().to_string())
            .filter(|m| !m.is_empty()),
    }
}

// ============================================================================
// ATTRIBUTES
// ============================================================================

fn lookup<'a>(attributes: &'a Attributes, current: &str, alias: &str) -> Option<&'a JsonValue> {
    attributes
        .get(current)
        .filter(|v| !v.is_null())
        .or_else(|| attributes.get(alias))
}

fn text(value: Option<&JsonValue>) -> Option<String> {
    value
        .and_then(JsonValue::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn number(value: Option<&JsonValue>) -> Option<u32> {
    match value? {
        JsonValue::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Location stated by `code.*` attributes (deprecated spellings accepted).
/// Requires a file path.
pub fn location_from_attributes(attributes: &Attributes) -> Option<SourceLocation> {
    let file_path = text(lookup(attributes, keys::CODE_FILE_PATH, deprecated::CODE_FILEPATH))?;
    Some(SourceLocation {
        file_path,
        line: number(lookup(attributes, keys::CODE_LINE_NUMBER, deprecated::CODE_LINENO)),
        column: number(lookup(attributes, keys::CODE_COLUMN_NUMBER, deprecated::CODE_COLUMN)),
        method: text(lookup(attributes, keys::CODE_FUNCTION_NAME, deprecated::CODE_FUNCTION)),
    })
}

// ============================================================================
// RESOLVER
// ============================================================================

/// Cache key. Holds the whole input so distinct inputs never share an entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ResolutionKey {
    Attributes(SourceLocation),
    StackTrace(Arc<str>),
}

/// Resolves and caches log record source locations. Cheap to share across
/// threads.
#[derive(Clone)]
pub struct SourceLocationResolver {
    cache: Cache<ResolutionKey, Option<Arc<SourceLocation>>>,
}

impl SourceLocationResolver {
    pub fn new(capacity: u64) -> Self {
        Self {
            cache: Cache::builder().max_capacity(capacity).build(),
        }
    }

    /// Location for `record`, or `None` when neither attributes nor a stack
    /// trace identify one.
    pub fn resolve(&self, record: &LogRecord) -> Option<Arc<SourceLocation>> {
        if let Some(location) = location_from_attributes(&record.attributes) {
            let key = ResolutionKey::Attributes(location.clone());
            return self
                .cache
                .get_with(key, || Some(Arc::new(location)));
        }

        let stack = record
            .attributes
            .get(keys::EXCEPTION_STACKTRACE)
            .and_then(JsonValue::as_str)
            .filter(|s| !s.trim().is_empty())?;
        let key = ResolutionKey::StackTrace(Arc::from(stack));
        self.cache.get_with(key, || {
            let parsed = parse_stack_trace(stack);
            tracing::trace!(found = parsed.is_some(), "Parsed stack trace for source location");
            parsed.map(Arc::new)
        })
    }

    /// Attach a location when the record has none. Returns true if one was
    /// attached.
    pub fn enrich(&self, record: &mut LogRecord) -> bool {
        if record.source_location.is_some() {
            return false;
        }
        record.source_location = self.resolve(record);
        record.source_location.is_some()
    }

    /// Enrich every record. Returns how many gained a location.
    pub fn enrich_all(&self, records: &mut [LogRecord]) -> usize {
        let enriched = records
            .iter_mut()
            .map(|r| self.enrich(r))
            .filter(|&added| added)
            .count();
        tracing::debug!(records = records.len(), enriched, "Source locations resolved");
        enriched
    }

    /// Approximate number of cached resolutions.
    pub fn cached_entries(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }
}

impl std::fmt::Debug for SourceLocationResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceLocationResolver")
            .field("entries", &self.cache.entry_count())
            .finish()
    }
}

#[cfg(test)]
#[path = "source_location_tests.rs"]
mod tests;
