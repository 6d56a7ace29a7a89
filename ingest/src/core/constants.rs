// =============================================================================
// Application Identity
// =============================================================================

/// Application name (for display and the binary)
pub const APP_NAME: &str = "otlp-ingest";

/// Application name in lowercase snake case (for log filters)
pub const APP_NAME_LOWER: &str = "otlp_ingest";

/// Unix-style dotfile folder name
pub const APP_DOT_FOLDER: &str = ".otlp-ingest";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name
pub const CONFIG_FILE_NAME: &str = "otlp-ingest.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "OTLP_INGEST_CONFIG";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "OTLP_INGEST_LOG";

// =============================================================================
// Environment Variables - Ingestion
// =============================================================================

/// Environment variable to accept trailing commas in OTLP JSON
pub const ENV_LENIENT_JSON: &str = "OTLP_INGEST_LENIENT_JSON";

/// Environment variable for the comma-separated vendor mapper list
pub const ENV_VENDOR_MAPPERS: &str = "OTLP_INGEST_VENDOR_MAPPERS";

/// Environment variable to disable vendor mapping entirely
pub const ENV_NO_VENDOR_MAPPING: &str = "OTLP_INGEST_NO_VENDOR_MAPPING";

// =============================================================================
// Environment Variables - Output and Source Locations
// =============================================================================

/// Environment variable for indented JSON output
pub const ENV_PRETTY: &str = "OTLP_INGEST_PRETTY";

/// Environment variable for the source location cache size
pub const ENV_SOURCE_CACHE_CAPACITY: &str = "OTLP_INGEST_SOURCE_CACHE_CAPACITY";

// =============================================================================
// Defaults
// =============================================================================

/// Trailing commas are tolerated unless disabled
pub const DEFAULT_LENIENT_JSON: bool = true;

/// Vendor mappers applied when none are configured
pub const DEFAULT_VENDOR_MAPPERS: &[&str] = &["codex"];

/// Maximum number of cached source location resolutions
pub const DEFAULT_SOURCE_CACHE_CAPACITY: u64 = 10_000;
