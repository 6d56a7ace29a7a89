use clap::{Parser, Subcommand};

use std::path::{Path, PathBuf};

use super::constants::{
    APP_NAME, ENV_CONFIG, ENV_LENIENT_JSON, ENV_NO_VENDOR_MAPPING, ENV_PRETTY,
    ENV_SOURCE_CACHE_CAPACITY, ENV_VENDOR_MAPPERS,
};
use crate::ingestion::PayloadFormat;

#[derive(Parser)]
#[command(name = APP_NAME)]
#[command(version, about = "OTLP trace and log normalizer", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to config file
    #[arg(long, short = 'c', global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// Accept trailing commas in OTLP JSON bodies
    #[arg(long, global = true, env = ENV_LENIENT_JSON)]
    pub lenient_json: Option<bool>,

    /// Vendor mappers to apply, comma separated (e.g. codex)
    #[arg(long, global = true, env = ENV_VENDOR_MAPPERS, value_delimiter = ',')]
    pub vendor_mappers: Option<Vec<String>>,

    /// Disable vendor mapping
    #[arg(long, global = true, env = ENV_NO_VENDOR_MAPPING)]
    pub no_vendor_mapping: bool,

    /// Indent JSON output
    #[arg(long, global = true, env = ENV_PRETTY)]
    pub pretty: bool,

    /// Maximum number of cached source locations
    #[arg(long, global = true, env = ENV_SOURCE_CACHE_CAPACITY)]
    pub cache_capacity: Option<u64>,
}

/// Input encoding selected on the command line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InputFormat {
    /// Decide from the file extension, then from the content
    #[default]
    Auto,
    Json,
    Protobuf,
}

impl InputFormat {
    /// Wire format for one input file.
    pub fn resolve(self, path: &Path, body: &[u8]) -> PayloadFormat {
        match self {
            Self::Json => PayloadFormat::Json,
            Self::Protobuf => PayloadFormat::Protobuf,
            Self::Auto => {
                let extension = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(str::to_ascii_lowercase);
                match extension.as_deref() {
                    Some("json") => PayloadFormat::Json,
                    Some("pb" | "bin" | "protobuf") => PayloadFormat::Protobuf,
                    _ => PayloadFormat::sniff(body),
                }
            }
        }
    }
}

/// Parse input format from CLI string
fn parse_input_format(s: &str) -> Result<InputFormat, String> {
    match s.to_lowercase().as_str() {
        "auto" => Ok(InputFormat::Auto),
        "json" => Ok(InputFormat::Json),
        "protobuf" | "proto" | "pb" => Ok(InputFormat::Protobuf),
        _ => Err(format!(
            "Invalid input format '{}'. Valid options: auto, json, protobuf",
            s
        )),
    }
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Parse OTLP trace export files and print normalized span rows
    Parse {
        /// Export request files (JSON or protobuf)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Input encoding
        #[arg(long, short = 'f', default_value = "auto", value_parser = parse_input_format)]
        format: InputFormat,
    },
    /// Parse OTLP log export files and print records with source locations
    Logs {
        /// Export request files (JSON or protobuf)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Input encoding
        #[arg(long, short = 'f', default_value = "auto", value_parser = parse_input_format)]
        format: InputFormat,
    },
    /// Show the current semantic-convention name of attribute keys
    Normalize {
        #[arg(required = true)]
        keys: Vec<String>,
    },
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub config: Option<PathBuf>,
    pub lenient_json: Option<bool>,
    pub vendor_mappers: Option<Vec<String>>,
    pub no_vendor_mapping: bool,
    pub pretty: bool,
    pub cache_capacity: Option<u64>,
}

/// Parse CLI arguments and return config with command
pub fn parse() -> (CliConfig, Option<Commands>) {
    let cli = Cli::parse();
    let config = CliConfig {
        config: cli.config,
        lenient_json: cli.lenient_json,
        vendor_mappers: cli.vendor_mappers,
        no_vendor_mapping: cli.no_vendor_mapping,
        pretty: cli.pretty,
        cache_capacity: cli.cache_capacity,
    };
    (config, cli.command)
}
