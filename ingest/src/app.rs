//! Core application

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use opentelemetry_proto::tonic::collector::logs::v1::ExportLogsServiceRequest;

use crate::core::cli::{self, CliConfig, Commands, InputFormat};
use crate::core::config::AppConfig;
use crate::core::constants::{APP_NAME_LOWER, ENV_LOG};
use crate::domain::logs::{LogRecord, SourceLocationResolver};
use crate::domain::semconv::{is_deprecated, normalize};
use crate::domain::vendor::VendorRegistry;
use crate::ingestion::sink::write_json_line;
use crate::ingestion::{JsonLinesSink, SpanSink, TraceIngestor, decode_request};

pub struct CoreApp {
    pub config: AppConfig,
    pub ingestor: TraceIngestor,
    pub resolver: SourceLocationResolver,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("Application starting");

        let (cli_config, command) = cli::parse();
        tracing::trace!(command = ?command, "Parsed command");

        match command {
            Some(Commands::Normalize { keys }) => Self::print_normalized(&keys),
            Some(Commands::Parse { files, format }) => {
                Self::init(&cli_config)?.parse_traces(&files, format)
            }
            Some(Commands::Logs { files, format }) => {
                Self::init(&cli_config)?.parse_logs(&files, format)
            }
            None => anyhow::bail!("No command given. Run with --help for usage"),
        }
    }

    fn init(cli: &CliConfig) -> Result<Self> {
        let config = AppConfig::load(cli)?;

        let vendors = VendorRegistry::from_names(&config.ingest.vendor_mappers)
            .context("Invalid vendor mapper configuration")?;
        tracing::debug!(vendors = ?vendors.names(), "Vendor mappers initialized");

        let ingestor = TraceIngestor::new(config.ingest.reader_options(), vendors);
        let resolver = SourceLocationResolver::new(config.source_location.cache_capacity);

        Ok(Self {
            config,
            ingestor,
            resolver,
        })
    }

    fn parse_traces(&self, files: &[PathBuf], format: InputFormat) -> Result<()> {
        let batches = read_inputs(files, |path, body| {
            let payload = format.resolve(path, &body);
            tracing::debug!(path = %path.display(), encoding = %payload, bytes = body.len(), "Parsing trace export");
            Ok(self.ingestor.ingest_as(&body, payload)?)
        })?;

        let sink = JsonLinesSink::new(std::io::stdout()).pretty(self.config.output.pretty);
        let mut spans = 0;
        for batch in &batches {
            sink.write_batch(batch)?;
            spans += batch.len();
        }
        tracing::info!(files = files.len(), spans, "Trace files parsed");
        Ok(())
    }

    fn parse_logs(&self, files: &[PathBuf], format: InputFormat) -> Result<()> {
        let batches = read_inputs(files, |path, body| {
            let payload = format.resolve(path, &body);
            tracing::debug!(path = %path.display(), encoding = %payload, bytes = body.len(), "Parsing log export");
            let request: ExportLogsServiceRequest = decode_request(&body, payload)?;
            let mut records = LogRecord::from_request(&request);
            self.resolver.enrich_all(&mut records);
            Ok(records)
        })?;

        let mut out = std::io::stdout().lock();
        let mut records = 0;
        for record in batches.iter().flatten() {
            write_json_line(&mut out, record, self.config.output.pretty)?;
            records += 1;
        }
        out.flush()?;
        tracing::info!(files = files.len(), records, "Log files parsed");
        Ok(())
    }

    fn print_normalized(keys: &[String]) -> Result<()> {
        for key in keys {
            let normalized = normalize(key);
            if is_deprecated(key) {
                println!("{} -> {} (deprecated)", key, normalized);
            } else {
                println!("{} -> {}", key, normalized);
            }
        }
        Ok(())
    }

    fn init_logging() {
        let default_filter = format!("info,{}=info", APP_NAME_LOWER);

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(default_filter);

        // stdout carries the JSON lines
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }
}

/// Read and decode every input on its own scoped thread. Results keep the
/// order of `files`; the first failure is returned.
fn read_inputs<T, F>(files: &[PathBuf], decode: F) -> Result<Vec<T>>
where
    T: Send,
    F: Fn(&Path, Vec<u8>) -> Result<T> + Sync,
{
    std::thread::scope(|scope| {
        let decode = &decode;
        let handles: Vec<_> = files
            .iter()
            .map(|path| {
                scope.spawn(move || {
                    let body = fs::read(path).with_context(|| {
                        format!("Failed to read input file: {}", path.display())
                    })?;
                    decode(path, body)
                        .with_context(|| format!("Failed to parse input file: {}", path.display()))
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .map_err(|_| anyhow::anyhow!("Input worker thread panicked"))
                    .and_then(|result| result)
            })
            .collect()
    })
}
