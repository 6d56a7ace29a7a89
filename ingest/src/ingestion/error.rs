//! Ingestion errors

use thiserror::Error;

/// A request body that could not be decoded. The whole request is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("JSON decode error at byte {offset}: {reason}")]
    Json { offset: usize, reason: String },

    #[error("protobuf decode error: {0}")]
    Protobuf(String),

    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),
}

/// Failure writing a batch to its destination.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Decode or sink failure from the ingestion pipeline.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Sink(#[from] SinkError),
}
