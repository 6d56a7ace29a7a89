pub mod app;
pub mod core;
pub mod domain;
pub mod ingestion;
pub mod utils;
