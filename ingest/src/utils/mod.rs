pub mod otlp;
pub mod time;
