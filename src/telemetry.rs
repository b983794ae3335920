//! Telemetry (A4): tracing subscriber setup and the HTTP access-log layer.
//!
//! `tracing` + `tracing-subscriber` setup: an `EnvFilter` driven by
//! `RUST_LOG`, JSON output when a log file is configured (for log-shipping
//! pipelines), human-readable otherwise.

use std::fs::OpenOptions;
use std::path::Path;

use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

/// Initializes the global tracing subscriber. Call once, at process start,
/// before anything else logs.
pub fn init(log_file_path: Option<&Path>) -> Result<(), std::io::Error> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_file_path {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .with_writer(file)
                .init();
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
    Ok(())
}

/// Per-request span/event layer for the axum router. Kept as a free function
/// so `server.rs` can attach it with `.layer(telemetry::http_trace_layer())`
/// without needing to know the concrete `Span` type it produces.
pub fn http_trace_layer() -> TraceLayer<tower_http::classify::SharedClassifier<tower_http::classify::ServerErrorsAsFailures>> {
    TraceLayer::new_for_http()
}
