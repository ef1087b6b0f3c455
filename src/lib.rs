pub mod align;
pub mod core;
pub mod graph;
pub mod mapper;
pub mod pipeline;
pub mod postprocess;
pub mod providers;
pub mod schema;

use tracing_subscriber::EnvFilter;

pub use crate::core::errors::{AppError, AppResult};
pub use pipeline::DocumentPipeline;

pub const LOG_ENV: &str = "DATASHEET_RECON_LOG";

fn log_level_from_env() -> Option<&'static str> {
    let level = match std::env::var(LOG_ENV).ok()?.to_ascii_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "warn" => "warn",
        "error" => "error",
        _ => "info",
    };
    Some(level)
}

/// Installs the fmt subscriber once. The level comes from
/// `DATASHEET_RECON_LOG`, then `RUST_LOG` directives, then `info`.
pub fn init_logging() {
    let filter = match log_level_from_env() {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
