//! # Observability
//!
//! Structured logging for the inspector. Rendered output goes to stdout or a
//! file; diagnostics go to stderr through `tracing`.

pub mod logging;

pub use logging::init_logging;
