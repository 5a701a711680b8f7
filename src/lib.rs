//! # xdsctl
//!
//! A diagnostic client for xDS control planes. It asks the control plane
//! for listeners, clusters, endpoints or routes on behalf of a chosen proxy
//! and prints what that proxy would receive, either verbatim or filtered
//! and summarized.
//!
//! ```text
//! CLI → ProxyResolver → Handler::build_request → DiscoverySession::fetch
//!                                      ↓
//!        output ← render ← filter/classify ← decode
//! ```

pub mod cli;
pub mod errors;
pub mod observability;
pub mod xds;

// Re-export commonly used types and traits
pub use errors::{Error, Result};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
