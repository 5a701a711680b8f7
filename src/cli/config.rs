//! Configuration file handling for the xdsctl CLI
//!
//! Loads defaults from ~/.xdsctl/config.toml and resolves each setting from
//! the command line, the config file, the environment and a built-in default.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default control plane address
pub const DEFAULT_XDS_ADDRESS: &str = "http://localhost:15010";

/// Default IP of the impersonated proxy
pub const DEFAULT_PROXY_IP: &str = "127.0.0.1";

/// Default connect timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const XDS_ADDRESS_ENV: &str = "XDSCTL_XDS_ADDRESS";
pub const PROXY_IP_ENV: &str = "XDSCTL_PROXY_IP";

/// CLI configuration stored in ~/.xdsctl/config.toml
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CliConfig {
    /// Control plane address, e.g. http://istiod.istio-system:15010
    pub xds_address: Option<String>,

    /// IP reported for the impersonated proxy
    pub proxy_ip: Option<String>,

    /// Connect timeout in seconds
    pub timeout: Option<u64>,
}

impl CliConfig {
    /// Get the default configuration file path (~/.xdsctl/config.toml)
    pub fn config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .context("Unable to determine home directory")?;

        let mut path = PathBuf::from(home);
        path.push(".xdsctl");
        path.push("config.toml");

        Ok(path)
    }

    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_path()?)
    }

    /// Load configuration from a specific path; a missing file is empty config
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }
}

/// Settings resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSettings {
    pub xds_address: String,
    pub proxy_ip: String,
    pub timeout: u64,
}

/// Resolve every setting against `config`.
///
/// Each setting is taken from, in order:
/// 1. its command line flag
/// 2. the config file
/// 3. its environment variable, where it has one
/// 4. the built-in default
pub fn resolve_settings(
    config: &CliConfig,
    xds_address_flag: Option<String>,
    proxy_ip_flag: Option<String>,
    timeout_flag: Option<u64>,
) -> ResolvedSettings {
    ResolvedSettings {
        xds_address: resolve_xds_address(config, xds_address_flag),
        proxy_ip: resolve_proxy_ip(config, proxy_ip_flag),
        timeout: resolve_timeout(config, timeout_flag),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Resolve the control plane address
pub fn resolve_xds_address(config: &CliConfig, flag: Option<String>) -> String {
    if let Some(address) = non_empty(flag) {
        debug!("Using xDS address from --xds-address flag: {}", address);
        return address;
    }

    if let Some(address) = non_empty(config.xds_address.clone()) {
        debug!("Using xDS address from config file: {}", address);
        return address;
    }

    if let Some(address) = non_empty(std::env::var(XDS_ADDRESS_ENV).ok()) {
        debug!(
            "Using xDS address from {} environment variable: {}",
            XDS_ADDRESS_ENV, address
        );
        return address;
    }

    debug!("Using default xDS address: {}", DEFAULT_XDS_ADDRESS);
    DEFAULT_XDS_ADDRESS.to_string()
}

/// Resolve the IP reported for the impersonated proxy
pub fn resolve_proxy_ip(config: &CliConfig, flag: Option<String>) -> String {
    if let Some(ip) = non_empty(flag) {
        debug!("Using proxy IP from --proxy-ip flag: {}", ip);
        return ip;
    }

    if let Some(ip) = non_empty(config.proxy_ip.clone()) {
        debug!("Using proxy IP from config file: {}", ip);
        return ip;
    }

    if let Some(ip) = non_empty(std::env::var(PROXY_IP_ENV).ok()) {
        debug!("Using proxy IP from {} environment variable: {}", PROXY_IP_ENV, ip);
        return ip;
    }

    debug!("Using default proxy IP: {}", DEFAULT_PROXY_IP);
    DEFAULT_PROXY_IP.to_string()
}

/// Resolve the connect timeout in seconds
pub fn resolve_timeout(config: &CliConfig, flag: Option<u64>) -> u64 {
    if let Some(timeout) = flag {
        debug!("Using timeout from --timeout flag: {} seconds", timeout);
        return timeout;
    }

    if let Some(timeout) = config.timeout {
        debug!("Using timeout from config file: {} seconds", timeout);
        return timeout;
    }

    debug!("Using default timeout: {} seconds", DEFAULT_TIMEOUT_SECS);
    DEFAULT_TIMEOUT_SECS
}
