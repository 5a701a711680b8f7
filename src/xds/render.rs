//! Output rendering: raw json/yaml dumps and short tabular summaries.

use std::fmt;
use std::str::FromStr;

use envoy_types::pb::envoy::config::cluster::v3::Cluster;
use envoy_types::pb::envoy::config::listener::v3::Listener;
use serde::Serialize;

use super::cluster::{cluster_type, decompose_name, transport_socket_match_names, PLACEHOLDER};
use super::listener::{classify_listener, listener_address, listener_port, transport_protocol};
use crate::{Error, Result};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Short,
    Json,
    Yaml,
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "short" => Ok(OutputFormat::Short),
            "json" => Ok(OutputFormat::Json),
            "yaml" => Ok(OutputFormat::Yaml),
            _ => Err(Error::config(format!(
                "Unsupported output format: '{}'. Use 'short', 'json', or 'yaml'.",
                s
            ))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Short => write!(f, "short"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Yaml => write!(f, "yaml"),
        }
    }
}

/// Serialize `data` in a raw format. `Short` falls back to JSON.
pub fn render_raw<T: Serialize>(data: &T, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Yaml => Ok(serde_yaml::to_string(data)?),
        OutputFormat::Json | OutputFormat::Short => {
            let mut json = serde_json::to_string_pretty(data)?;
            json.push('\n');
            Ok(json)
        }
    }
}

/// Left-aligned text table with columns sized to their widest cell.
struct Table {
    headers: Vec<&'static str>,
    rows: Vec<Vec<String>>,
}

impl Table {
    fn new(headers: Vec<&'static str>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    fn render(&self) -> String {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.len()).collect();
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.len());
            }
        }

        let line = |cells: Vec<&str>| {
            let padded: Vec<String> = cells
                .iter()
                .zip(&widths)
                .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
                .collect();
            format!("{}\n", padded.join("  ").trim_end())
        };

        let mut out = line(self.headers.clone());
        let total: usize = widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1);
        out.push_str(&"-".repeat(total));
        out.push('\n');
        for row in &self.rows {
            out.push_str(&line(row.iter().map(String::as_str).collect()));
        }
        out
    }
}

fn join_or_placeholder(items: &[String]) -> String {
    if items.is_empty() {
        PLACEHOLDER.to_string()
    } else {
        items.join(",")
    }
}

/// One row per listener: name, address, port, type, per-chain transport.
pub fn listener_table<'a, I>(listeners: I) -> String
where
    I: IntoIterator<Item = &'a Listener>,
{
    let mut table = Table::new(vec!["NAME", "ADDRESS", "PORT", "TYPE", "TRANSPORT"]);
    for listener in listeners {
        let transports: Vec<String> = listener
            .filter_chains
            .iter()
            .map(|c| transport_protocol(c).to_string())
            .collect();
        table.push(vec![
            listener.name.clone(),
            listener_address(listener).to_string(),
            listener_port(listener)
                .map_or_else(|| PLACEHOLDER.to_string(), |p| p.to_string()),
            classify_listener(listener).to_string(),
            join_or_placeholder(&transports),
        ]);
    }
    table.render()
}

/// One row per cluster: decomposed name, type tag and transport socket matches.
pub fn cluster_table<'a, I>(clusters: I) -> String
where
    I: IntoIterator<Item = &'a Cluster>,
{
    let mut table = Table::new(vec![
        "SERVICE FQDN",
        "PORT",
        "SUBSET",
        "DIRECTION",
        "TYPE",
        "TRANSPORT MATCHES",
    ]);
    for cluster in clusters {
        let key = decompose_name(&cluster.name);
        table.push(vec![
            key.fqdn().to_string(),
            key.port().to_string(),
            key.subset().to_string(),
            key.direction().to_string(),
            cluster_type(cluster),
            join_or_placeholder(&transport_socket_match_names(cluster)),
        ]);
    }
    table.render()
}
