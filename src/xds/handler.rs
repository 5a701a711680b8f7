//! Per-kind request builders and response pipelines.
//!
//! A [`Handler`] is one of four variants, one per resource kind. It builds
//! the outbound [`DiscoveryRequest`] and turns a [`DiscoveryResponse`] into
//! an [`Outcome`]: decode, filter, render, or report not-found.

use std::collections::HashSet;
use std::fmt;

use envoy_types::pb::envoy::config::cluster::v3::Cluster;
use envoy_types::pb::envoy::config::core::v3::Node;
use envoy_types::pb::envoy::config::endpoint::v3::ClusterLoadAssignment;
use envoy_types::pb::envoy::config::listener::v3::Listener;
use envoy_types::pb::envoy::config::route::v3::RouteConfiguration;
use envoy_types::pb::envoy::service::discovery::v3::{DiscoveryRequest, DiscoveryResponse};
use serde_json::Value;
use tracing::debug;

use super::cluster::{select_clusters, ClusterCriteria};
use super::decode::decode_resources;
use super::listener::{filter_listener, ListenerCriteria};
use super::raw;
use super::render::{cluster_table, listener_table, render_raw, OutputFormat};
use super::resources::ResourceKind;
use crate::Result;

/// Result of processing one response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Rendered text for the selected objects.
    Rendered(String),
    /// Nothing satisfied the criteria.
    NotFound(NotFound),
}

impl Outcome {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Outcome::NotFound(_))
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Rendered(text) => f.write_str(text),
            Outcome::NotFound(not_found) => write!(f, "{}", not_found),
        }
    }
}

/// Not-found diagnostic carrying a short listing of every decoded object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotFound {
    pub kind: ResourceKind,
    pub criteria: String,
    /// Names of every object seen, in response order, each once.
    pub seen: Vec<String>,
    pub listing: String,
}

impl fmt::Display for NotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Cannot find any {} matching {}. Seen:", self.kind, self.criteria)?;
        f.write_str(&self.listing)
    }
}

/// One object for a single match, a list for several.
fn raw_selection<T: fmt::Debug>(selected: &[T]) -> Value {
    match selected {
        [single] => raw::to_value(single),
        many => Value::Array(many.iter().map(raw::to_value).collect()),
    }
}

/// First occurrence of each name, in order.
fn unique_by_name<'a, T>(items: &'a [T], name: impl Fn(&T) -> &str) -> Vec<&'a T> {
    let mut seen = HashSet::new();
    items
        .iter()
        .filter(|item| seen.insert(name(item).to_string()))
        .collect()
}

/// Listener discovery: filter, classify, render.
#[derive(Debug, Clone)]
pub struct ListenerHandler {
    pub criteria: ListenerCriteria,
    pub format: OutputFormat,
}

impl ListenerHandler {
    pub fn new(criteria: ListenerCriteria, format: OutputFormat) -> Self {
        Self { criteria, format }
    }

    fn on_response(&self, response: &DiscoveryResponse) -> Result<Outcome> {
        let decoded = decode_resources::<Listener>(&response.resources, ResourceKind::Listener);
        let selected: Vec<Listener> = decoded
            .items
            .iter()
            .filter_map(|l| filter_listener(l, &self.criteria))
            .collect();

        debug!(
            received = response.resources.len(),
            decoded = decoded.items.len(),
            selected = selected.len(),
            "Filtered listeners"
        );

        if selected.is_empty() {
            let unique = unique_by_name(&decoded.items, |l| l.name.as_str());
            return Ok(Outcome::NotFound(NotFound {
                kind: ResourceKind::Listener,
                criteria: self.criteria.describe(),
                seen: unique.iter().map(|l| l.name.clone()).collect(),
                listing: listener_table(unique),
            }));
        }

        let text = match self.format {
            OutputFormat::Short => listener_table(&selected),
            format if self.criteria.is_empty() => render_raw(&raw::to_value(response), format)?,
            format => render_raw(&raw_selection(&selected), format)?,
        };

        Ok(Outcome::Rendered(text))
    }
}

/// Cluster discovery: decompose names, filter, render.
#[derive(Debug, Clone)]
pub struct ClusterHandler {
    pub criteria: ClusterCriteria,
    pub format: OutputFormat,
}

impl ClusterHandler {
    pub fn new(criteria: ClusterCriteria, format: OutputFormat) -> Self {
        Self { criteria, format }
    }

    fn on_response(&self, response: &DiscoveryResponse) -> Result<Outcome> {
        let decoded = decode_resources::<Cluster>(&response.resources, ResourceKind::Cluster);
        let selected = select_clusters(&decoded.items, &self.criteria);

        debug!(
            received = response.resources.len(),
            decoded = decoded.items.len(),
            selected = selected.len(),
            "Filtered clusters"
        );

        if selected.is_empty() {
            let unique = unique_by_name(&decoded.items, |c| c.name.as_str());
            return Ok(Outcome::NotFound(NotFound {
                kind: ResourceKind::Cluster,
                criteria: self.criteria.describe(),
                seen: unique.iter().map(|c| c.name.clone()).collect(),
                listing: cluster_table(unique),
            }));
        }

        let text = match self.format {
            OutputFormat::Short => cluster_table(selected),
            format if self.criteria.is_empty() => render_raw(&raw::to_value(response), format)?,
            format => render_raw(&raw_selection(&selected), format)?,
        };

        Ok(Outcome::Rendered(text))
    }
}

/// Endpoint discovery for an explicit list of cluster names. Always raw.
#[derive(Debug, Clone)]
pub struct EndpointHandler {
    pub resources: Vec<String>,
    pub format: OutputFormat,
}

impl EndpointHandler {
    pub fn new(resources: Vec<String>, format: OutputFormat) -> Self {
        Self { resources, format }
    }

    fn on_response(&self, response: &DiscoveryResponse) -> Result<Outcome> {
        let decoded =
            decode_resources::<ClusterLoadAssignment>(&response.resources, ResourceKind::Endpoint);
        debug!(
            received = response.resources.len(),
            decoded = decoded.items.len(),
            failed = decoded.failures.len(),
            "Decoded endpoints"
        );

        // Every entry is rendered, failed ones under their type URL.
        let text = render_raw(&raw::to_value(response), self.format)?;
        Ok(Outcome::Rendered(text))
    }
}

/// Route discovery for an explicit list of route configuration names. Always raw.
#[derive(Debug, Clone)]
pub struct RouteHandler {
    pub resources: Vec<String>,
    pub format: OutputFormat,
}

impl RouteHandler {
    pub fn new(resources: Vec<String>, format: OutputFormat) -> Self {
        Self { resources, format }
    }

    fn on_response(&self, response: &DiscoveryResponse) -> Result<Outcome> {
        let decoded =
            decode_resources::<RouteConfiguration>(&response.resources, ResourceKind::Route);
        debug!(
            received = response.resources.len(),
            decoded = decoded.items.len(),
            failed = decoded.failures.len(),
            "Decoded route configurations"
        );

        let text = render_raw(&raw::to_value(response), self.format)?;
        Ok(Outcome::Rendered(text))
    }
}

/// One handler per resource kind, dispatched uniformly by the caller.
#[derive(Debug, Clone)]
pub enum Handler {
    Listener(ListenerHandler),
    Cluster(ClusterHandler),
    Endpoint(EndpointHandler),
    Route(RouteHandler),
}

impl Handler {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Handler::Listener(_) => ResourceKind::Listener,
            Handler::Cluster(_) => ResourceKind::Cluster,
            Handler::Endpoint(_) => ResourceKind::Endpoint,
            Handler::Route(_) => ResourceKind::Route,
        }
    }

    /// Request for this kind on behalf of `node`. Only endpoint and route
    /// requests carry resource names.
    pub fn build_request(&self, node: &Node) -> DiscoveryRequest {
        let resource_names = match self {
            Handler::Endpoint(h) => h.resources.clone(),
            Handler::Route(h) => h.resources.clone(),
            Handler::Listener(_) | Handler::Cluster(_) => Vec::new(),
        };

        DiscoveryRequest {
            node: Some(node.clone()),
            type_url: self.kind().type_url().to_string(),
            resource_names,
            ..Default::default()
        }
    }

    /// Decode, filter and render one response.
    pub fn on_response(&self, response: &DiscoveryResponse) -> Result<Outcome> {
        match self {
            Handler::Listener(h) => h.on_response(response),
            Handler::Cluster(h) => h.on_response(response),
            Handler::Endpoint(h) => h.on_response(response),
            Handler::Route(h) => h.on_response(response),
        }
    }
}
