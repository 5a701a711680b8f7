//! Listener filtering and classification.
//!
//! Listeners are matched against operator criteria, optionally narrowed to
//! the filter chains that satisfy chain-level criteria, and classified by
//! inspecting their network filters and transport sockets.

use std::fmt;

use envoy_types::pb::envoy::config::core::v3::{
    address::Address as AddressType, socket_address::PortSpecifier, transport_socket,
};
use envoy_types::pb::envoy::config::listener::v3::{filter, Filter, FilterChain, Listener};
use envoy_types::pb::envoy::extensions::filters::network::tcp_proxy::v3::{
    tcp_proxy::ClusterSpecifier, TcpProxy,
};
use envoy_types::pb::envoy::extensions::transport_sockets::tls::v3::DownstreamTlsContext;
use prost::Message;
use tracing::warn;

use super::resources::DOWNSTREAM_TLS_CONTEXT_TYPE_URL;
use crate::{Error, Result};

/// HTTP connection manager network filter names (current and legacy).
pub const HTTP_CONNECTION_MANAGER_FILTERS: [&str; 2] =
    ["envoy.filters.network.http_connection_manager", "envoy.http_connection_manager"];

/// TCP proxy network filter names (current and legacy).
pub const TCP_PROXY_FILTERS: [&str; 2] = ["envoy.filters.network.tcp_proxy", "envoy.tcp_proxy"];

/// Conventional drop target; TCP proxies pointing at it are not real upstreams.
pub const BLACK_HOLE_CLUSTER: &str = "BlackHoleCluster";

/// Listener name values that match every listener.
const WILDCARD_NAMES: [&str; 2] = ["*", "all"];

/// Operator-supplied listener filter. Unset fields impose no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListenerCriteria {
    pub name: Option<String>,
    pub address: Option<String>,
    pub port: Option<u32>,
    pub chain_address: Option<String>,
    pub chain_port: Option<u32>,
}

impl ListenerCriteria {
    fn name(&self) -> Option<&str> {
        set_str(&self.name).filter(|name| !WILDCARD_NAMES.contains(name))
    }

    fn address(&self) -> Option<&str> {
        set_str(&self.address)
    }

    fn port(&self) -> Option<u32> {
        set_port(self.port)
    }

    fn chain_address(&self) -> Option<&str> {
        set_str(&self.chain_address)
    }

    fn chain_port(&self) -> Option<u32> {
        set_port(self.chain_port)
    }

    /// True when any chain-level criterion is set.
    pub fn has_chain_criteria(&self) -> bool {
        self.chain_address().is_some() || self.chain_port().is_some()
    }

    /// True when no criterion at all is set.
    pub fn is_empty(&self) -> bool {
        self.name().is_none()
            && self.address().is_none()
            && self.port().is_none()
            && !self.has_chain_criteria()
    }

    /// Human-readable summary used in not-found diagnostics.
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(name) = self.name() {
            parts.push(format!("name={:?}", name));
        }
        if let Some(address) = self.address() {
            parts.push(format!("address={:?}", address));
        }
        if let Some(port) = self.port() {
            parts.push(format!("port={}", port));
        }
        if let Some(address) = self.chain_address() {
            parts.push(format!("chain-address={:?}", address));
        }
        if let Some(port) = self.chain_port() {
            parts.push(format!("chain-port={}", port));
        }
        if parts.is_empty() {
            "any filter".to_string()
        } else {
            parts.join(", ")
        }
    }
}

fn set_str(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn set_port(port: Option<u32>) -> Option<u32> {
    port.filter(|p| *p != 0)
}

/// Derived listener protocol classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerType {
    Http,
    Tcp,
    HttpTcp,
    Unknown,
}

impl fmt::Display for ListenerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListenerType::Http => write!(f, "HTTP"),
            ListenerType::Tcp => write!(f, "TCP"),
            ListenerType::HttpTcp => write!(f, "HTTP+TCP"),
            ListenerType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Derived connection security of a filter chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportProtocol {
    Tcp,
    Tls,
    Mtls,
    Unknown,
}

impl fmt::Display for TransportProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportProtocol::Tcp => write!(f, "TCP"),
            TransportProtocol::Tls => write!(f, "TLS"),
            TransportProtocol::Mtls => write!(f, "MTLS"),
            TransportProtocol::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Bound address of a listener, empty when it is not a socket address.
pub fn listener_address(listener: &Listener) -> &str {
    match listener.address.as_ref().and_then(|a| a.address.as_ref()) {
        Some(AddressType::SocketAddress(socket)) => &socket.address,
        _ => "",
    }
}

/// Bound port of a listener, `None` for named ports and non-socket addresses.
pub fn listener_port(listener: &Listener) -> Option<u32> {
    match listener.address.as_ref().and_then(|a| a.address.as_ref()) {
        Some(AddressType::SocketAddress(socket)) => match socket.port_specifier {
            Some(PortSpecifier::PortValue(port)) => Some(port),
            _ => None,
        },
        _ => None,
    }
}

/// Listener-level match: name (with wildcards), bound address, bound port.
pub fn match_listener(listener: &Listener, criteria: &ListenerCriteria) -> bool {
    if let Some(name) = criteria.name() {
        if listener.name != name {
            return false;
        }
    }
    if let Some(address) = criteria.address() {
        if listener_address(listener) != address {
            return false;
        }
    }
    if let Some(port) = criteria.port() {
        if listener_port(listener) != Some(port) {
            return false;
        }
    }
    true
}

/// Chain-level match: the address must equal one of the chain's prefix ranges
/// and the port must equal the chain's destination port.
pub fn match_filter_chain(chain: &FilterChain, criteria: &ListenerCriteria) -> bool {
    let chain_match = chain.filter_chain_match.as_ref();

    if let Some(address) = criteria.chain_address() {
        let found = chain_match
            .map(|m| m.prefix_ranges.iter().any(|range| range.address_prefix == address))
            .unwrap_or(false);
        if !found {
            return false;
        }
    }
    if let Some(port) = criteria.chain_port() {
        let destination = chain_match
            .and_then(|m| m.destination_port.as_ref())
            .map(|p| p.value);
        if destination != Some(port) {
            return false;
        }
    }
    true
}

/// Apply listener and chain criteria.
///
/// Returns `None` when the listener itself does not match. With chain
/// criteria set, the result is a new listener holding only the name, the
/// address and the matching chains in their original order; it may hold
/// zero chains.
pub fn filter_listener(listener: &Listener, criteria: &ListenerCriteria) -> Option<Listener> {
    if !match_listener(listener, criteria) {
        return None;
    }
    if !criteria.has_chain_criteria() {
        return Some(listener.clone());
    }

    let filter_chains = listener
        .filter_chains
        .iter()
        .filter(|chain| match_filter_chain(chain, criteria))
        .cloned()
        .collect();

    Some(Listener {
        name: listener.name.clone(),
        address: listener.address.clone(),
        filter_chains,
        ..Default::default()
    })
}

fn typed_config(filter: &Filter) -> Option<&envoy_types::pb::google::protobuf::Any> {
    match filter.config_type.as_ref() {
        Some(filter::ConfigType::TypedConfig(any)) => Some(any),
        _ => None,
    }
}

/// Whether a TCP proxy filter forwards to the black hole cluster.
fn targets_black_hole(filter: &Filter) -> bool {
    let Some(any) = typed_config(filter) else {
        return false;
    };

    match TcpProxy::decode(&any.value[..]) {
        Ok(proxy) => match proxy.cluster_specifier {
            Some(ClusterSpecifier::Cluster(cluster)) => cluster == BLACK_HOLE_CLUSTER,
            Some(ClusterSpecifier::WeightedClusters(weighted)) => {
                weighted.clusters.iter().any(|c| c.name == BLACK_HOLE_CLUSTER)
            }
            None => false,
        },
        // Unparseable config: fall back to scanning the raw bytes.
        Err(_) => String::from_utf8_lossy(&any.value).contains(BLACK_HOLE_CLUSTER),
    }
}

/// Classify a listener by counting HTTP connection manager and TCP proxy
/// filters across all chains. TCP proxies to the black hole are not counted.
pub fn classify_listener(listener: &Listener) -> ListenerType {
    let mut http = 0usize;
    let mut tcp = 0usize;

    for chain in &listener.filter_chains {
        for filter in &chain.filters {
            if HTTP_CONNECTION_MANAGER_FILTERS.contains(&filter.name.as_str()) {
                http += 1;
            } else if TCP_PROXY_FILTERS.contains(&filter.name.as_str())
                && !targets_black_hole(filter)
            {
                tcp += 1;
            }
        }
    }

    match (http > 0, tcp > 0) {
        (true, false) => ListenerType::Http,
        (true, true) => ListenerType::HttpTcp,
        (false, true) => ListenerType::Tcp,
        (false, false) => ListenerType::Unknown,
    }
}

fn decode_tls_context(chain: &FilterChain) -> Result<Option<DownstreamTlsContext>> {
    let Some(socket) = chain.transport_socket.as_ref() else {
        return Ok(None);
    };

    let any = match socket.config_type.as_ref() {
        Some(transport_socket::ConfigType::TypedConfig(any)) => any,
        _ => {
            return Err(Error::decode(
                socket.name.clone(),
                "transport socket has no typed config",
            ));
        }
    };
    if any.type_url != DOWNSTREAM_TLS_CONTEXT_TYPE_URL {
        return Err(Error::decode(any.type_url.clone(), "not a downstream TLS context"));
    }

    DownstreamTlsContext::decode(&any.value[..])
        .map(Some)
        .map_err(|e| Error::decode(any.type_url.clone(), e.to_string()))
}

/// Connection security of a filter chain.
pub fn transport_protocol(chain: &FilterChain) -> TransportProtocol {
    match decode_tls_context(chain) {
        Ok(None) => TransportProtocol::Tcp,
        Ok(Some(context)) => {
            if context.require_client_certificate.is_some_and(|v| v.value) {
                TransportProtocol::Mtls
            } else {
                TransportProtocol::Tls
            }
        }
        Err(error) => {
            warn!(chain = %chain.name, error = %error, "Cannot decode transport socket");
            TransportProtocol::Unknown
        }
    }
}
