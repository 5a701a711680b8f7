use std::collections::VecDeque;

use async_trait::async_trait;
use envoy_types::pb::envoy::config::core::v3::{
    address, socket_address::PortSpecifier, Address, CidrRange, SocketAddress,
};
use envoy_types::pb::envoy::config::listener::v3::{
    filter, Filter, FilterChain, FilterChainMatch, Listener,
};
use envoy_types::pb::envoy::extensions::filters::network::http_connection_manager::v3::{
    HttpConnectionManager,
};
use envoy_types::pb::envoy::extensions::filters::network::tcp_proxy::v3::{tcp_proxy, TcpProxy};
use envoy_types::pb::envoy::service::discovery::v3::{DiscoveryRequest, DiscoveryResponse};
use envoy_types::pb::google::protobuf::{Any, UInt32Value};
use prost::{Message, Name};
use xdsctl::xds::{DiscoverySession, ResourceKind};
use xdsctl::{Error, Result};

/// Replays canned responses, then fails like a closed stream.
#[derive(Default)]
pub struct ScriptedSession {
    responses: VecDeque<DiscoveryResponse>,
    pub requests: Vec<DiscoveryRequest>,
}

impl ScriptedSession {
    pub fn new(responses: impl IntoIterator<Item = DiscoveryResponse>) -> Self {
        Self {
            responses: responses.into_iter().collect(),
            requests: Vec::new(),
        }
    }
}

#[async_trait]
impl DiscoverySession for ScriptedSession {
    async fn fetch(&mut self, request: &DiscoveryRequest) -> Result<DiscoveryResponse> {
        self.requests.push(request.clone());
        self.next_response().await
    }

    async fn next_response(&mut self) -> Result<DiscoveryResponse> {
        self.responses
            .pop_front()
            .ok_or_else(|| Error::transport("Control plane closed the stream"))
    }
}

pub fn socket(address: &str, port: u32) -> Option<Address> {
    Some(Address {
        address: Some(address::Address::SocketAddress(SocketAddress {
            address: address.to_string(),
            port_specifier: Some(PortSpecifier::PortValue(port)),
            ..Default::default()
        })),
    })
}

fn typed<M: Message + Name>(message: &M) -> Option<filter::ConfigType> {
    Some(filter::ConfigType::TypedConfig(Any {
        type_url: M::type_url(),
        value: message.encode_to_vec(),
    }))
}

pub fn http_filter() -> Filter {
    let hcm = HttpConnectionManager {
        stat_prefix: "inbound_0.0.0.0_8080".to_string(),
        ..Default::default()
    };
    Filter {
        name: "envoy.filters.network.http_connection_manager".to_string(),
        config_type: typed(&hcm),
    }
}

pub fn tcp_filter(cluster: &str) -> Filter {
    let proxy = TcpProxy {
        stat_prefix: cluster.to_string(),
        cluster_specifier: Some(tcp_proxy::ClusterSpecifier::Cluster(cluster.to_string())),
        ..Default::default()
    };
    Filter {
        name: "envoy.tcp_proxy".to_string(),
        config_type: typed(&proxy),
    }
}

pub fn chain(name: &str, prefix: &str, port: u32, filters: Vec<Filter>) -> FilterChain {
    FilterChain {
        name: name.to_string(),
        filter_chain_match: Some(FilterChainMatch {
            prefix_ranges: vec![CidrRange {
                address_prefix: prefix.to_string(),
                prefix_len: Some(UInt32Value { value: 32 }),
            }],
            destination_port: Some(UInt32Value { value: port }),
            ..Default::default()
        }),
        filters,
        ..Default::default()
    }
}

pub fn listener(name: &str, port: u32, filter_chains: Vec<FilterChain>) -> Listener {
    Listener {
        name: name.to_string(),
        address: socket("0.0.0.0", port),
        filter_chains,
        ..Default::default()
    }
}

pub fn entry<M: Message>(kind: ResourceKind, message: &M) -> Any {
    Any {
        type_url: kind.type_url().to_string(),
        value: message.encode_to_vec(),
    }
}

/// An entry of `kind` whose payload is truncated mid-field.
pub fn malformed(kind: ResourceKind) -> Any {
    Any {
        type_url: kind.type_url().to_string(),
        value: vec![0xff, 0xff, 0xff],
    }
}

pub fn response(kind: ResourceKind, version: &str, resources: Vec<Any>) -> DiscoveryResponse {
    DiscoveryResponse {
        version_info: version.to_string(),
        type_url: kind.type_url().to_string(),
        nonce: format!("nonce-{}", version),
        resources,
        ..Default::default()
    }
}

pub fn listener_response(version: &str, listeners: &[Listener]) -> DiscoveryResponse {
    response(
        ResourceKind::Listener,
        version,
        listeners
            .iter()
            .map(|l| entry(ResourceKind::Listener, l))
            .collect(),
    )
}
