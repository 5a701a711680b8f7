//! Resource kinds served over the discovery protocol and their v3 type URLs.

use std::fmt;

pub const CLUSTER_TYPE_URL: &str = "type.googleapis.com/envoy.config.cluster.v3.Cluster";
pub const ROUTE_TYPE_URL: &str = "type.googleapis.com/envoy.config.route.v3.RouteConfiguration";
pub const LISTENER_TYPE_URL: &str = "type.googleapis.com/envoy.config.listener.v3.Listener";
pub const ENDPOINT_TYPE_URL: &str =
    "type.googleapis.com/envoy.config.endpoint.v3.ClusterLoadAssignment";
pub const DOWNSTREAM_TLS_CONTEXT_TYPE_URL: &str =
    "type.googleapis.com/envoy.extensions.transport_sockets.tls.v3.DownstreamTlsContext";

/// The four resource kinds this client knows how to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Listener,
    Cluster,
    Endpoint,
    Route,
}

impl ResourceKind {
    pub fn type_url(&self) -> &'static str {
        match self {
            ResourceKind::Listener => LISTENER_TYPE_URL,
            ResourceKind::Cluster => CLUSTER_TYPE_URL,
            ResourceKind::Endpoint => ENDPOINT_TYPE_URL,
            ResourceKind::Route => ROUTE_TYPE_URL,
        }
    }

    /// Short protocol name (lds, cds, eds, rds)
    pub fn short_name(&self) -> &'static str {
        match self {
            ResourceKind::Listener => "lds",
            ResourceKind::Cluster => "cds",
            ResourceKind::Endpoint => "eds",
            ResourceKind::Route => "rds",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Listener => write!(f, "listener"),
            ResourceKind::Cluster => write!(f, "cluster"),
            ResourceKind::Endpoint => write!(f, "endpoint"),
            ResourceKind::Route => write!(f, "route"),
        }
    }
}
