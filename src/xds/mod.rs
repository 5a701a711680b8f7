//! Envoy xDS (eXtended Discovery Service) inspection
//!
//! Fetches LDS, CDS, EDS and RDS resources from a control plane on behalf
//! of a proxy, then decodes, filters, classifies and renders them.

pub mod cluster;
pub mod decode;
pub mod handler;
pub mod listener;
pub mod raw;
pub mod render;
pub mod resolver;
pub mod resources;
pub mod session;

pub use cluster::{ClusterCriteria, SubsetKey};
pub use handler::{
    ClusterHandler, EndpointHandler, Handler, ListenerHandler, NotFound, Outcome, RouteHandler,
};
pub use listener::{ListenerCriteria, ListenerType, TransportProtocol};
pub use render::OutputFormat;
pub use resolver::{ProxyClass, ProxyIdentity, ProxyResolver, StaticResolver};
pub use resources::ResourceKind;
pub use session::{inspect, AdsSession, DiscoverySession, InspectOptions};
