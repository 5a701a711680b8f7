//! Proxy identity resolution.
//!
//! Requests are sent on behalf of a concrete data-plane proxy. The operator
//! names it with a short tag; a [`ProxyResolver`] turns that tag and a
//! [`ProxyClass`] into the node identity the control plane expects.

use std::fmt;
use std::str::FromStr;

use envoy_types::pb::envoy::config::core::v3::Node;

use crate::{Error, Result};

/// User agent reported in the node of every request.
pub const USER_AGENT: &str = "xdsctl";

/// Namespace assumed when a tag carries none.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Separator between the fields of a mesh node id.
const NODE_ID_SEPARATOR: char = '~';

/// Role of the impersonated proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProxyClass {
    #[default]
    Sidecar,
    Ingress,
    Router,
}

impl ProxyClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyClass::Sidecar => "sidecar",
            ProxyClass::Ingress => "ingress",
            ProxyClass::Router => "router",
        }
    }
}

impl FromStr for ProxyClass {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "sidecar" => Ok(ProxyClass::Sidecar),
            "ingress" => Ok(ProxyClass::Ingress),
            "router" => Ok(ProxyClass::Router),
            _ => Err(Error::config(format!(
                "Unsupported proxy type: '{}'. Use 'sidecar', 'ingress', or 'router'.",
                s
            ))),
        }
    }
}

impl fmt::Display for ProxyClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Concrete identity a request is sent on behalf of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyIdentity {
    pub id: String,
    pub cluster: String,
}

impl ProxyIdentity {
    pub fn node(&self) -> Node {
        Node {
            id: self.id.clone(),
            cluster: self.cluster.clone(),
            user_agent_name: USER_AGENT.to_string(),
            ..Default::default()
        }
    }
}

/// Maps an operator tag and proxy class to a proxy identity.
pub trait ProxyResolver {
    fn resolve(&self, tag: &str, class: ProxyClass) -> Result<ProxyIdentity>;
}

/// Builds identities locally from `pod[.namespace]` tags, without asking a
/// cluster API.
#[derive(Debug, Clone)]
pub struct StaticResolver {
    proxy_ip: String,
}

impl StaticResolver {
    pub fn new(proxy_ip: impl Into<String>) -> Self {
        Self {
            proxy_ip: proxy_ip.into(),
        }
    }
}

impl ProxyResolver for StaticResolver {
    fn resolve(&self, tag: &str, class: ProxyClass) -> Result<ProxyIdentity> {
        let tag = tag.trim();
        if tag.is_empty() {
            return Err(Error::config("Proxy tag must not be empty"));
        }

        // Already a full node id.
        if tag.contains(NODE_ID_SEPARATOR) {
            return Ok(ProxyIdentity {
                id: tag.to_string(),
                cluster: String::new(),
            });
        }

        let (pod, namespace) = match tag.split_once('.') {
            Some((pod, namespace)) if !pod.is_empty() && !namespace.is_empty() => (pod, namespace),
            Some(_) => {
                return Err(Error::config(format!(
                    "Invalid proxy tag '{}': expected pod[.namespace]",
                    tag
                )))
            }
            None => (tag, DEFAULT_NAMESPACE),
        };

        let id = format!(
            "{class}{sep}{ip}{sep}{pod}.{namespace}{sep}{namespace}.svc.cluster.local",
            sep = NODE_ID_SEPARATOR,
            ip = self.proxy_ip,
        );

        Ok(ProxyIdentity {
            id,
            cluster: pod.to_string(),
        })
    }
}
