//! Cluster filtering and subset key decomposition.
//!
//! Service mesh control planes encode cluster identity in the name as
//! `direction|port|subset|fqdn`, e.g. `outbound|8080|v2|reviews.default.svc.cluster.local`.
//! Names with fewer segments are treated as opaque identifiers.

use envoy_types::pb::envoy::config::cluster::v3::{cluster, Cluster};

/// Separator between subset key segments.
pub const SUBSET_KEY_SEPARATOR: char = '|';

/// Shown in place of a field an opaque name does not carry.
pub const PLACEHOLDER: &str = "-";

/// Decomposed cluster name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubsetKey {
    direction: Option<String>,
    port: Option<String>,
    subset: Option<String>,
    fqdn: String,
}

impl SubsetKey {
    pub fn direction(&self) -> &str {
        self.direction.as_deref().unwrap_or(PLACEHOLDER)
    }

    pub fn port(&self) -> &str {
        self.port.as_deref().unwrap_or(PLACEHOLDER)
    }

    pub fn subset(&self) -> &str {
        self.subset.as_deref().unwrap_or(PLACEHOLDER)
    }

    pub fn fqdn(&self) -> &str {
        &self.fqdn
    }

    /// True when the name decomposed into direction, port, subset and fqdn.
    pub fn is_structured(&self) -> bool {
        self.direction.is_some()
    }

    fn opaque(name: &str) -> Self {
        Self {
            direction: None,
            port: None,
            subset: None,
            fqdn: name.to_string(),
        }
    }
}

/// Split a cluster name into its subset key.
///
/// Requires at least three separators; anything after the third belongs to
/// the fqdn. An empty subset segment is kept as "no subset". Names that do
/// not split cleanly, or split into an empty fqdn, are opaque.
pub fn decompose_name(name: &str) -> SubsetKey {
    let segments: Vec<&str> = name.splitn(4, SUBSET_KEY_SEPARATOR).collect();
    match segments.as_slice() {
        [direction, port, subset, fqdn] if !fqdn.is_empty() => SubsetKey {
            direction: Some(direction.to_string()),
            port: Some(port.to_string()),
            subset: Some(subset.to_string()).filter(|s| !s.is_empty()),
            fqdn: fqdn.to_string(),
        },
        _ => SubsetKey::opaque(name),
    }
}

/// Operator-supplied cluster filter. Unset fields impose no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterCriteria {
    pub name: Option<String>,
    pub fqdn: Option<String>,
    pub direction: Option<String>,
    pub subset: Option<String>,
    pub port: Option<u32>,
}

impl ClusterCriteria {
    fn field(value: &Option<String>) -> Option<&str> {
        value.as_deref().filter(|v| !v.is_empty())
    }

    fn port(&self) -> Option<u32> {
        self.port.filter(|p| *p != 0)
    }

    /// True when no criterion is set.
    pub fn is_empty(&self) -> bool {
        Self::field(&self.name).is_none()
            && Self::field(&self.fqdn).is_none()
            && Self::field(&self.direction).is_none()
            && Self::field(&self.subset).is_none()
            && self.port().is_none()
    }

    /// Human-readable summary used in not-found diagnostics.
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(name) = Self::field(&self.name) {
            parts.push(format!("name={:?}", name));
        }
        if let Some(fqdn) = Self::field(&self.fqdn) {
            parts.push(format!("fqdn~{:?}", fqdn));
        }
        if let Some(direction) = Self::field(&self.direction) {
            parts.push(format!("direction~{:?}", direction));
        }
        if let Some(subset) = Self::field(&self.subset) {
            parts.push(format!("subset~{:?}", subset));
        }
        if let Some(port) = self.port() {
            parts.push(format!("port={}", port));
        }
        if parts.is_empty() {
            "any filter".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// Conjunction of the set criteria.
///
/// The port criterion is a substring test for `|<port>|` against the raw
/// name, so it only ever matches structured names.
pub fn match_cluster(cluster: &Cluster, criteria: &ClusterCriteria) -> bool {
    let name = cluster.name.as_str();
    let key = decompose_name(name);

    if let Some(expected) = ClusterCriteria::field(&criteria.name) {
        if name != expected {
            return false;
        }
    }
    if let Some(fqdn) = ClusterCriteria::field(&criteria.fqdn) {
        if !key.fqdn().contains(fqdn) {
            return false;
        }
    }
    if let Some(direction) = ClusterCriteria::field(&criteria.direction) {
        if !(key.is_structured() && key.direction().contains(direction)) {
            return false;
        }
    }
    if let Some(subset) = ClusterCriteria::field(&criteria.subset) {
        if !key.subset.as_deref().is_some_and(|s| s.contains(subset)) {
            return false;
        }
    }
    if let Some(port) = criteria.port() {
        let needle = format!("{sep}{port}{sep}", sep = SUBSET_KEY_SEPARATOR);
        if !name.contains(&needle) {
            return false;
        }
    }
    true
}

/// Order-preserving selection of the clusters satisfying `criteria`.
pub fn select_clusters<'a>(
    clusters: &'a [Cluster],
    criteria: &ClusterCriteria,
) -> Vec<&'a Cluster> {
    clusters
        .iter()
        .filter(|c| match_cluster(c, criteria))
        .collect()
}

/// Discovery type tag of a cluster (`EDS`, `STATIC`, ...), or the custom
/// cluster type's extension name.
pub fn cluster_type(cluster: &Cluster) -> String {
    match cluster.cluster_discovery_type.as_ref() {
        Some(cluster::ClusterDiscoveryType::Type(value)) => {
            cluster::DiscoveryType::try_from(*value)
                .map(|t| t.as_str_name().to_string())
                .unwrap_or_else(|_| format!("UNKNOWN({})", value))
        }
        Some(cluster::ClusterDiscoveryType::ClusterType(custom)) => custom.name.clone(),
        None => cluster::DiscoveryType::Static.as_str_name().to_string(),
    }
}

/// Names of the cluster's transport socket match entries.
pub fn transport_socket_match_names(cluster: &Cluster) -> Vec<String> {
    cluster
        .transport_socket_matches
        .iter()
        .map(|m| m.name.clone())
        .collect()
}
