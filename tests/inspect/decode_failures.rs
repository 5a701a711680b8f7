use envoy_types::pb::envoy::config::cluster::v3::Cluster;
use envoy_types::pb::google::protobuf::Any;
use xdsctl::xds::{ClusterCriteria, ClusterHandler, Handler, Outcome, OutputFormat, ResourceKind};

use crate::support::{entry, malformed, response};

fn cluster(name: &str) -> Cluster {
    Cluster {
        name: name.to_string(),
        ..Default::default()
    }
}

fn cluster_handler(format: OutputFormat) -> Handler {
    Handler::Cluster(ClusterHandler::new(ClusterCriteria::default(), format))
}

fn rendered(handler: &Handler, resources: Vec<Any>) -> String {
    let outcome = handler
        .on_response(&response(ResourceKind::Cluster, "v1", resources))
        .unwrap();
    let Outcome::Rendered(text) = outcome else {
        panic!("expected rendered output");
    };
    text
}

#[test]
fn malformed_entry_is_skipped_and_the_rest_tabulated() {
    let resources = vec![
        entry(ResourceKind::Cluster, &cluster("outbound|80||a.default.svc.cluster.local")),
        malformed(ResourceKind::Cluster),
        entry(ResourceKind::Cluster, &cluster("outbound|80||b.default.svc.cluster.local")),
    ];

    let text = rendered(&cluster_handler(OutputFormat::Short), resources);
    let rows: Vec<&str> = text.lines().skip(2).collect();
    assert_eq!(rows.len(), 2);
    assert!(rows[0].starts_with("a.default.svc.cluster.local"));
    assert!(rows[1].starts_with("b.default.svc.cluster.local"));
}

#[test]
fn malformed_entry_stays_in_place_in_the_raw_response() {
    let resources = vec![
        entry(ResourceKind::Cluster, &cluster("outbound|80||a.default.svc.cluster.local")),
        malformed(ResourceKind::Cluster),
        entry(ResourceKind::Cluster, &cluster("outbound|80||b.default.svc.cluster.local")),
    ];

    let text = rendered(&cluster_handler(OutputFormat::Json), resources);
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    let resources = json["resources"].as_array().unwrap();
    assert_eq!(resources.len(), 3);
    assert_eq!(resources[0]["name"], "outbound|80||a.default.svc.cluster.local");
    assert_eq!(resources[1]["@type"], ResourceKind::Cluster.type_url());
    assert!(resources[1]["error"].is_string());
    assert!(resources[1].get("name").is_none());
    assert_eq!(resources[2]["name"], "outbound|80||b.default.svc.cluster.local");
}

#[test]
fn entry_of_the_wrong_type_is_skipped() {
    let resources = vec![
        Any {
            type_url: ResourceKind::Listener.type_url().to_string(),
            value: Vec::new(),
        },
        entry(ResourceKind::Cluster, &cluster("kept")),
    ];

    let text = rendered(&cluster_handler(OutputFormat::Short), resources);
    assert_eq!(text.lines().count(), 3);
    assert!(text.lines().nth(2).unwrap().starts_with("kept"));
}

#[test]
fn only_malformed_entries_is_not_found() {
    let resources = vec![malformed(ResourceKind::Cluster)];
    let handler = cluster_handler(OutputFormat::Short);

    let outcome = handler
        .on_response(&response(ResourceKind::Cluster, "v1", resources))
        .unwrap();
    let Outcome::NotFound(not_found) = outcome else {
        panic!("expected not found");
    };
    assert!(not_found.seen.is_empty());
}
