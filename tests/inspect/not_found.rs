use envoy_types::pb::envoy::config::cluster::v3::Cluster;
use xdsctl::xds::{
    ClusterCriteria, ClusterHandler, Handler, ListenerCriteria, ListenerHandler, Outcome,
    OutputFormat, ResourceKind,
};

use crate::support::{
    chain, entry, http_filter, listener, listener_response, response, tcp_filter,
};

fn listener_handler(criteria: ListenerCriteria) -> Handler {
    Handler::Listener(ListenerHandler::new(criteria, OutputFormat::Json))
}

fn cluster(name: &str) -> Cluster {
    Cluster {
        name: name.to_string(),
        ..Default::default()
    }
}

#[test]
fn listener_not_found_lists_every_name_once_in_order() {
    let passthrough = chain("c", "0.0.0.0", 15001, vec![tcp_filter("PassthroughCluster")]);
    let inbound = chain("c", "10.0.0.5", 8080, vec![http_filter()]);
    let listeners = [
        listener("virtualOutbound", 15001, vec![passthrough]),
        listener("virtualInbound", 15006, vec![inbound]),
        listener("virtualOutbound", 15001, vec![]),
    ];
    let handler = listener_handler(ListenerCriteria {
        name: Some("missing".to_string()),
        ..Default::default()
    });

    let outcome = handler
        .on_response(&listener_response("v1", &listeners))
        .unwrap();
    let Outcome::NotFound(not_found) = outcome else {
        panic!("expected not found");
    };

    assert_eq!(not_found.kind, ResourceKind::Listener);
    assert_eq!(not_found.seen, vec!["virtualOutbound", "virtualInbound"]);

    let text = not_found.to_string();
    let mut lines = text.lines();
    assert_eq!(
        lines.next(),
        Some("Cannot find any listener matching name=\"missing\". Seen:")
    );
    assert!(lines.next().unwrap().starts_with("NAME"));
    lines.next();
    let rows: Vec<&str> = lines.collect();
    assert_eq!(rows.len(), 2);
    assert!(rows[0].starts_with("virtualOutbound"));
    assert!(rows[0].contains("TCP"));
    assert!(rows[1].starts_with("virtualInbound"));
    assert!(rows[1].contains("HTTP"));
}

#[test]
fn chain_filter_that_empties_a_listener_still_renders_it() {
    let inbound = chain("c", "10.0.0.5", 8080, vec![http_filter()]);
    let listeners = [listener("virtualInbound", 15006, vec![inbound])];
    let handler = listener_handler(ListenerCriteria {
        chain_port: Some(9999),
        ..Default::default()
    });

    let outcome = handler
        .on_response(&listener_response("v1", &listeners))
        .unwrap();
    let Outcome::Rendered(text) = outcome else {
        panic!("expected rendered output");
    };
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json["name"], "virtualInbound");
    assert!(json["filter_chains"].as_array().unwrap().is_empty());
}

#[test]
fn cluster_not_found_lists_decomposed_names() {
    let clusters = [
        cluster("outbound|9080||reviews.default.svc.cluster.local"),
        cluster("BlackHoleCluster"),
    ];
    let resources = clusters
        .iter()
        .map(|c| entry(ResourceKind::Cluster, c))
        .collect();
    let handler = Handler::Cluster(ClusterHandler::new(
        ClusterCriteria {
            subset: Some("v3".to_string()),
            ..Default::default()
        },
        OutputFormat::Short,
    ));

    let outcome = handler
        .on_response(&response(ResourceKind::Cluster, "v1", resources))
        .unwrap();
    let text = outcome.to_string();

    assert!(text.starts_with("Cannot find any cluster matching subset~\"v3\". Seen:\n"));
    assert!(text.contains("SERVICE FQDN"));
    assert!(text.contains("reviews.default.svc.cluster.local"));
    assert!(text.contains("BlackHoleCluster"));
}
