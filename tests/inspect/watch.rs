use envoy_types::pb::envoy::config::core::v3::Node;
use xdsctl::xds::{
    inspect, ClusterCriteria, ClusterHandler, Handler, InspectOptions, ListenerCriteria,
    ListenerHandler, Outcome, OutputFormat,
};
use xdsctl::Error;

use crate::support::{chain, http_filter, listener, listener_response, ScriptedSession};

fn node() -> Node {
    Node {
        id: "sidecar~10.0.0.5~web-1.default~default.svc.cluster.local".to_string(),
        ..Default::default()
    }
}

fn listener_handler(criteria: ListenerCriteria, format: OutputFormat) -> Handler {
    Handler::Listener(ListenerHandler::new(criteria, format))
}

const WATCH: InspectOptions = InspectOptions { watch: true };

#[tokio::test]
async fn single_fetch_renders_once() {
    let inbound = chain("c", "10.0.0.5", 8080, vec![http_filter()]);
    let mut session = ScriptedSession::new([listener_response(
        "v1",
        &[listener("virtualInbound", 15006, vec![inbound])],
    )]);
    let handler = listener_handler(ListenerCriteria::default(), OutputFormat::Short);
    let mut out = Vec::new();

    let outcome = inspect(&mut session, &handler, &node(), InspectOptions::default(), &mut out)
        .await
        .unwrap();

    assert!(matches!(outcome, Outcome::Rendered(_)));
    assert_eq!(session.requests.len(), 1);
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("virtualInbound"));
    assert!(text.contains("HTTP"));
}

#[tokio::test]
async fn watch_renders_each_response_independently() {
    let first = listener_response("v1", &[listener("a", 8001, vec![])]);
    let second = listener_response("v2", &[listener("b", 8002, vec![])]);
    let mut session = ScriptedSession::new([first, second]);
    let handler = listener_handler(ListenerCriteria::default(), OutputFormat::Json);
    let mut out = Vec::new();

    let result = inspect(&mut session, &handler, &node(), WATCH, &mut out).await;

    // The loop only ends when the session gives out.
    assert!(matches!(result, Err(Error::Transport(_))));

    let text = String::from_utf8(out).unwrap();
    let renders: Vec<serde_json::Value> = serde_json::Deserializer::from_str(&text)
        .into_iter::<serde_json::Value>()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(renders.len(), 2);
    assert_eq!(renders[0]["version_info"], "v1");
    assert_eq!(renders[0]["resources"].as_array().unwrap().len(), 1);
    assert_eq!(renders[0]["resources"][0]["name"], "a");
    assert_eq!(renders[1]["version_info"], "v2");
    assert_eq!(renders[1]["resources"].as_array().unwrap().len(), 1);
    assert_eq!(renders[1]["resources"][0]["name"], "b");
}

#[tokio::test]
async fn watch_sends_the_request_once_and_reads_pushed_responses() {
    let pushes = ["v1", "v2", "v3"].map(|v| listener_response(v, &[listener("a", 8001, vec![])]));
    let mut session = ScriptedSession::new(pushes);
    let handler = listener_handler(ListenerCriteria::default(), OutputFormat::Short);
    let mut out = Vec::new();

    let result = inspect(&mut session, &handler, &node(), WATCH, &mut out).await;

    assert!(matches!(result, Err(Error::Transport(_))));
    assert_eq!(session.requests.len(), 1);
    let text = String::from_utf8(out).unwrap();
    assert_eq!(text.matches("NAME").count(), 3);
}

#[tokio::test]
async fn watch_continues_past_not_found() {
    let empty = listener_response("v1", &[]);
    let full = listener_response("v2", &[listener("outbound_8080", 8080, vec![])]);
    let mut session = ScriptedSession::new([empty, full]);
    let criteria = ListenerCriteria {
        port: Some(8080),
        ..Default::default()
    };
    let handler = listener_handler(criteria, OutputFormat::Short);
    let mut out = Vec::new();

    let result = inspect(&mut session, &handler, &node(), WATCH, &mut out).await;
    assert!(result.is_err());

    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with("Cannot find any listener matching port=8080. Seen:"));
    assert!(text.contains("outbound_8080"));
}

#[tokio::test]
async fn cluster_request_carries_node_and_no_names() {
    let mut session = ScriptedSession::new(Vec::new());
    let handler = Handler::Cluster(ClusterHandler::new(
        ClusterCriteria::default(),
        OutputFormat::Short,
    ));
    let mut out = Vec::new();

    let result =
        inspect(&mut session, &handler, &node(), InspectOptions::default(), &mut out).await;

    assert!(matches!(result, Err(Error::Transport(_))));
    assert!(out.is_empty());
    let request = &session.requests[0];
    assert_eq!(request.type_url, "type.googleapis.com/envoy.config.cluster.v3.Cluster");
    assert!(request.resource_names.is_empty());
    assert_eq!(request.node.as_ref().unwrap().id, node().id);
}
