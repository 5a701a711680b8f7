//! Control plane session and the fetch/render loop.

use std::io::Write;
use std::time::Duration;

use async_trait::async_trait;
use envoy_types::pb::envoy::config::core::v3::Node;
use envoy_types::pb::envoy::service::discovery::v3::{
    aggregated_discovery_service_client::AggregatedDiscoveryServiceClient, DiscoveryRequest,
    DiscoveryResponse,
};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::transport::{Channel, ClientTlsConfig, Endpoint};
use tonic::Streaming;
use tracing::{debug, info, Instrument};

use super::handler::{Handler, Outcome};
use crate::{Error, Result};

/// Requests buffered on the outbound half of the stream.
const REQUEST_BUFFER: usize = 16;

/// Discovery requests out, discovery responses in.
#[async_trait]
pub trait DiscoverySession: Send {
    /// Send `request` and wait for the response to it.
    async fn fetch(&mut self, request: &DiscoveryRequest) -> Result<DiscoveryResponse>;

    /// Wait for the next response the control plane pushes for the
    /// subscription opened by the last `fetch`, without sending anything.
    async fn next_response(&mut self) -> Result<DiscoveryResponse>;
}

/// Aggregated discovery stream to a control plane.
///
/// The bidirectional stream is opened by the first `fetch`; later fetches
/// reuse it.
pub struct AdsSession {
    client: AggregatedDiscoveryServiceClient<Channel>,
    stream: Option<OpenStream>,
}

struct OpenStream {
    requests: mpsc::Sender<DiscoveryRequest>,
    responses: Streaming<DiscoveryResponse>,
}

impl AdsSession {
    /// Connect to `address`, giving up after `connect_timeout`. An
    /// `https://` address gets a TLS channel with the webpki roots.
    pub async fn connect(address: &str, connect_timeout: Duration) -> Result<Self> {
        let mut endpoint = Endpoint::from_shared(address.to_string())
            .map_err(|e| {
                Error::config(format!("Invalid control plane address '{}': {}", address, e))
            })?
            .connect_timeout(connect_timeout);

        if address.starts_with("https://") {
            endpoint = endpoint.tls_config(ClientTlsConfig::new().with_webpki_roots())?;
        }

        info!(
            address = %address,
            timeout_secs = connect_timeout.as_secs(),
            "Connecting to control plane"
        );
        let channel = endpoint.connect().await.map_err(|e| {
            Error::transport(format!("Failed to connect to control plane at {}: {}", address, e))
        })?;

        Ok(Self {
            client: AggregatedDiscoveryServiceClient::new(channel),
            stream: None,
        })
    }

    async fn open(&mut self, first: DiscoveryRequest) -> Result<()> {
        let (tx, rx) = mpsc::channel(REQUEST_BUFFER);
        // Queue the first request before the call so the server sees it
        // alongside the stream headers.
        tx.send(first).await.map_err(|_| Error::transport("Request stream closed"))?;

        let responses = self
            .client
            .stream_aggregated_resources(ReceiverStream::new(rx))
            .await?
            .into_inner();
        debug!("Aggregated discovery stream opened");

        self.stream = Some(OpenStream { requests: tx, responses });
        Ok(())
    }

    /// Next response on the open stream.
    async fn receive(&mut self) -> Result<DiscoveryResponse> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(Error::transport("Aggregated discovery stream is not open"));
        };

        match stream.responses.message().await? {
            Some(response) => {
                debug!(
                    version = %response.version_info,
                    resources = response.resources.len(),
                    "Received discovery response"
                );
                Ok(response)
            }
            None => Err(Error::transport("Control plane closed the stream")),
        }
    }
}

#[async_trait]
impl DiscoverySession for AdsSession {
    async fn fetch(&mut self, request: &DiscoveryRequest) -> Result<DiscoveryResponse> {
        let node_id = request.node.as_ref().map(|n| n.id.clone()).unwrap_or_default();
        let span = crate::xds_span!("fetch", node_id, type_url = %request.type_url);

        async move {
            match self.stream.as_mut() {
                Some(stream) => stream
                    .requests
                    .send(request.clone())
                    .await
                    .map_err(|_| Error::transport("Request stream closed"))?,
                None => self.open(request.clone()).await?,
            }
            self.receive().await
        }
        .instrument(span)
        .await
    }

    async fn next_response(&mut self) -> Result<DiscoveryResponse> {
        self.receive().instrument(tracing::debug_span!("next_response")).await
    }
}

/// Per-run options for [`inspect`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InspectOptions {
    /// Keep rendering pushed responses until the session fails.
    pub watch: bool,
}

/// Fetch and render for `handler` on behalf of `node`, writing each render
/// to `out`.
///
/// Without watch, returns the single outcome. With watch, the request is
/// sent once and every later response the control plane pushes on the
/// same subscription is rendered on its own. Only a session or write
/// failure ends the loop.
pub async fn inspect<S, W>(
    session: &mut S,
    handler: &Handler,
    node: &Node,
    options: InspectOptions,
    out: &mut W,
) -> Result<Outcome>
where
    S: DiscoverySession + ?Sized,
    W: Write,
{
    let request = handler.build_request(node);
    let mut response = session.fetch(&request).await?;

    loop {
        let outcome = handler.on_response(&response)?;

        write!(out, "{}", outcome)?;
        out.flush()?;

        if outcome.is_not_found() {
            info!(kind = %handler.kind(), "No resources matched");
        }
        if !options.watch {
            return Ok(outcome);
        }

        response = session.next_response().await?;
    }
}
