//! HTTP server for the browser extension.
//!
//! This module provides a local HTTP server that:
//! - Accepts host events, messages and raw telemetry from the extension
//! - Serves the latest metrics to the popup
//! - Hands queued interventions to the extension when it polls
//!
//! # Architecture
//!
//! ```text
//! Extension ──→ POST /events|/messages|/telemetry ──→ Agent ──→ Controller
//!     ↑                                                │
//!     └─────────── GET /interventions ←── QueueSink ←──┘
//! ```

use crate::engine::{HostEvent, Message, MetricsSnapshot};
use crate::intervention::Outbound;
use crate::runtime::Agent;
use crate::telemetry::TelemetrySample;
use axum::{
    extract::State,
    http::{request::Parts, HeaderValue, Uri},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind to (0 for random)
    pub port: u16,
}

impl ServerConfig {
    pub fn new(port: u16) -> Self {
        Self { port }
    }
}

/// Batch of raw content samples.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryBatch {
    pub samples: Vec<TelemetrySample>,
}

/// Response to every accepted post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ack {
    pub status: String,
    /// Present when the message asked for metrics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetricsSnapshot>,
}

impl Ack {
    fn ok(metrics: Option<MetricsSnapshot>) -> Json<Self> {
        Json(Self {
            status: "ok".to_string(),
            metrics,
        })
    }
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub instance_id: String,
}

/// GET /health
async fn health(State(agent): State<Arc<Agent>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        instance_id: agent.instance_id().to_string(),
    })
}

/// POST /events
async fn events(State(agent): State<Arc<Agent>>, Json(event): Json<HostEvent>) -> Json<Ack> {
    Ack::ok(agent.dispatch(event.into()).await)
}

/// POST /messages
async fn messages(State(agent): State<Arc<Agent>>, Json(message): Json<Message>) -> Json<Ack> {
    Ack::ok(agent.dispatch(message.into()).await)
}

/// POST /telemetry
async fn telemetry(
    State(agent): State<Arc<Agent>>,
    Json(batch): Json<TelemetryBatch>,
) -> Json<Ack> {
    tracing::debug!(samples = batch.samples.len(), "telemetry batch");
    Ack::ok(agent.dispatch(crate::engine::Command::Telemetry(batch.samples)).await)
}

/// GET /metrics
async fn metrics(State(agent): State<Arc<Agent>>) -> Json<MetricsSnapshot> {
    Json(agent.metrics().await)
}

/// GET /interventions
///
/// Drains the queue; each instruction is returned once.
async fn interventions(State(agent): State<Arc<Agent>>) -> Json<Vec<Outbound>> {
    Json(agent.queue().drain())
}

/// Hosts allowed to call the server from a plain web page.
const LOCAL_HOSTS: &[&str] = &["localhost", "127.0.0.1"];

/// Extension pages, or a page served from this machine on any port.
fn is_allowed_origin(origin: &HeaderValue) -> bool {
    let Some(uri) = origin.to_str().ok().and_then(|o| o.parse::<Uri>().ok()) else {
        return false;
    };
    match (uri.scheme_str(), uri.host()) {
        (Some("chrome-extension" | "moz-extension"), Some(_)) => true,
        (Some("http"), Some(host)) => LOCAL_HOSTS.contains(&host),
        _ => false,
    }
}

/// Build the router without binding it.
pub fn router(agent: Arc<Agent>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/events", post(events))
        .route("/messages", post(messages))
        .route("/telemetry", post(telemetry))
        .route("/metrics", get(metrics))
        .route("/interventions", get(interventions))
        .layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::predicate(
                    |origin: &HeaderValue, _request: &Parts| is_allowed_origin(origin),
                ))
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(agent)
}

/// Run the HTTP server
pub async fn run(
    config: ServerConfig,
    agent: Arc<Agent>,
) -> anyhow::Result<(SocketAddr, tokio::sync::oneshot::Sender<()>)> {
    let app = router(agent);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    tracing::info!("Focus agent server listening on http://{}", actual_addr);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("Server shutdown signal received");
            })
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok((actual_addr, shutdown_tx))
}
