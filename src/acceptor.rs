/// Connection acceptor (spec S4.7): the axum router that accepts client
/// WebSocket upgrades, parses session parameters, stands up a session,
/// and serves the ambient health endpoint.
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message as ClientMsg, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::messages::ClientMessage;
use crate::registry::Registry;
use crate::relay;
use crate::session::Session;
use crate::stats::{self, Stats};
use crate::upstream;

const DEFAULT_CONTEXT: &str = "voice-bridge session";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Registry,
    pub stats: Arc<Stats>,
}

#[derive(Debug, Deserialize)]
struct ConnectParams {
    context: Option<String>,
    #[serde(rename = "sampleRate")]
    #[allow(dead_code)]
    sample_rate: Option<u32>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/", get(upgrade))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// `GET /?context=...&sampleRate=...` — upgrade to a client WebSocket and
/// start the session (spec S4.7). `sampleRate` is accepted but ignored
/// (spec S6: "currently fixed at 8000; other values are accepted but
/// ignored").
async fn upgrade(
    State(state): State<AppState>,
    Query(params): Query<ConnectParams>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let context = params
        .context
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| DEFAULT_CONTEXT.to_string());

    ws.on_upgrade(move |socket| handle_socket(socket, state, context))
}

async fn handle_socket(socket: WebSocket, state: AppState, context: String) {
    let id = Uuid::new_v4().to_string();
    let session = Session::new(id.clone(), context.clone());
    state.stats.record_session_started();

    info!(session_id = %id, "client connected, establishing upstream");

    if session
        .transition(crate::session::Lifecycle::UpstreamConnecting)
        .is_err()
    {
        warn!(session_id = %id, "unexpected lifecycle state at accept");
        return;
    }

    match establish_upstream(&state.config, &context).await {
        Ok(upstream_ws) => {
            state.registry.insert(session.clone());
            relay::run(session, socket, upstream_ws, state.registry.clone(), state.stats.clone()).await;
        }
        Err(err) => {
            error!(session_id = %id, error = %err, "failed to establish upstream call");
            send_error_and_close(socket, &err).await;
            state.stats.record_session_ended(0, 0, 0);
        }
    }
}

async fn establish_upstream(
    config: &Config,
    context: &str,
) -> Result<upstream::UpstreamStream, crate::error::BridgeError> {
    let join_url = upstream::create_call(config, context).await?;
    upstream::open_websocket(&join_url).await
}

/// Surface a connection-level error to the client once, then close (spec
/// S7: "surfaced once to the client as a JSON error message... then
/// terminate the session").
async fn send_error_and_close(mut socket: WebSocket, err: &crate::error::BridgeError) {
    let msg = ClientMessage::error_with_details(err.client_message(), err.to_string());
    if let Ok(json) = msg.to_json_string() {
        let _ = socket.send(ClientMsg::Text(json)).await;
    }
    let _ = socket.close().await;
}

/// Bind the listener and serve until a graceful shutdown signal arrives
/// (spec S4.7/S6: SIGINT/SIGTERM stop accepting and close active sessions).
pub async fn serve(state: AppState) -> anyhow::Result<()> {
    let addr: SocketAddr = state.config.listen_addr().parse()?;
    let registry = state.registry.clone();
    let stats = state.stats.clone();
    let stats_interval = state.config.stats_interval_secs;

    let app = build_router(state);
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "voice bridge listening");

    let reporter = tokio::spawn(stats::stats_reporter(stats.clone(), stats_interval));

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    reporter.abort();

    info!(sessions = registry.len(), "shutting down, closing active sessions");
    // Sessions are torn down by their own relay::run on socket close once
    // the listener stops accepting; give in-flight pumps a bounded grace
    // window to observe the closed listener and finish (spec S4.7).
    tokio::time::sleep(Duration::from_millis(50)).await;
    stats::report_once(&stats, std::time::Instant::now().elapsed());

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received");
}
