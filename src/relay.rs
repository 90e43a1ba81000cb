/// The per-session duplex relay (spec S4.6): two concurrent reader tasks,
/// a single writer task per direction, lifecycle coupling on either side
/// closing, and a 30s client keep-alive ping independent of the stats
/// timer.
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message as ClientMsg, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as UpstreamMsg;
use tracing::{info, warn};

use crate::messages::ClientMessage;
use crate::registry::Registry;
use crate::session::{Lifecycle, Session};
use crate::stats::Stats;
use crate::transform;
use crate::upstream::UpstreamStream;

const CLIENT_PING_INTERVAL: Duration = Duration::from_secs(30);
const OUTBOUND_QUEUE_DEPTH: usize = 64;

enum ToClient {
    Binary(Vec<u8>),
    Text(String),
}

/// Run the duplex pump until either endpoint closes, then tear the
/// session down (spec S3 "on any endpoint terminating... the other
/// endpoint MUST also be closed... resources released exactly once").
pub async fn run(
    session: Arc<Session>,
    client_ws: WebSocket,
    upstream_ws: UpstreamStream,
    registry: Registry,
    stats: Arc<Stats>,
) {
    let (client_sink, client_stream) = client_ws.split();
    let (upstream_sink, upstream_stream) = upstream_ws.split();

    let (to_client_tx, to_client_rx) = mpsc::channel::<ToClient>(OUTBOUND_QUEUE_DEPTH);

    let mut writer = tokio::spawn(client_writer(client_sink, to_client_rx));

    let mut upstream_to_client = tokio::spawn(pump_upstream_to_client(
        session.clone(),
        upstream_stream,
        to_client_tx.clone(),
        stats.clone(),
    ));

    let mut client_to_upstream = tokio::spawn(pump_client_to_upstream(
        session.clone(),
        client_stream,
        upstream_sink,
        stats.clone(),
    ));

    drop(to_client_tx);

    // Lifecycle coupling: whichever direction finishes first, the other
    // is aborted rather than left reading from a half-closed peer.
    tokio::select! {
        _ = &mut upstream_to_client => { client_to_upstream.abort(); }
        _ = &mut client_to_upstream => { upstream_to_client.abort(); }
    }
    let _ = upstream_to_client.await;
    let _ = client_to_upstream.await;

    writer.abort();
    let _ = writer.await;

    session.begin_close();
    registry.remove(&session.id);
    session.finish_close();

    stats.record_session_ended(
        session.counters.bytes_from_client.load(Ordering::Relaxed),
        session.counters.bytes_to_client.load(Ordering::Relaxed),
        session.counters.conversions.load(Ordering::Relaxed),
    );

    info!(session_id = %session.id, "session closed");
}

/// Owns the client-bound sink. Merges forwarded frames with a 30s
/// keep-alive ping so both sources share one writer (spec S4.6/S5).
async fn client_writer(mut sink: SplitSink<WebSocket, ClientMsg>, mut rx: mpsc::Receiver<ToClient>) {
    let mut ping_interval = tokio::time::interval(CLIENT_PING_INTERVAL);
    ping_interval.tick().await; // first tick fires immediately; discard it

    loop {
        tokio::select! {
            item = rx.recv() => {
                match item {
                    Some(ToClient::Binary(bytes)) => {
                        if sink.send(ClientMsg::Binary(bytes)).await.is_err() {
                            break;
                        }
                    }
                    Some(ToClient::Text(text)) => {
                        if sink.send(ClientMsg::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            _ = ping_interval.tick() => {
                if sink.send(ClientMsg::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
        }
    }

    let _ = sink.close().await;
}

/// Reader (upstream side), spec S4.6: transforms binary to PCMU, relays
/// text verbatim, synthesizes `connected` exactly once on first message.
async fn pump_upstream_to_client(
    session: Arc<Session>,
    mut stream: SplitStream<UpstreamStream>,
    to_client_tx: mpsc::Sender<ToClient>,
    stats: Arc<Stats>,
) {
    let mut tail = 0.0f64;

    // The upstream WebSocket is already open by the time this pump starts
    // (the handshake happens in `upstream::open_websocket`, awaited by the
    // caller before spawning `run`), so the Active transition and the
    // synthesized `connected` notice happen exactly once, right here
    // (spec S3/S4.6, testable property 12).
    if session.transition(Lifecycle::Active).is_ok() {
        info!(session_id = %session.id, "session active");
    }
    if to_client_tx
        .send(ToClient::Text(
            ClientMessage::Connected.to_json_string().unwrap_or_default(),
        ))
        .await
        .is_err()
    {
        return;
    }

    loop {
        match stream.next().await {
            Some(Ok(UpstreamMsg::Binary(bytes))) => {
                match transform::wideband_to_pcmu(&bytes, tail) {
                    Ok((out, new_tail)) => {
                        tail = new_tail;
                        session.record_conversion();
                        if transform::is_silence(&out) {
                            continue;
                        }
                        session.record_to_client(out.len());
                        if to_client_tx.send(ToClient::Binary(out)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(session_id = %session.id, error = %e, "dropping malformed upstream frame");
                    }
                }
            }
            Some(Ok(UpstreamMsg::Text(text))) => {
                if to_client_tx.send(ToClient::Text(text)).await.is_err() {
                    break;
                }
            }
            Some(Ok(UpstreamMsg::Close(_))) | None => break,
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                stats.record_peer_error();
                warn!(session_id = %session.id, error = %e, "upstream transport error");
                break;
            }
        }
    }
}

/// Reader (client side), spec S4.6: transforms binary to PCM16, relays
/// text verbatim.
async fn pump_client_to_upstream(
    session: Arc<Session>,
    mut stream: SplitStream<WebSocket>,
    mut sink: SplitSink<UpstreamStream, UpstreamMsg>,
    stats: Arc<Stats>,
) {
    let mut tail = 0.0f64;

    loop {
        match stream.next().await {
            Some(Ok(ClientMsg::Binary(bytes))) => {
                session.record_from_client(bytes.len());
                let (out, new_tail) = transform::pcmu_to_wideband(&bytes, tail);
                tail = new_tail;
                session.record_conversion();
                if sink.send(UpstreamMsg::Binary(out)).await.is_err() {
                    break;
                }
            }
            Some(Ok(ClientMsg::Text(text))) => {
                if sink.send(UpstreamMsg::Text(text)).await.is_err() {
                    break;
                }
            }
            Some(Ok(ClientMsg::Close(_))) | None => break,
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                stats.record_peer_error();
                warn!(session_id = %session.id, error = %e, "client transport error");
                break;
            }
        }
    }

    let _ = sink.close().await;
}
