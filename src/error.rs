/// Error taxonomy for the bridge core (spec S7). Each variant carries its
/// own close disposition, applied by the caller that owns the socket
/// (`session`/`relay`/`acceptor`), not by this type.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    /// Missing `API_KEY` at startup. Fatal; process exits.
    #[error("configuration missing: {0}")]
    ConfigMissing(String),

    /// Malformed upgrade request. Close client with 4000; no session created.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Call-creation HTTP failed, returned non-2xx, or had no join URL.
    #[error("failed to set up upstream call: {0}")]
    UpstreamSetup(String),

    /// Upstream WebSocket handshake timed out or errored.
    #[error("failed to connect upstream: {0}")]
    UpstreamConnect(String),

    /// Malformed audio frame (e.g. odd-length PCM16). Drop the frame, keep the session.
    #[error("transform error: {0}")]
    Transform(String),

    /// Either endpoint closed normally.
    #[error("peer closed")]
    PeerClosed,

    /// Transport error on either endpoint.
    #[error("peer error: {0}")]
    PeerError(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BridgeError {
    /// The `error` string sent to the client in the `{"type":"error"}` message,
    /// matching the wording spec S7 names for each connection-level kind.
    pub fn client_message(&self) -> &'static str {
        match self {
            BridgeError::BadRequest(_) => "bad request",
            BridgeError::UpstreamSetup(_) => "failed to set up upstream call",
            BridgeError::UpstreamConnect(_) => "Ultravox connection timeout",
            BridgeError::PeerError(_) => "peer connection error",
            _ => "internal error",
        }
    }
}
