/// Upstream-agent client (spec S4.5): creates a call over HTTP, then opens
/// the agent's WebSocket. Both halves are plain async functions with
/// explicit timeouts; neither owns a session.
use std::time::Duration;

use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::info;

use crate::config::Config;
use crate::error::BridgeError;

const WIDEBAND_HZ: u32 = 48_000;
const CALL_CREATE_TIMEOUT: Duration = Duration::from_secs(10);
const WS_OPEN_TIMEOUT: Duration = Duration::from_secs(15);

pub type UpstreamStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Build the call-creation request body (spec S4.5). Split out from
/// `create_call` so the shape can be unit-tested without a network call.
fn build_call_body(config: &Config, context: &str) -> Value {
    let secs = |ms: u64| format!("{:.3}s", ms as f64 / 1000.0);

    json!({
        "systemPrompt": context,
        "model": config.agent_model,
        "voice": config.agent_voice,
        "medium": {
            "serverWebSocket": {
                "inputSampleRate": WIDEBAND_HZ,
                "outputSampleRate": WIDEBAND_HZ,
            }
        },
        "vadSettings": {
            "turnEndpointDelay": secs(config.vad_turn_endpoint_delay_ms),
            "minimumTurnDuration": secs(config.vad_min_turn_duration_ms),
            "minimumInterruptionDuration": secs(config.vad_min_interruption_duration_ms),
            "frameActivationThreshold": config.vad_activation_threshold,
        },
        "firstSpeaker": "FIRST_SPEAKER_USER",
        "recordingEnabled": false,
    })
}

/// POST the call-creation request and extract the join URL (spec S4.5/S7
/// `UpstreamSetup`).
pub async fn create_call(config: &Config, context: &str) -> Result<String, BridgeError> {
    let client = reqwest::Client::builder()
        .timeout(CALL_CREATE_TIMEOUT)
        .build()
        .map_err(|e| BridgeError::UpstreamSetup(e.to_string()))?;

    let body = build_call_body(config, context);
    let url = format!("{}/calls", config.agent_api_base_url);

    let response = client
        .post(&url)
        .header("X-API-Key", &config.api_key)
        .header("Content-Type", "application/json")
        .json(&body)
        .send()
        .await
        .map_err(|e| BridgeError::UpstreamSetup(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(BridgeError::UpstreamSetup(format!("agent returned {status}: {text}")));
    }

    let payload: Value = response
        .json()
        .await
        .map_err(|e| BridgeError::UpstreamSetup(e.to_string()))?;

    payload
        .get("joinUrl")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| BridgeError::UpstreamSetup("response missing joinUrl".to_string()))
}

/// Open the upstream WebSocket (spec S4.5/S7 `UpstreamConnect`). Permessage
/// deflate is never offered — `tokio-tungstenite` negotiates no
/// extensions by default — satisfying the "disabled" requirement without
/// extra configuration.
pub async fn open_websocket(join_url: &str) -> Result<UpstreamStream, BridgeError> {
    let attempt = connect_async(join_url);

    let (stream, response) = tokio::time::timeout(WS_OPEN_TIMEOUT, attempt)
        .await
        .map_err(|_| BridgeError::UpstreamConnect("handshake timed out after 15s".to_string()))?
        .map_err(|e| BridgeError::UpstreamConnect(e.to_string()))?;

    info!(status = %response.status(), "upstream websocket connected");
    Ok(stream)
}
