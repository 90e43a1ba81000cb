//! Real-time voice bridge core: a bidirectional per-session audio relay
//! between a browser client (WebSocket, PCMU @ 8kHz) and a hosted
//! conversational-voice agent (WebSocket, PCM16-LE @ 48kHz).
pub mod acceptor;
pub mod codec;
pub mod config;
pub mod dsp;
pub mod error;
pub mod messages;
pub mod registry;
pub mod relay;
pub mod session;
pub mod stats;
pub mod transform;
pub mod upstream;

use std::sync::Arc;

use tracing::{error, info};

pub use config::Config;

/// Build the application state and serve until a graceful shutdown
/// signal arrives (spec S4.7). Exposed as a library entry point so
/// `main.rs` stays a thin bootstrap and integration tests can drive a
/// real app instance on an ephemeral port.
pub async fn run(config: Config) -> anyhow::Result<()> {
    if let Err(reason) = config.validate() {
        error!(reason = %reason, "configuration invalid, exiting");
        anyhow::bail!("configuration invalid: {reason}");
    }

    info!(
        listen = config.listen_addr(),
        model = config.agent_model,
        voice = config.agent_voice,
        "voice-bridge-core starting"
    );

    let state = acceptor::AppState {
        config: Arc::new(config),
        registry: registry::Registry::new(),
        stats: stats::Stats::new(),
    };

    acceptor::serve(state).await
}
