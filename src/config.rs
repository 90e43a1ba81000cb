/// Process configuration, sourced from the environment (spec S6) in the
/// teacher's `clap::Parser` idiom. Every field carries an `env` source so
/// a normal deployment never needs a command-line flag; flags exist only
/// as a byproduct of the derive and as a convenience for tests.
use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Real-time PCMU/PCM16 voice bridge core")]
pub struct Config {
    /// Secret presented to the upstream agent's call-creation API.
    #[arg(long, env = "API_KEY", default_value = "")]
    pub api_key: String,

    /// TCP port the client-facing WebSocket listener binds to.
    #[arg(long, env = "PORT", default_value_t = 8766)]
    pub port: u16,

    /// Interface address the listener binds to.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Base URL of the upstream agent's call-creation API.
    #[arg(long, env = "AGENT_API_BASE_URL", default_value = "https://api.ultravox.ai/api")]
    pub agent_api_base_url: String,

    /// Model identifier sent in the call-creation body.
    #[arg(long, env = "AGENT_MODEL", default_value = "fixie-ai/ultravox")]
    pub agent_model: String,

    /// Voice identifier sent in the call-creation body.
    #[arg(long, env = "AGENT_VOICE", default_value = "Mark")]
    pub agent_voice: String,

    /// VAD turn-endpoint delay, in milliseconds.
    #[arg(long, env = "VAD_TURN_ENDPOINT_DELAY_MS", default_value_t = 500)]
    pub vad_turn_endpoint_delay_ms: u64,

    /// VAD minimum turn duration, in milliseconds.
    #[arg(long, env = "VAD_MIN_TURN_DURATION_MS", default_value_t = 0)]
    pub vad_min_turn_duration_ms: u64,

    /// VAD minimum interruption duration, in milliseconds.
    #[arg(long, env = "VAD_MIN_INTERRUPTION_DURATION_MS", default_value_t = 90)]
    pub vad_min_interruption_duration_ms: u64,

    /// VAD speech-activation threshold, in [0, 1].
    #[arg(long, env = "VAD_ACTIVATION_THRESHOLD", default_value_t = 0.5)]
    pub vad_activation_threshold: f64,

    /// Interval between aggregate stats reports, in seconds (0 disables).
    #[arg(long, env = "STATS_INTERVAL_SECS", default_value_t = 30)]
    pub stats_interval_secs: u64,
}

impl Config {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// `Err` carries the user-facing reason; the caller maps this to
    /// `BridgeError::ConfigMissing` and exits non-zero (spec S6/S7).
    pub fn validate(&self) -> Result<(), String> {
        if self.api_key.trim().is_empty() {
            return Err("API_KEY is required".to_string());
        }
        Ok(())
    }
}
