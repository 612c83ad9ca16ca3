use std::cmp;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Request headers required by the remote service for handshake acceptance.
pub const HANDSHAKE_HEADERS: [(&str, &str); 6] = [
    ("Accept-Encoding", "gzip, deflate, br, zstd"),
    ("Accept-Language", "en-US,en;q=0.9"),
    ("Cache-Control", "no-cache"),
    ("Origin", "chrome-extension://emcdcoaglgspoogqfiggmhnhgabhppkm"),
    ("Pragma", "no-cache"),
    (
        "User-Agent",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    ),
];

/// WebSocket endpoint configuration
#[derive(Debug, Clone)]
pub struct WsConfig {
    /// Base WebSocket URL, without query parameters
    pub base_url: String,
    /// Protocol version tag appended to every connection
    pub version: String,
    /// Keepalive interval in milliseconds
    pub ping_interval_ms: u64,
    /// Connection timeout in milliseconds
    pub connect_timeout_ms: u64,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            base_url: "wss://secure.ws.teneo.pro/websocket".to_string(),
            version: "v0.2".to_string(),
            ping_interval_ms: 10_000,   // 10 seconds
            connect_timeout_ms: 10_000, // 10 seconds
        }
    }
}

impl WsConfig {
    /// Build the per-account session URL carrying the bearer token and
    /// protocol version as query parameters.
    pub fn session_url(&self, token: &str) -> String {
        format!(
            "{}?accessToken={}&version={}",
            self.base_url, token, self.version
        )
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// Reconnection policy
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Max reconnection attempts before giving up
    pub max_attempts: u32,
    /// Base delay in milliseconds
    pub base_delay_ms: u64,
    /// Delay cap in milliseconds
    pub max_delay_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
        }
    }
}

impl ReconnectConfig {
    /// Delay before retry number `attempt` (1-based).
    ///
    /// The exponent is the attempt count after incrementing, so the first
    /// retry waits `base * 2`, not `base`. The remote service tolerates this
    /// schedule and existing deployments depend on it; do not "fix" the
    /// exponent to `attempt - 1`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = cmp::min(attempt, 32);
        let delay = self.base_delay_ms.saturating_mul(2_u64.saturating_pow(exp));
        Duration::from_millis(cmp::min(delay, self.max_delay_ms))
    }
}

/// Process-level configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub ws: WsConfig,
    pub reconnect: ReconnectConfig,
    /// Newline-delimited credential file, one token per line
    pub token_file: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ws: WsConfig::default(),
            reconnect: ReconnectConfig::default(),
            token_file: PathBuf::from("data.txt"),
        }
    }
}

impl AppConfig {
    /// Load configuration, honoring the `TOKEN_FILE` environment override.
    pub fn from_env() -> Self {
        let token_file = env::var("TOKEN_FILE")
            .map_or_else(|_| PathBuf::from("data.txt"), PathBuf::from);
        Self {
            ws: WsConfig::default(),
            reconnect: ReconnectConfig::default(),
            token_file,
        }
    }
}
