//! Configuration module
//!
//! Sources, later ones overriding earlier ones:
//! - `config/default.{toml,yaml,json}` (optional)
//! - environment variables `HOTSPOT_BOT__SECTION__KEY`

use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub routers: RoutersConfig,
    pub chat: ChatConfig,
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoutersConfig {
    pub primary: RouterConfig,
    pub secondary: RouterConfig,
}

/// Connection settings for one RouterOS device
#[derive(Clone, Deserialize)]
pub struct RouterConfig {
    pub label: String,
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_true")]
    pub tls: bool,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl RouterConfig {
    /// Configured port, or the RouterOS default for the chosen transport
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(if self.tls { 8729 } else { 8728 })
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

// Keeps the password out of logs.
impl std::fmt::Debug for RouterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterConfig")
            .field("label", &self.label)
            .field("host", &self.host)
            .field("port", &self.port())
            .field("username", &self.username)
            .field("tls", &self.tls)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_host")]
    pub listen_host: String,
    #[serde(default = "default_port")]
    pub listen_port: u16,
    /// Shared secret expected in the `x-webhook-token` header
    #[serde(default)]
    pub webhook_token: Option<String>,
    pub gateway_url: String,
    #[serde(default)]
    pub gateway_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DispatcherConfig {
    /// Maximum concurrently running operations; 0 means unbounded
    #[serde(default)]
    pub max_in_flight: usize,
}

fn default_true() -> bool {
    true
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8090
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::Environment::with_prefix("HOTSPOT_BOT").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
