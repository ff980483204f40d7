//! Configuration system for the overlay.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $OVERLAY_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/overlay/config.toml
//!   3. ~/.config/overlay/config.toml

use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::identity::is_valid_name;

/// Well-known port the directory listens on.
pub const DEFAULT_DIRECTORY_PORT: u16 = 5077;

/// Default degree cap (K).
pub const DEFAULT_MAX_NEIGHBORS: usize = 3;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub directory: DirectoryConfig,
    pub node: NodeConfig,
    pub protocol: ProtocolConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// Address the directory binds.
    pub bind: IpAddr,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Display name. Empty = $HOSTNAME, falling back to "node".
    pub name: String,
    /// Directory endpoint, `host:port`.
    pub directory: String,
    /// Address the node's listener binds.
    pub bind: IpAddr,
    /// Listening port. 0 = random from the ephemeral range.
    pub port: u16,
    /// Degree cap (K).
    pub max_neighbors: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    pub connect_timeout_ms: u64,
    /// Bound on every single-line read, inbound and outbound.
    pub read_timeout_ms: u64,
    /// Redirects followed before a negotiation gives up.
    pub max_redirect_hops: usize,
    /// Inbound connections handled at once.
    pub max_concurrent_handlers: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Loopback HTTP status port. 0 = disabled.
    pub port: u16,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            directory: DirectoryConfig::default(),
            node: NodeConfig::default(),
            protocol: ProtocolConfig::default(),
            api: ApiConfig::default(),
        }
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::from([0, 0, 0, 0]),
            port: DEFAULT_DIRECTORY_PORT,
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            directory: format!("127.0.0.1:{}", DEFAULT_DIRECTORY_PORT),
            bind: IpAddr::from([0, 0, 0, 0]),
            port: 0,
            max_neighbors: DEFAULT_MAX_NEIGHBORS,
        }
    }
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 3_000,
            read_timeout_ms: 5_000,
            max_redirect_hops: 16,
            max_concurrent_handlers: 64,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { port: 0 }
    }
}

impl ProtocolConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

impl NodeConfig {
    /// The configured name, or the host name when left empty.
    pub fn resolved_name(&self) -> String {
        if !self.name.is_empty() {
            return self.name.clone();
        }
        std::env::var("HOSTNAME")
            .ok()
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| "node".to_string())
    }

    /// Fixed listening port, or `None` to pick one from the ephemeral range.
    pub fn fixed_port(&self) -> Option<u16> {
        (self.port != 0).then_some(self.port)
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
        .join("overlay")
}

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl OverlayConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadFailed(path.clone(), e))?;
            Self::from_toml(&text).map_err(|e| ConfigError::ParseFailed(path.clone(), e))?
        } else {
            OverlayConfig::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("OVERLAY_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&OverlayConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Reject values the protocol cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let name = self.node.resolved_name();
        if !is_valid_name(&name) {
            return Err(ConfigError::Invalid(format!(
                "node name {name:?} must be non-empty and free of ':' and line breaks"
            )));
        }
        if self.node.max_neighbors == 0 {
            return Err(ConfigError::Invalid(
                "node.max_neighbors must be at least 1".to_string(),
            ));
        }
        if self.protocol.max_concurrent_handlers == 0 {
            return Err(ConfigError::Invalid(
                "protocol.max_concurrent_handlers must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply OVERLAY_* env var overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("OVERLAY_NODE__NAME") {
            self.node.name = v;
        }
        if let Ok(v) = std::env::var("OVERLAY_NODE__DIRECTORY") {
            self.node.directory = v;
        }
        if let Ok(v) = std::env::var("OVERLAY_NODE__PORT") {
            if let Ok(p) = v.parse() {
                self.node.port = p;
            }
        }
        if let Ok(v) = std::env::var("OVERLAY_NODE__MAX_NEIGHBORS") {
            if let Ok(k) = v.parse() {
                self.node.max_neighbors = k;
            }
        }
        if let Ok(v) = std::env::var("OVERLAY_DIRECTORY__PORT") {
            if let Ok(p) = v.parse() {
                self.directory.port = p;
            }
        }
        if let Ok(v) = std::env::var("OVERLAY_PROTOCOL__READ_TIMEOUT_MS") {
            if let Ok(ms) = v.parse() {
                self.protocol.read_timeout_ms = ms;
            }
        }
        if let Ok(v) = std::env::var("OVERLAY_PROTOCOL__MAX_REDIRECT_HOPS") {
            if let Ok(h) = v.parse() {
                self.protocol.max_redirect_hops = h;
            }
        }
        if let Ok(v) = std::env::var("OVERLAY_API__PORT") {
            if let Ok(p) = v.parse() {
                self.api.port = p;
            }
        }
    }
}
