//! Configuration management.
//!
//! Supports configuration from:
//! - TOML config files
//! - Environment variables

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{FunXmppError, Result};

/// Main configuration struct
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Chat server connection
    #[serde(default)]
    pub server: ServerConfig,

    /// Client identity and login behavior
    #[serde(default)]
    pub client: ClientConfig,

    /// Registration API endpoints
    #[serde(default)]
    pub registration: RegistrationConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| FunXmppError::Config(format!("Failed to read config file: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| FunXmppError::Config(format!("Failed to parse config: {e}")))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("FUNXMPP_HOST") {
            config.server.host = host;
        }
        if let Ok(port) = std::env::var("FUNXMPP_PORT") {
            if let Ok(port) = port.parse() {
                config.server.port = port;
            }
        }
        if let Ok(domain) = std::env::var("FUNXMPP_DOMAIN") {
            config.server.domain = domain;
        }
        if let Ok(path) = std::env::var("FUNXMPP_CHALLENGE_FILE") {
            config.client.challenge_file = Some(PathBuf::from(path));
        }
        if let Ok(val) = std::env::var("FUNXMPP_VERIFY_TAGS") {
            config.client.verify_tags = matches!(val.as_str(), "1" | "true" | "yes");
        }

        config
    }

    /// Merge with another config (other takes precedence)
    pub fn merge(self, other: Self) -> Self {
        let server_default = ServerConfig::default();
        let client_default = ClientConfig::default();
        Self {
            server: ServerConfig {
                host: if other.server.host != server_default.host {
                    other.server.host
                } else {
                    self.server.host
                },
                port: if other.server.port != server_default.port {
                    other.server.port
                } else {
                    self.server.port
                },
                domain: if other.server.domain != server_default.domain {
                    other.server.domain
                } else {
                    self.server.domain
                },
                ..other.server
            },
            client: ClientConfig {
                challenge_file: if other.client.challenge_file != client_default.challenge_file {
                    other.client.challenge_file
                } else {
                    self.client.challenge_file
                },
                ..other.client
            },
            registration: other.registration,
        }
    }
}

/// Chat server connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to connect to
    pub host: String,

    /// TCP port
    pub port: u16,

    /// Server domain used in JIDs and the stream `to` attribute
    pub domain: String,

    /// Connect timeout in milliseconds
    pub connect_timeout_ms: u64,

    /// Read timeout in milliseconds
    pub read_timeout_ms: u64,

    /// Bytes requested per socket read
    pub read_chunk_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "c.whatsapp.net".to_string(),
            port: 443,
            domain: "s.whatsapp.net".to_string(),
            connect_timeout_ms: 2000,
            read_timeout_ms: 2000,
            read_chunk_size: 1024,
        }
    }
}

impl ServerConfig {
    /// Connect timeout as a `Duration`
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Read timeout as a `Duration`
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

/// Client identity and login settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Device name
    pub device: String,

    /// Client version
    pub version: String,

    /// User agent sent in the auth blob and HTTP calls
    pub user_agent: String,

    /// Inbound polls to wait for `success` during login
    pub login_retries: u32,

    /// Where the last challenge nonce is kept between sessions
    pub challenge_file: Option<PathBuf>,

    /// Reject inbound frames whose tag does not match
    pub verify_tags: bool,

    /// Ask for profile picture change notifications
    pub profile_subscribe: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            device: "Android".to_string(),
            version: "2.11.134".to_string(),
            user_agent: "WhatsApp/2.11.134 Android/4.3 Device/GalaxyS3".to_string(),
            login_retries: 100,
            challenge_file: dirs::data_dir().map(|p| p.join("funxmpp").join("nextChallenge.dat")),
            verify_tags: false,
            profile_subscribe: false,
        }
    }
}

impl ClientConfig {
    /// Resource string for the start-of-stream frame, `<device>-<version>-<port>`
    pub fn resource(&self, port: u16) -> String {
        format!("{}-{}-{}", self.device, self.version, port)
    }
}

/// Registration endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationConfig {
    /// Credential check
    pub check_url: String,

    /// Code request
    pub code_url: String,

    /// Code registration
    pub register_url: String,

    /// HTTP timeout in seconds
    pub timeout_secs: u64,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            check_url: "https://v.whatsapp.net/v2/exist".to_string(),
            code_url: "https://v.whatsapp.net/v2/code".to_string(),
            register_url: "https://v.whatsapp.net/v2/register".to_string(),
            timeout_secs: 30,
        }
    }
}
