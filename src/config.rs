use crate::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
}

/// Where captured events are delivered. The backend owns all decision
/// logic; this subsystem only ships observations to it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_ingest_path")]
    pub ingest_path: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BrowserConfig {
    /// Remote-debugging port of the already-running browser hosting the game.
    #[serde(default = "default_cdp_port")]
    pub cdp_port: u16,
    /// Substring used to pick the game page among open targets.
    #[serde(default = "default_page_url_hint")]
    pub page_url_hint: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CaptureConfig {
    /// `source` tag stamped on every forwarded event.
    #[serde(default = "default_source_tag")]
    pub source_tag: String,
    /// File name of the protocol-definition resource worth enriching.
    #[serde(default = "default_definition_resource")]
    pub definition_resource: String,
}

fn default_base_url() -> String {
    "http://127.0.0.1:8765".to_string()
}
fn default_ingest_path() -> String {
    "/api/ingest".to_string()
}
fn default_cdp_port() -> u16 {
    9222
}
fn default_page_url_hint() -> String {
    "maj-soul".to_string()
}
fn default_listen_port() -> u16 {
    9224
}
fn default_source_tag() -> String {
    "bridge".to_string()
}
fn default_definition_resource() -> String {
    "liqi.json".to_string()
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            ingest_path: default_ingest_path(),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            cdp_port: default_cdp_port(),
            page_url_hint: default_page_url_hint(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_port: default_listen_port(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            source_tag: default_source_tag(),
            definition_resource: default_definition_resource(),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub backend_url: Option<String>,
    pub cdp_port: Option<u16>,
    pub listen_port: Option<u16>,
}

pub fn default_config_path() -> Result<PathBuf> {
    default_config_dir().map(|p| p.join("config.toml"))
}

pub fn default_config_dir() -> Result<PathBuf> {
    std::env::var("XDG_CONFIG_HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var("HOME")
                .ok()
                .map(|home| PathBuf::from(home).join(".config"))
        })
        .map(|p| p.join("majsoul-bridge"))
        .ok_or_else(|| BridgeError::ConfigError("Could not determine config directory".into()))
}

impl Config {
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        let mut config = Self::default();

        let path = match path {
            Some(p) => p.clone(),
            None => default_config_path()?,
        };
        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            config = toml::from_str(&content)?;
        }

        config.load_from_env();

        Ok(config)
    }

    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(url) = overrides.backend_url {
            self.backend.base_url = url;
        }
        if let Some(port) = overrides.cdp_port {
            self.browser.cdp_port = port;
        }
        if let Some(port) = overrides.listen_port {
            self.server.listen_port = port;
        }
        self
    }

    fn load_from_env(&mut self) {
        if let Ok(url) = std::env::var("BRIDGE_BACKEND_URL") {
            self.backend.base_url = url;
        }
        if let Ok(port) = std::env::var("BRIDGE_CDP_PORT")
            && let Ok(port) = port.parse()
        {
            self.browser.cdp_port = port;
        }
        if let Ok(port) = std::env::var("BRIDGE_LISTEN_PORT")
            && let Ok(port) = port.parse()
        {
            self.server.listen_port = port;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.browser.cdp_port < 1024 {
            return Err(BridgeError::ConfigError(format!(
                "cdp_port {} is out of valid range (1024-65535)",
                self.browser.cdp_port
            )));
        }

        Url::parse(&self.backend.base_url)
            .map_err(|_| BridgeError::InvalidUrl(self.backend.base_url.clone()))?;

        if self.capture.definition_resource.is_empty() {
            return Err(BridgeError::ConfigError(
                "definition_resource must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Full ingest endpoint derived from the backend base URL.
    pub fn ingest_endpoint(&self) -> Result<Url> {
        let base = Url::parse(&self.backend.base_url)
            .map_err(|_| BridgeError::InvalidUrl(self.backend.base_url.clone()))?;
        base.join(&self.backend.ingest_path)
            .map_err(|_| BridgeError::InvalidUrl(self.backend.ingest_path.clone()))
    }
}
