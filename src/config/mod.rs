//! Configuration management.
//!
//! Supports configuration from:
//! - TOML config files
//! - Environment variables (`EPP_*`, applied over the file)
//! - Builder methods for programmatic use
//!
//! ```toml
//! [registry]
//! uri = "https://epp.nic.it/"
//! tag = "REG-A"
//! password = "secret"
//!
//! [session]
//! handling = "auto"
//! silence_empty_polls = true
//!
//! [transport]
//! xml_log_file = "/var/log/epp/xml.log"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::{EppError, Result};
use crate::session::{FileStore, Session, SessionHandling, SessionOptions, DEFAULT_SERVICES};
use crate::transport::{HttpTransport, HttpTransportConfig, DEFAULT_USER_AGENT};

/// Main configuration struct
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Registry endpoint and credentials
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Session handling and persistence
    #[serde(default)]
    pub session: SessionConfig,

    /// Login parameters
    #[serde(default)]
    pub login: LoginConfig,

    /// HTTP transport
    #[serde(default)]
    pub transport: TransportConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| {
            EppError::Config(format!("Failed to read config file {}: {e}", path.display()))
        })?;

        toml::from_str(&content).map_err(|e| EppError::Config(format!("Failed to parse config: {e}")))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::default().apply_env()
    }

    /// Override fields from `EPP_*` environment variables
    pub fn apply_env(self) -> Self {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    fn apply_vars(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(uri) = var("EPP_URI") {
            self.registry.uri = uri;
        }
        if let Some(tag) = var("EPP_TAG") {
            self.registry.tag = tag;
        }
        if let Some(password) = var("EPP_PASSWORD") {
            self.registry.password = password;
        }
        if let Some(path) = var("EPP_STORE_FILE") {
            self.session.store_file = Some(PathBuf::from(path));
        }
        if let Some(path) = var("EPP_XML_LOG") {
            self.transport.xml_log_file = Some(PathBuf::from(path));
        }
        if let Some(handling) = var("EPP_SESSION_HANDLING") {
            match handling.parse() {
                Ok(handling) => self.session.handling = handling,
                Err(e) => tracing::warn!("Ignoring EPP_SESSION_HANDLING: {e}"),
            }
        }
        self
    }

    /// Check required fields
    pub fn validate(&self) -> Result<()> {
        if self.registry.uri.is_empty() {
            return Err(EppError::Config("registry.uri is required".to_string()));
        }
        self.registry.url()?;
        if self.registry.tag.is_empty() {
            return Err(EppError::Config("registry.tag is required".to_string()));
        }
        if self.registry.password.is_empty() {
            return Err(EppError::Config("registry.password is required".to_string()));
        }
        Ok(())
    }

    /// Session store path, defaulting under the user data directory
    pub fn store_file(&self) -> Result<PathBuf> {
        if let Some(path) = &self.session.store_file {
            return Ok(path.clone());
        }
        dirs::data_dir()
            .map(|dir| {
                dir.join("epp")
                    .join(format!("{}.session.json", self.registry.tag))
            })
            .ok_or_else(|| {
                EppError::Config("no data directory; set session.store_file".to_string())
            })
    }

    /// Session options derived from this config
    pub fn session_options(&self) -> SessionOptions {
        let mut options = SessionOptions::new(&self.registry.tag, &self.registry.password)
            .with_handling(self.session.handling)
            .with_request_timeout(Duration::from_secs(self.transport.request_timeout_secs));
        if let Some(prefix) = &self.session.clid_prefix {
            options = options.with_cl_tr_id_prefix(prefix);
        }
        if let Some(path) = &self.transport.xml_log_file {
            options = options.with_xml_log(path);
        }
        options.silence_empty_polls = self.session.silence_empty_polls;
        options.lang = self.login.lang.clone();
        options.version = self.login.version.clone();
        options.services = self.login.services.clone();
        options.extensions = self.login.extensions.clone();
        options
    }

    /// HTTP transport settings derived from this config
    pub fn http_transport_config(&self) -> Result<HttpTransportConfig> {
        let mut config = HttpTransportConfig::new(self.registry.url()?)
            .with_user_agent(&self.transport.user_agent)
            .with_timeouts(
                Duration::from_secs(self.transport.request_timeout_secs),
                Duration::from_secs(self.transport.connect_timeout_secs),
            );
        if let Some(ca) = &self.registry.ca_file {
            config = config.with_ca_file(ca);
        }
        Ok(config)
    }

    /// Validate and open a session over HTTP with a file store
    pub fn open_session(&self) -> Result<Session<HttpTransport, FileStore>> {
        self.validate()?;
        let transport = HttpTransport::new(self.http_transport_config()?);
        let store = FileStore::new(self.store_file()?);
        Session::new(transport, store, self.session_options())
    }

    /// Set the registry endpoint and credentials
    pub fn with_registry(
        mut self,
        uri: impl Into<String>,
        tag: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.registry.uri = uri.into();
        self.registry.tag = tag.into();
        self.registry.password = password.into();
        self
    }

    /// Set session handling policy
    pub fn with_handling(mut self, handling: SessionHandling) -> Self {
        self.session.handling = handling;
        self
    }

    /// Set the session store path
    pub fn with_store_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.session.store_file = Some(path.into());
        self
    }
}

/// Registry endpoint and credentials
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// EPP gateway URL
    #[serde(default)]
    pub uri: String,

    /// Registrar tag
    #[serde(default)]
    pub tag: String,

    /// Registrar password
    #[serde(default)]
    pub password: String,

    /// Extra trusted CA certificate (PEM)
    #[serde(default)]
    pub ca_file: Option<PathBuf>,
}

impl RegistryConfig {
    /// Parsed gateway URL
    pub fn url(&self) -> Result<Url> {
        Url::parse(&self.uri)
            .map_err(|e| EppError::Config(format!("Invalid registry.uri {:?}: {e}", self.uri)))
    }
}

/// Session handling and persistence
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// auto, manual or disabled
    pub handling: SessionHandling,

    /// Session store file (default: `<data dir>/epp/<tag>.session.json`)
    pub store_file: Option<PathBuf>,

    /// Client transaction ID prefix (default: `<tag>-`)
    pub clid_prefix: Option<String>,

    /// Only audit polls that return a message
    pub silence_empty_polls: bool,
}

/// Login parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginConfig {
    /// Response language
    pub lang: String,

    /// Protocol version
    pub version: String,

    /// Object service URIs
    pub services: Vec<String>,

    /// Extension URIs
    pub extensions: Vec<String>,
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            lang: "en".to_string(),
            version: "1.0".to_string(),
            services: DEFAULT_SERVICES.iter().map(|s| s.to_string()).collect(),
            extensions: Vec::new(),
        }
    }
}

/// HTTP transport configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// User-Agent header
    pub user_agent: String,

    /// Per-request deadline in seconds
    pub request_timeout_secs: u64,

    /// Connect timeout in seconds
    pub connect_timeout_secs: u64,

    /// XML audit log file
    pub xml_log_file: Option<PathBuf>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout_secs: 60,
            connect_timeout_secs: 15,
            xml_log_file: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Config {
        Config::default().with_registry("https://epp.example.it/", "REG-A", "secret")
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.session.handling, SessionHandling::Auto);
        assert_eq!(config.transport.request_timeout_secs, 60);
        assert_eq!(config.transport.connect_timeout_secs, 15);
        assert_eq!(config.transport.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(config.login.services.len(), 3);
        assert!(!config.session.silence_empty_polls);
    }

    #[test]
    fn test_config_from_toml() {
        let toml = r#"
            [registry]
            uri = "https://epp.example.it/gateway"
            tag = "REG-A"
            password = "secret"

            [session]
            handling = "manual"
            store_file = "/tmp/reg-a.json"
            silence_empty_polls = true

            [login]
            lang = "it"
            extensions = ["http://www.nic.it/ITNIC-EPP/extepp-2.0"]

            [transport]
            request_timeout_secs = 30
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.registry.tag, "REG-A");
        assert_eq!(config.session.handling, SessionHandling::Manual);
        assert_eq!(config.login.lang, "it");
        assert_eq!(config.login.version, "1.0");
        assert_eq!(config.transport.request_timeout_secs, 30);
        assert_eq!(config.transport.connect_timeout_secs, 15);
        assert_eq!(config.store_file().unwrap(), PathBuf::from("/tmp/reg-a.json"));
        config.validate().unwrap();
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("epp.toml");
        std::fs::write(&path, "[registry]\nuri = \"https://e.it/\"\ntag = \"T\"\npassword = \"p\"\n").unwrap();
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.registry.uri, "https://e.it/");
        assert!(matches!(
            Config::from_file(dir.path().join("missing.toml")),
            Err(EppError::Config(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let config = valid().apply_vars(|key| match key {
            "EPP_TAG" => Some("REG-B".to_string()),
            "EPP_SESSION_HANDLING" => Some("disabled".to_string()),
            "EPP_XML_LOG" => Some("/tmp/xml.log".to_string()),
            _ => None,
        });
        assert_eq!(config.registry.tag, "REG-B");
        assert_eq!(config.registry.password, "secret");
        assert_eq!(config.session.handling, SessionHandling::Disabled);
        assert_eq!(config.transport.xml_log_file, Some(PathBuf::from("/tmp/xml.log")));
    }

    #[test]
    fn test_validation() {
        assert!(valid().validate().is_ok());
        assert!(matches!(Config::default().validate(), Err(EppError::Config(_))));
        let bad_uri = Config::default().with_registry("not a url", "T", "p");
        assert!(matches!(bad_uri.validate(), Err(EppError::Config(_))));
        let no_pw = Config::default().with_registry("https://e.it/", "T", "");
        assert!(matches!(no_pw.validate(), Err(EppError::Config(_))));
    }

    #[test]
    fn test_session_options() {
        let mut config = valid();
        config.session.clid_prefix = Some("X-".to_string());
        config.session.silence_empty_polls = true;
        let options = config.session_options();
        assert_eq!(options.tag, "REG-A");
        assert_eq!(options.cl_tr_id_prefix, "X-");
        assert!(options.silence_empty_polls);
        assert_eq!(options.request_timeout, Duration::from_secs(60));

        assert_eq!(valid().session_options().cl_tr_id_prefix, "REG-A-");
    }

    #[test]
    fn test_open_session_with_store_file() {
        let dir = tempfile::tempdir().unwrap();
        let session = valid()
            .with_store_file(dir.path().join("s.json"))
            .open_session()
            .unwrap();
        assert_eq!(session.status(), crate::session::ProtocolState::New);
        assert!(session.transport().is_connected());
    }
}
