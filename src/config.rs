//! Configuration for the API architect service.
//!
//! Defines collaborator endpoints, listener addresses, fallback values, and
//! logging settings.

use crate::enrichment::{AmbiguityReport, SecurityReport, ValidationReport};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ArchitectConfig {
    /// External collaborator endpoints
    #[serde(default)]
    pub collaborators: CollaboratorsConfig,

    /// Control API listener
    #[serde(default)]
    pub server: ServerConfig,

    /// Mock session listener
    #[serde(default)]
    pub mock: MockConfig,

    /// Values substituted when an optional collaborator is unavailable
    #[serde(default)]
    pub fallbacks: FallbackValues,

    /// Global settings
    #[serde(default)]
    pub settings: GlobalSettings,
}

impl ArchitectConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides from the process environment.
    pub fn with_env(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides using the given variable lookup.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let urls = [
            ("SPEC_GENERATOR_URL", &mut self.collaborators.generator.url),
            ("OPENAPI_VALIDATOR_URL", &mut self.collaborators.validator.url),
            ("AMBIGUITY_ANALYZER_URL", &mut self.collaborators.ambiguity.url),
            ("SECURITY_ANALYZER_URL", &mut self.collaborators.security.url),
        ];
        for (key, slot) in urls {
            if let Some(value) = lookup(key).filter(|v| !v.is_empty()) {
                *slot = value;
            }
        }

        if let Some(host) = lookup("MOCK_HOST").filter(|v| !v.is_empty()) {
            self.mock.host = host;
        }
        if let Some(port) = lookup("MOCK_PORT").and_then(|v| v.parse().ok()) {
            self.mock.port = port;
        }
        if let Some(url) = lookup("MOCK_PUBLIC_URL").filter(|v| !v.is_empty()) {
            self.mock.public_url = Some(url);
        }
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, endpoint) in self.collaborators.iter() {
            endpoint
                .validate()
                .map_err(|e| anyhow::anyhow!("Collaborator {}: {}", name, e))?;
        }
        if self.server.host == self.mock.host && self.server.port == self.mock.port {
            anyhow::bail!(
                "Mock listener cannot share the control address {}:{}",
                self.server.host,
                self.server.port
            );
        }
        Ok(())
    }
}

/// The four collaborator endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CollaboratorsConfig {
    /// Contract generator (mandatory)
    #[serde(default = "default_generator")]
    pub generator: EndpointConfig,

    /// Structural validator
    #[serde(default = "default_validator")]
    pub validator: EndpointConfig,

    /// Ambiguity analyzer
    #[serde(default = "default_ambiguity")]
    pub ambiguity: EndpointConfig,

    /// Security analyzer
    #[serde(default = "default_security")]
    pub security: EndpointConfig,
}

impl CollaboratorsConfig {
    fn iter(&self) -> impl Iterator<Item = (&'static str, &EndpointConfig)> {
        [
            ("generator", &self.generator),
            ("validator", &self.validator),
            ("ambiguity", &self.ambiguity),
            ("security", &self.security),
        ]
        .into_iter()
    }
}

impl Default for CollaboratorsConfig {
    fn default() -> Self {
        Self {
            generator: default_generator(),
            validator: default_validator(),
            ambiguity: default_ambiguity(),
            security: default_security(),
        }
    }
}

fn default_generator() -> EndpointConfig {
    EndpointConfig::new("http://localhost:8000", "/generate", 60_000)
}

fn default_validator() -> EndpointConfig {
    EndpointConfig::new("http://localhost:8001", "/validate", 10_000)
}

fn default_ambiguity() -> EndpointConfig {
    EndpointConfig::new("http://localhost:8002", "/analyze", 30_000)
}

fn default_security() -> EndpointConfig {
    EndpointConfig::new("http://localhost:8003", "/analyze", 10_000)
}

/// A single collaborator endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct EndpointConfig {
    /// Base URL of the collaborator
    pub url: String,

    /// Request path appended to the base URL
    pub path: String,

    /// Per-call timeout in milliseconds
    pub timeout_ms: u64,
}

impl EndpointConfig {
    pub fn new(url: &str, path: &str, timeout_ms: u64) -> Self {
        Self {
            url: url.to_string(),
            path: path.to_string(),
            timeout_ms,
        }
    }

    /// Full request URL.
    pub fn endpoint(&self) -> String {
        format!(
            "{}/{}",
            self.url.trim_end_matches('/'),
            self.path.trim_start_matches('/')
        )
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Validate the endpoint.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.url.is_empty() {
            anyhow::bail!("url cannot be empty");
        }
        if !self.url.starts_with("http://") && !self.url.starts_with("https://") {
            anyhow::bail!("url must be http(s): {}", self.url);
        }
        if self.timeout_ms == 0 {
            anyhow::bail!("timeout_ms must be greater than zero");
        }
        Ok(())
    }
}

/// Control API listener.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_server_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_server_port(),
        }
    }
}

/// Mock session listener.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MockConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_mock_port")]
    pub port: u16,

    /// Base URL handed to callers (derived from host/port when unset)
    #[serde(default)]
    pub public_url: Option<String>,
}

impl MockConfig {
    /// Caller-facing base URL of the mock session.
    pub fn base_url(&self) -> String {
        if let Some(url) = &self.public_url {
            return url.trim_end_matches('/').to_string();
        }
        let host = match self.host.as_str() {
            "0.0.0.0" | "::" | "[::]" => "localhost",
            other => other,
        };
        format!("http://{}:{}", host, self.port)
    }
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_mock_port(),
            public_url: None,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    5000
}

fn default_mock_port() -> u16 {
    4010
}

/// Fallback payloads for the optional collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FallbackValues {
    #[serde(default = "ValidationReport::unavailable")]
    pub validation: ValidationReport,

    #[serde(default)]
    pub ambiguity: AmbiguityReport,

    #[serde(default)]
    pub security: SecurityReport,
}

impl Default for FallbackValues {
    fn default() -> Self {
        Self {
            validation: ValidationReport::unavailable(),
            ambiguity: AmbiguityReport::default(),
            security: SecurityReport::default(),
        }
    }
}

/// Global settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GlobalSettings {
    /// Log all matched mock requests
    #[serde(default = "default_true")]
    pub log_matches: bool,

    /// Log unmatched mock requests
    #[serde(default = "default_true")]
    pub log_unmatched: bool,

    /// Allow any origin on the control API
    #[serde(default = "default_true")]
    pub cors_permissive: bool,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            log_matches: true,
            log_unmatched: true,
            cors_permissive: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Configuration printed by `--print-config`.
pub const DEFAULT_CONFIG_YAML: &str = r#"collaborators:
  generator:
    url: http://localhost:8000
    path: /generate
    timeout_ms: 60000
  validator:
    url: http://localhost:8001
    path: /validate
    timeout_ms: 10000
  ambiguity:
    url: http://localhost:8002
    path: /analyze
    timeout_ms: 30000
  security:
    url: http://localhost:8003
    path: /analyze
    timeout_ms: 10000
server:
  host: 0.0.0.0
  port: 5000
mock:
  host: 0.0.0.0
  port: 4010
fallbacks:
  validation:
    valid: false
    errors: ["validation unavailable"]
settings:
  log_matches: true
  log_unmatched: true
  cors_permissive: true
"#;
