//! Configuration system for the agent router
//!
//! Configuration is read from a TOML file. Every section and field has a
//! default, so an empty file (or no file at all) yields a working router that
//! tries the conventional local agent endpoints.

use crate::transport::{HttpTransportConfig, PollPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Files tried, in order, when no configuration path is given
pub const DEFAULT_CONFIG_PATHS: &[&str] = &["router.toml", "config/router.toml"];

/// Main router configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RouterConfig {
    #[serde(default)]
    pub router: RouterSection,
    #[serde(default)]
    pub agents: AgentsSection,
    #[serde(default)]
    pub transport: TransportSection,
    #[serde(default)]
    pub planner: PlannerConfig,
}

/// Identity and bind address of the router itself
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RouterSection {
    #[serde(default = "default_router_name")]
    pub name: String,
    #[serde(default = "default_router_description")]
    pub description: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for RouterSection {
    fn default() -> Self {
        Self {
            name: default_router_name(),
            description: default_router_description(),
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_router_name() -> String {
    "Smart Orchestrator Agent".to_string()
}

fn default_router_description() -> String {
    "Routes requests to specialized agents based on their advertised skills".to_string()
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    8000
}

/// Agents registered at startup
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentsSection {
    #[serde(default = "default_agent_endpoints")]
    pub endpoints: Vec<String>,
}

impl Default for AgentsSection {
    fn default() -> Self {
        Self {
            endpoints: default_agent_endpoints(),
        }
    }
}

fn default_agent_endpoints() -> Vec<String> {
    vec![
        "http://localhost:8001".to_string(),
        "http://localhost:8002".to_string(),
        "http://localhost:8003".to_string(),
    ]
}

/// Timeouts and polling for agent calls
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransportSection {
    /// Agent card fetch timeout
    #[serde(default = "default_discovery_timeout_ms")]
    pub discovery_timeout_ms: u64,
    /// Timeout for a single JSON-RPC call
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Delay between task polls (1..=1000)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Polls before a task is reported as timed out (1..=120)
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,
}

impl Default for TransportSection {
    fn default() -> Self {
        Self {
            discovery_timeout_ms: default_discovery_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            max_poll_attempts: default_max_poll_attempts(),
        }
    }
}

impl TransportSection {
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy::new(
            Duration::from_millis(self.poll_interval_ms),
            self.max_poll_attempts,
        )
    }

    pub fn http_config(&self) -> HttpTransportConfig {
        HttpTransportConfig::default()
            .with_discovery_timeout_ms(self.discovery_timeout_ms)
            .with_request_timeout_ms(self.request_timeout_ms)
    }
}

fn default_discovery_timeout_ms() -> u64 {
    5000
}

fn default_request_timeout_ms() -> u64 {
    30000
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_max_poll_attempts() -> u32 {
    30
}

/// Multi-agent planning limits
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlannerConfig {
    /// Maximum number of steps in a plan
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    /// Score the first capability must exceed
    #[serde(default = "default_primary_threshold")]
    pub primary_threshold: f64,
    /// Score later capabilities must exceed
    #[serde(default = "default_secondary_threshold")]
    pub secondary_threshold: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            primary_threshold: default_primary_threshold(),
            secondary_threshold: default_secondary_threshold(),
        }
    }
}

impl PlannerConfig {
    /// Validate planner limits
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_steps == 0 {
            return Err(ConfigError::InvalidConfig(
                "planner.max_steps must be at least 1".to_string(),
            ));
        }
        for (name, value) in [
            ("primary_threshold", self.primary_threshold),
            ("secondary_threshold", self.secondary_threshold),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidConfig(format!(
                    "planner.{name} must be a non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }
}

fn default_max_steps() -> usize {
    2
}

fn default_primary_threshold() -> f64 {
    1.0
}

fn default_secondary_threshold() -> f64 {
    0.5
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl RouterConfig {
    /// Load configuration from a TOML file and validate it
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: RouterConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if given, else the first existing default location,
    /// else built-in defaults
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load_from_file(path);
        }

        match Self::find_default_file() {
            Some(found) => Self::load_from_file(&found),
            None => Ok(Self::default()),
        }
    }

    fn find_default_file() -> Option<PathBuf> {
        DEFAULT_CONFIG_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|candidate| candidate.is_file())
    }

    /// Validate configuration consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.router.name.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "router.name must not be empty".to_string(),
            ));
        }

        for endpoint in &self.agents.endpoints {
            validate_endpoint(endpoint)?;
        }

        if !(1..=1000).contains(&self.transport.poll_interval_ms) {
            return Err(ConfigError::InvalidConfig(format!(
                "transport.poll_interval_ms must be between 1 and 1000, got {}",
                self.transport.poll_interval_ms
            )));
        }

        if !(1..=120).contains(&self.transport.max_poll_attempts) {
            return Err(ConfigError::InvalidConfig(format!(
                "transport.max_poll_attempts must be between 1 and 120, got {}",
                self.transport.max_poll_attempts
            )));
        }

        if self.transport.discovery_timeout_ms == 0 || self.transport.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidConfig(
                "transport timeouts must be greater than zero".to_string(),
            ));
        }

        self.planner.validate()
    }

    /// Public URL the router advertises in its own agent card
    pub fn public_url(&self) -> String {
        format!("http://{}:{}/", self.router.host, self.router.port)
    }

    /// Address the server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.router.host, self.router.port)
    }

    /// Create a test configuration with fast polling and no default agents
    pub fn test_config() -> Self {
        let mut config = Self::default();
        config.agents.endpoints.clear();
        config.transport.poll_interval_ms = 1;
        config.transport.max_poll_attempts = 5;
        config
    }
}

fn validate_endpoint(endpoint: &str) -> Result<(), ConfigError> {
    let url = url::Url::parse(endpoint).map_err(|e| {
        ConfigError::InvalidConfig(format!("Invalid agent endpoint '{endpoint}': {e}"))
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidConfig(format!(
            "Agent endpoint '{endpoint}' must use http or https"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_config() {
        let toml_content = r#"
[router]
name = "Test Router"
description = "Routes things"
host = "0.0.0.0"
port = 9000

[agents]
endpoints = ["http://localhost:8002", "https://fx.example.com"]

[transport]
discovery_timeout_ms = 2000
request_timeout_ms = 10000
poll_interval_ms = 250
max_poll_attempts = 10

[planner]
max_steps = 3
primary_threshold = 1.5
secondary_threshold = 0.25
"#;

        let config = RouterConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.router.name, "Test Router");
        assert_eq!(config.router.port, 9000);
        assert_eq!(config.agents.endpoints.len(), 2);
        assert_eq!(config.transport.max_poll_attempts, 10);
        assert_eq!(config.planner.max_steps, 3);
        assert_eq!(config.bind_address(), "0.0.0.0:9000");

        let policy = config.transport.poll_policy();
        assert_eq!(policy.interval, Duration::from_millis(250));
        assert_eq!(policy.max_attempts, 10);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = RouterConfig::from_toml_str("").unwrap();

        assert_eq!(config, RouterConfig::default());
        assert_eq!(config.router.port, 8000);
        assert_eq!(config.agents.endpoints.len(), 3);
        assert_eq!(config.transport.poll_interval_ms, 1000);
        assert_eq!(config.transport.max_poll_attempts, 30);
        assert_eq!(config.planner.max_steps, 2);
        assert_eq!(config.public_url(), "http://localhost:8000/");
    }

    #[test]
    fn test_partial_section_fills_defaults() {
        let config = RouterConfig::from_toml_str("[transport]\npoll_interval_ms = 500\n").unwrap();

        assert_eq!(config.transport.poll_interval_ms, 500);
        assert_eq!(config.transport.request_timeout_ms, 30000);
    }

    #[test]
    fn test_poll_interval_bounds() {
        assert!(RouterConfig::from_toml_str("[transport]\npoll_interval_ms = 0\n").is_err());
        assert!(RouterConfig::from_toml_str("[transport]\npoll_interval_ms = 1001\n").is_err());
        assert!(RouterConfig::from_toml_str("[transport]\npoll_interval_ms = 1000\n").is_ok());
    }

    #[test]
    fn test_max_poll_attempts_bounds() {
        assert!(RouterConfig::from_toml_str("[transport]\nmax_poll_attempts = 0\n").is_err());
        assert!(RouterConfig::from_toml_str("[transport]\nmax_poll_attempts = 121\n").is_err());
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        let result = RouterConfig::from_toml_str("[agents]\nendpoints = [\"not a url\"]\n");
        assert!(matches!(result, Err(ConfigError::InvalidConfig(_))));

        let result = RouterConfig::from_toml_str("[agents]\nendpoints = [\"ftp://host\"]\n");
        assert!(matches!(result, Err(ConfigError::InvalidConfig(_))));
    }

    #[test]
    fn test_zero_max_steps_rejected() {
        let result = RouterConfig::from_toml_str("[planner]\nmax_steps = 0\n");
        assert!(matches!(result, Err(ConfigError::InvalidConfig(_))));
    }

    #[test]
    fn test_negative_threshold_rejected() {
        let result = RouterConfig::from_toml_str("[planner]\nprimary_threshold = -1.0\n");
        assert!(matches!(result, Err(ConfigError::InvalidConfig(_))));
    }

    #[test]
    fn test_malformed_toml() {
        let result = RouterConfig::from_toml_str("[router\nname = ");
        assert!(matches!(result, Err(ConfigError::TomlParse(_))));
    }

    #[test]
    fn test_test_config_is_valid() {
        let config = RouterConfig::test_config();
        assert!(config.validate().is_ok());
        assert!(config.agents.endpoints.is_empty());
    }
}
