//! Error types for the agent router
//!
//! Component errors ([`RegistryError`], [`TransportError`], [`ConfigError`])
//! convert into [`RouterError`]. Messages are passed through
//! [`sanitize_error_message`] before they leave a public boundary.

use crate::agent::discovery::RegistryError;
use crate::config::ConfigError;
use crate::protocol::messages::JsonRpcError;
use crate::transport::TransportError;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Main error type for routing operations
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("No agents available for routing")]
    NoAgentsAvailable,

    #[error("Planning failed: {message}")]
    Planning { message: String },

    #[error("Step {step_index} failed: {source}")]
    StepExecution {
        step_index: usize,
        agent_id: String,
        #[source]
        source: TransportError,
    },

    #[error("Execution cancelled after {completed_steps} completed steps")]
    Cancelled { completed_steps: usize },

    #[error("Request decomposition failed: {message}")]
    Decomposition { message: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl RouterError {
    /// Create planning error
    pub fn planning<S: Into<String>>(message: S) -> Self {
        Self::Planning {
            message: message.into(),
        }
    }

    /// Create decomposition error
    pub fn decomposition<S: Into<String>>(message: S) -> Self {
        Self::Decomposition {
            message: message.into(),
        }
    }

    /// Create invalid request error
    pub fn invalid_request<S: Into<String>>(message: S) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn step_execution(
        step_index: usize,
        agent_id: impl Into<String>,
        source: TransportError,
    ) -> Self {
        Self::StepExecution {
            step_index,
            agent_id: agent_id.into(),
            source,
        }
    }

    /// Sanitized message safe to return to callers
    pub fn public_message(&self) -> String {
        sanitize_error_message(&self.to_string())
    }

    /// Map to a JSON-RPC error object for the router's own endpoint
    pub fn to_rpc_error(&self) -> JsonRpcError {
        let code = match self {
            RouterError::InvalidRequest { .. } => JsonRpcError::INVALID_PARAMS,
            RouterError::Registry(RegistryError::NotFound { .. }) => JsonRpcError::INVALID_PARAMS,
            RouterError::Registry(RegistryError::InvalidEndpoint { .. }) => {
                JsonRpcError::INVALID_PARAMS
            }
            _ => JsonRpcError::INTERNAL_ERROR,
        };
        JsonRpcError::new(code, self.public_message())
    }
}

static SECRET_ASSIGNMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(password|token|key|secret)[=:]\s*\S+").expect("static regex is valid")
});

static SENSITIVE_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/[a-zA-Z0-9._/-]+/(secrets?|\.ssh|\.aws|\.config)/[a-zA-Z0-9._/-]+")
        .expect("static regex is valid")
});

const MAX_ERROR_LENGTH: usize = 500;
const TRUNCATE_SUFFIX: &str = "...[truncated]";

/// Sanitize error messages to prevent sensitive data leakage
///
/// Redacts `password=`/`token=`/`key=`/`secret=` values and paths under
/// secret-bearing directories, then caps the result at 500 bytes.
pub fn sanitize_error_message(message: &str) -> String {
    let sanitized = SECRET_ASSIGNMENT.replace_all(message, "${1}=***");
    let mut sanitized = SENSITIVE_PATH
        .replace_all(&sanitized, "/***REDACTED***/")
        .to_string();

    if sanitized.len() > MAX_ERROR_LENGTH {
        let mut cut = MAX_ERROR_LENGTH - TRUNCATE_SUFFIX.len();
        while !sanitized.is_char_boundary(cut) {
            cut -= 1;
        }
        sanitized.truncate(cut);
        sanitized.push_str(TRUNCATE_SUFFIX);
    }

    sanitized
}

/// Result type for router operations
pub type RouterResult<T> = Result<T, RouterError>;
