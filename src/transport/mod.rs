//! Transport layer for reaching remote agents
//!
//! This module provides the transport abstraction the routing core talks to,
//! the JSON-RPC over HTTP implementation, and the bounded polling dispatcher
//! that turns a submitted task into a final text result.

use crate::protocol::{AgentCard, TaskState};
use thiserror::Error;

pub mod dispatch;
pub mod http;

pub use dispatch::{forward_request, PollPolicy};
pub use http::{HttpTransport, HttpTransportConfig};

/// Handle of a task accepted by a remote agent for asynchronous processing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskHandle {
    pub task_id: String,
}

impl TaskHandle {
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
        }
    }
}

/// Outcome of submitting work to an agent
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// The agent answered synchronously
    Immediate(String),
    /// The agent accepted a task that must be polled
    Pending(TaskHandle),
}

/// Snapshot of a remote task returned by a poll
#[derive(Debug, Clone, PartialEq)]
pub struct TaskPoll {
    pub state: TaskState,
    pub text: Option<String>,
}

impl TaskPoll {
    pub fn pending() -> Self {
        Self {
            state: TaskState::Working,
            text: None,
        }
    }

    pub fn completed(text: impl Into<String>) -> Self {
        Self {
            state: TaskState::Completed,
            text: Some(text.into()),
        }
    }

    pub fn failed(text: Option<String>) -> Self {
        Self {
            state: TaskState::Failed,
            text,
        }
    }
}

/// Transport-level failures
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransportError {
    #[error("HTTP error {status}: {body}")]
    Http { status: u16, body: String },
    #[error("Network error: {0}")]
    Network(String),
    #[error("Agent returned error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Task {task_id} did not complete within {attempts} poll attempts")]
    Timeout { task_id: String, attempts: u32 },
    #[error("Task {task_id} ended in state {state}: {message}")]
    TaskFailed {
        task_id: String,
        state: String,
        message: String,
    },
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            TransportError::Http {
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else if err.is_decode() {
            TransportError::InvalidResponse(err.to_string())
        } else {
            TransportError::Network(err.to_string())
        }
    }
}

/// Transport trait for agent communication
///
/// This trait abstracts the JSON-RPC client so the routing core can be driven
/// by the HTTP implementation in production and by mocks in tests.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Resolve the agent card published at the endpoint's discovery path
    async fn fetch_agent_card(&self, endpoint: &str) -> Result<AgentCard, TransportError>;

    /// Submit a unit of work to the agent at `endpoint`
    async fn send_task(&self, endpoint: &str, request_text: &str)
        -> Result<SendOutcome, TransportError>;

    /// Fetch the current state of a previously submitted task
    async fn poll_task(&self, endpoint: &str, handle: &TaskHandle)
        -> Result<TaskPoll, TransportError>;
}
