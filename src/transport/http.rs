//! JSON-RPC over HTTP transport
//!
//! Implements [`Transport`] against agents that serve a JSON-RPC endpoint at
//! their base URL and publish an agent card at `/.well-known/agent.json`.
//!
//! # Example
//!
//! ```no_run
//! use agent_router::transport::{HttpTransport, HttpTransportConfig, Transport};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = HttpTransport::new(HttpTransportConfig::new().with_request_timeout_ms(10_000))?;
//! let card = transport.fetch_agent_card("http://localhost:8002").await?;
//! println!("{} offers {} skills", card.name, card.skills.len());
//! # Ok(())
//! # }
//! ```

use crate::protocol::{
    AgentCard, JsonRpcRequest, JsonRpcResponse, SendMessageResult, Task, TaskState,
    AGENT_CARD_PATH,
};
use crate::transport::{SendOutcome, TaskHandle, TaskPoll, Transport, TransportError};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// HTTP transport configuration
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Timeout for agent card discovery requests in milliseconds
    pub discovery_timeout_ms: u64,
    /// Timeout for `message/send` and `tasks/get` requests in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            discovery_timeout_ms: 5000,
            request_timeout_ms: 30000,
        }
    }
}

impl HttpTransportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_discovery_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.discovery_timeout_ms = timeout_ms;
        self
    }

    pub fn with_request_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.request_timeout_ms = timeout_ms;
        self
    }

    fn discovery_timeout(&self) -> Duration {
        Duration::from_millis(self.discovery_timeout_ms)
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// JSON-RPC client for remote agents
#[derive(Debug, Clone)]
pub struct HttpTransport {
    config: HttpTransportConfig,
    client: Client,
}

impl HttpTransport {
    /// Create a new HTTP transport
    pub fn new(config: HttpTransportConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;

        Ok(Self { config, client })
    }

    /// Build the discovery URL for an endpoint (pure function)
    pub fn agent_card_url(endpoint: &str) -> String {
        format!("{}/{}", endpoint.trim_end_matches('/'), AGENT_CARD_PATH)
    }

    /// POST a JSON-RPC request and return its `result` payload
    async fn call(
        &self,
        endpoint: &str,
        request: &JsonRpcRequest,
    ) -> Result<Option<serde_json::Value>, TransportError> {
        debug!(endpoint = %endpoint, method = %request.method, "Sending JSON-RPC request");

        let response = self
            .client
            .post(endpoint)
            .json(request)
            .timeout(self.config.request_timeout())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(endpoint = %endpoint, status = %status, "Agent returned HTTP error");
            return Err(TransportError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: JsonRpcResponse = response.json().await?;
        if let Some(error) = envelope.error {
            return Err(TransportError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        Ok(envelope.result)
    }

    /// Deserialize a JSON-RPC result into a typed value
    fn parse_result<T: DeserializeOwned>(value: serde_json::Value) -> Result<T, TransportError> {
        serde_json::from_value(value).map_err(|e| {
            TransportError::InvalidResponse(format!("Unexpected response format from agent: {e}"))
        })
    }

    /// Convert a task snapshot into a poll result (pure function)
    fn task_to_poll(task: &Task) -> TaskPoll {
        let text = match task.status.state {
            TaskState::Completed => Some(
                task.artifact_text()
                    .unwrap_or("Task completed but no response text found")
                    .to_string(),
            ),
            TaskState::InputRequired => Some(
                task.status_text()
                    .unwrap_or("Agent requires input but no message provided")
                    .to_string(),
            ),
            _ => task.status_text().map(str::to_string),
        };

        TaskPoll {
            state: task.status.state,
            text,
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch_agent_card(&self, endpoint: &str) -> Result<AgentCard, TransportError> {
        let url = Self::agent_card_url(endpoint);
        debug!(url = %url, "Fetching agent card");

        let response = self
            .client
            .get(&url)
            .timeout(self.config.discovery_timeout())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Http {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<AgentCard>()
            .await
            .map_err(|e| TransportError::InvalidResponse(format!("Invalid agent card: {e}")))
    }

    async fn send_task(
        &self,
        endpoint: &str,
        request_text: &str,
    ) -> Result<SendOutcome, TransportError> {
        let request = JsonRpcRequest::message_send(request_text);
        let result = self
            .call(endpoint, &request)
            .await?
            .ok_or_else(|| TransportError::InvalidResponse("No result in agent response".into()))?;

        match Self::parse_result::<SendMessageResult>(result)? {
            SendMessageResult::Message(message) => Ok(SendOutcome::Immediate(
                message
                    .first_text()
                    .unwrap_or("Message received but no text content")
                    .to_string(),
            )),
            SendMessageResult::Task(task) => {
                let poll = Self::task_to_poll(&task);
                match poll.state {
                    TaskState::Completed | TaskState::InputRequired => {
                        Ok(SendOutcome::Immediate(poll.text.unwrap_or_default()))
                    }
                    TaskState::Failed | TaskState::Canceled | TaskState::Rejected => {
                        Err(TransportError::TaskFailed {
                            task_id: task.id,
                            state: poll.state.as_str().to_string(),
                            message: poll.text.unwrap_or_else(|| "Agent task failed".into()),
                        })
                    }
                    _ => Ok(SendOutcome::Pending(TaskHandle::new(task.id))),
                }
            }
        }
    }

    async fn poll_task(
        &self,
        endpoint: &str,
        handle: &TaskHandle,
    ) -> Result<TaskPoll, TransportError> {
        let request = JsonRpcRequest::tasks_get(&handle.task_id);

        match self.call(endpoint, &request).await? {
            Some(value) if !value.is_null() => {
                let task: Task = Self::parse_result(value)?;
                Ok(Self::task_to_poll(&task))
            }
            // Agents may answer with an empty result while the task is being created
            _ => Ok(TaskPoll::pending()),
        }
    }
}
