//! JSON-RPC message types for agent-to-agent communication
//!
//! Agents speak JSON-RPC 2.0 over HTTP POST. Two methods are used by the router:
//! `message/send` submits a unit of work and `tasks/get` polls a task started by
//! a previous `message/send`. Agent metadata is published as an [`AgentCard`]
//! at a well-known discovery path.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// JSON-RPC protocol version carried by every envelope
pub const JSONRPC_VERSION: &str = "2.0";

/// Method used to submit a message to an agent
pub const METHOD_MESSAGE_SEND: &str = "message/send";

/// Method used to fetch the state of a task
pub const METHOD_TASKS_GET: &str = "tasks/get";

/// Discovery path appended to an agent endpoint to fetch its card
pub const AGENT_CARD_PATH: &str = ".well-known/agent.json";

/// JSON-RPC request envelope
///
/// # Examples
/// ```
/// use agent_router::protocol::{JsonRpcRequest, METHOD_MESSAGE_SEND};
///
/// let request = JsonRpcRequest::message_send("what is 2+3");
/// assert_eq!(request.method, METHOD_MESSAGE_SEND);
/// assert_eq!(request.jsonrpc, "2.0");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl JsonRpcRequest {
    /// Build a `message/send` request carrying a single user text part
    pub fn message_send(text: &str) -> Self {
        let params = MessageSendParams {
            id: Uuid::new_v4().to_string(),
            message: Message::user_text(text),
            configuration: Some(SendConfiguration {
                accepted_output_modes: vec!["text".to_string()],
            }),
        };

        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Value::String(Uuid::new_v4().to_string()),
            method: METHOD_MESSAGE_SEND.to_string(),
            params: serde_json::to_value(params).unwrap_or(Value::Null),
        }
    }

    /// Build a `tasks/get` request for an existing task
    pub fn tasks_get(task_id: &str) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Value::String(Uuid::new_v4().to_string()),
            method: METHOD_TASKS_GET.to_string(),
            params: serde_json::json!({ "id": task_id }),
        }
    }
}

/// JSON-RPC response envelope; exactly one of `result` or `error` is expected
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// JSON-RPC error object
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
    pub const TASK_NOT_FOUND: i64 = -32001;

    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

/// Parameters of `message/send`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageSendParams {
    #[serde(default = "new_id")]
    pub id: String,
    pub message: Message,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<SendConfiguration>,
}

/// Parameters of `tasks/get`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskQueryParams {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SendConfiguration {
    pub accepted_output_modes: Vec<String>,
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Message author role
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    #[default]
    Agent,
}

/// A message exchanged with an agent
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(default)]
    pub role: Role,
    #[serde(default = "new_id")]
    pub message_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    pub parts: Vec<Part>,
    #[serde(default = "message_kind")]
    pub kind: String,
}

fn message_kind() -> String {
    "message".to_string()
}

impl Message {
    /// New user message with a fresh message and context id
    pub fn user_text(text: &str) -> Self {
        Self {
            role: Role::User,
            message_id: new_id(),
            context_id: Some(new_id()),
            task_id: None,
            parts: vec![Part::text(text)],
            kind: message_kind(),
        }
    }

    /// First text part, if any
    pub fn first_text(&self) -> Option<&str> {
        first_text(&self.parts)
    }
}

/// Typed content part; only text parts carry content the router understands
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Part {
    /// Part kind (`text`, `data`, `file`); older agents send `type`
    #[serde(alias = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Part {
    pub fn text(text: &str) -> Self {
        Self {
            kind: "text".to_string(),
            text: Some(text.to_string()),
        }
    }

    pub fn is_text(&self) -> bool {
        self.kind == "text"
    }
}

fn first_text(parts: &[Part]) -> Option<&str> {
    parts
        .iter()
        .filter(|part| part.is_text())
        .find_map(|part| part.text.as_deref())
}

/// Lifecycle state of a remote task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskState {
    Submitted,
    Working,
    InputRequired,
    Completed,
    Canceled,
    Failed,
    Rejected,
    AuthRequired,
    #[serde(other)]
    Unknown,
}

impl TaskState {
    /// States after which polling should stop
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Completed
                | TaskState::Canceled
                | TaskState::Failed
                | TaskState::Rejected
                | TaskState::InputRequired
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Submitted => "submitted",
            TaskState::Working => "working",
            TaskState::InputRequired => "input-required",
            TaskState::Completed => "completed",
            TaskState::Canceled => "canceled",
            TaskState::Failed => "failed",
            TaskState::Rejected => "rejected",
            TaskState::AuthRequired => "auth-required",
            TaskState::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskStatus {
    pub state: TaskState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// Output produced by a task
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    #[serde(default = "new_id")]
    pub artifact_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub parts: Vec<Part>,
}

/// A task tracked by a remote agent
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    pub status: TaskStatus,
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
    #[serde(default = "task_kind")]
    pub kind: String,
}

fn task_kind() -> String {
    "task".to_string()
}

impl Task {
    /// A completed task carrying a single text artifact
    pub fn completed_with_text(
        id: String,
        context_id: Option<String>,
        name: &str,
        text: &str,
    ) -> Self {
        Self {
            id,
            context_id,
            status: TaskStatus {
                state: TaskState::Completed,
                message: None,
                timestamp: Some(chrono::Utc::now().to_rfc3339()),
            },
            artifacts: vec![Artifact {
                artifact_id: new_id(),
                name: Some(name.to_string()),
                parts: vec![Part::text(text)],
            }],
            kind: task_kind(),
        }
    }

    /// First text part of the artifacts, falling back to the status message
    pub fn artifact_text(&self) -> Option<&str> {
        self.artifacts
            .iter()
            .find_map(|artifact| first_text(&artifact.parts))
            .or_else(|| self.status_text())
    }

    /// Text of the status message, if any
    pub fn status_text(&self) -> Option<&str> {
        self.status.message.as_ref().and_then(Message::first_text)
    }
}

/// Result of `message/send`: agents reply with either a task or a direct message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum SendMessageResult {
    Task(Task),
    Message(Message),
}

/// Agent metadata served at the discovery path
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentCard {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub capabilities: AgentCapabilities,
    #[serde(default)]
    pub skills: Vec<AgentSkill>,
    #[serde(default)]
    pub default_input_modes: Vec<String>,
    #[serde(default)]
    pub default_output_modes: Vec<String>,
}

/// Protocol features an agent supports
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentCapabilities {
    #[serde(default)]
    pub streaming: bool,
    #[serde(default)]
    pub push_notifications: bool,
    #[serde(default)]
    pub state_transition_history: bool,
}

/// A named skill advertised in an agent card
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentSkill {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
}
