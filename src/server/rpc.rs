//! JSON-RPC endpoint of the router
//!
//! The router answers `message/send` synchronously: the text is routed and the
//! reply is a completed task carrying one text artifact. Completed tasks are
//! kept so `tasks/get` can return them later.

use crate::orchestrator::{Orchestrator, OrchestratorResponse};
use crate::protocol::{
    JsonRpcError, JsonRpcRequest, JsonRpcResponse, MessageSendParams, Task, TaskQueryParams,
    JSONRPC_VERSION, METHOD_MESSAGE_SEND, METHOD_TASKS_GET,
};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Message text that returns the registered agents instead of routing
pub const LIST_AGENTS_COMMAND: &str = "LIST_AGENTS";

/// Name of the artifact carrying the routed answer
pub const RESULT_ARTIFACT_NAME: &str = "orchestrator_result";

/// Completed tasks kept for `tasks/get`
const MAX_STORED_TASKS: usize = 1000;

#[derive(Debug, Default)]
struct StoredTasks {
    tasks: HashMap<String, Task>,
    order: VecDeque<String>,
}

/// Bounded store of tasks answered by the router, oldest evicted first
#[derive(Debug, Clone, Default)]
pub struct TaskStore {
    inner: Arc<Mutex<StoredTasks>>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, task: Task) {
        let mut stored = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let id = task.id.clone();
        if stored.tasks.insert(id.clone(), task).is_none() {
            stored.order.push_back(id);
        }
        while stored.order.len() > MAX_STORED_TASKS {
            if let Some(oldest) = stored.order.pop_front() {
                stored.tasks.remove(&oldest);
            }
        }
    }

    pub fn get(&self, task_id: &str) -> Option<Task> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .tasks
            .get(task_id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .tasks
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Text returned to the caller for a routed request
pub fn render_reply(response: &OrchestratorResponse) -> String {
    if response.success() {
        format!(
            "Routed to {}\nConfidence: {:.2}\nReasoning: {}\nResponse: {}",
            response.agent_label(),
            response.confidence(),
            response.reasoning(),
            response.response_text()
        )
    } else {
        format!("Error: {}", response.error().unwrap_or("Unknown error"))
    }
}

/// Parse a request body into a JSON-RPC request
pub fn parse_request(body: &[u8]) -> Result<JsonRpcRequest, JsonRpcResponse> {
    let request: JsonRpcRequest = serde_json::from_slice(body).map_err(|e| {
        JsonRpcResponse::failure(
            Value::Null,
            JsonRpcError::new(JsonRpcError::PARSE_ERROR, format!("Parse error: {e}")),
        )
    })?;

    if request.jsonrpc != JSONRPC_VERSION {
        return Err(JsonRpcResponse::failure(
            request.id,
            JsonRpcError::new(
                JsonRpcError::INVALID_REQUEST,
                format!("Unsupported JSON-RPC version: {}", request.jsonrpc),
            ),
        ));
    }

    Ok(request)
}

/// Dispatch one JSON-RPC request
pub async fn handle_rpc(
    orchestrator: &Orchestrator,
    tasks: &TaskStore,
    request: JsonRpcRequest,
) -> JsonRpcResponse {
    debug!(method = %request.method, "Handling JSON-RPC request");

    let id = request.id.clone();
    let result = match request.method.as_str() {
        METHOD_MESSAGE_SEND => message_send(orchestrator, tasks, request.params).await,
        METHOD_TASKS_GET => tasks_get(tasks, request.params),
        other => Err(JsonRpcError::new(
            JsonRpcError::METHOD_NOT_FOUND,
            format!("Method not found: {other}"),
        )),
    };

    match result {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(error) => {
            warn!(code = error.code, error = %error.message, "JSON-RPC request failed");
            JsonRpcResponse::failure(id, error)
        }
    }
}

async fn message_send(
    orchestrator: &Orchestrator,
    tasks: &TaskStore,
    params: Value,
) -> Result<Value, JsonRpcError> {
    let params: MessageSendParams = serde_json::from_value(params).map_err(|e| {
        JsonRpcError::new(JsonRpcError::INVALID_PARAMS, format!("Invalid params: {e}"))
    })?;

    let text = params
        .message
        .first_text()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .ok_or_else(|| {
            JsonRpcError::new(JsonRpcError::INVALID_PARAMS, "Message contains no text")
        })?;

    let reply = if text == LIST_AGENTS_COMMAND {
        info!("Listing available agents");
        serde_json::to_string_pretty(&orchestrator.agent_listing()).map_err(|e| {
            JsonRpcError::new(JsonRpcError::INTERNAL_ERROR, format!("Internal error: {e}"))
        })?
    } else {
        render_reply(&orchestrator.process(text).await)
    };

    let task = Task::completed_with_text(
        Uuid::new_v4().to_string(),
        params.message.context_id.clone(),
        RESULT_ARTIFACT_NAME,
        &reply,
    );
    tasks.insert(task.clone());

    serde_json::to_value(task).map_err(|e| {
        JsonRpcError::new(JsonRpcError::INTERNAL_ERROR, format!("Internal error: {e}"))
    })
}

fn tasks_get(tasks: &TaskStore, params: Value) -> Result<Value, JsonRpcError> {
    let params: TaskQueryParams = serde_json::from_value(params).map_err(|e| {
        JsonRpcError::new(JsonRpcError::INVALID_PARAMS, format!("Invalid params: {e}"))
    })?;

    let task = tasks.get(&params.id).ok_or_else(|| {
        JsonRpcError::new(
            JsonRpcError::TASK_NOT_FOUND,
            format!("Task not found: {}", params.id),
        )
    })?;

    serde_json::to_value(task).map_err(|e| {
        JsonRpcError::new(JsonRpcError::INTERNAL_ERROR, format!("Internal error: {e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouterConfig;
    use crate::protocol::TaskState;
    use crate::testing::mocks::{math_agent_card, MockTransport, ScriptedReply};
    use serde_json::json;

    const MATH: &str = "http://localhost:8001";

    fn orchestrator() -> Orchestrator {
        let transport =
            MockTransport::new().with_reply(MATH, ScriptedReply::Immediate("5".to_string()));
        let orchestrator = Orchestrator::new(RouterConfig::test_config(), Arc::new(transport));
        orchestrator
            .registry()
            .register_descriptor(MATH, math_agent_card(MATH));
        orchestrator
    }

    #[tokio::test]
    async fn test_message_send_routes_and_stores_task() {
        let orchestrator = orchestrator();
        let tasks = TaskStore::new();

        let response = handle_rpc(
            &orchestrator,
            &tasks,
            JsonRpcRequest::message_send("what is 2+3"),
        )
        .await;

        let task: Task = serde_json::from_value(response.result.unwrap()).unwrap();
        assert_eq!(task.status.state, TaskState::Completed);
        assert_eq!(task.artifacts[0].name.as_deref(), Some(RESULT_ARTIFACT_NAME));

        let text = task.artifact_text().unwrap();
        assert!(text.starts_with("Routed to MathAgent\nConfidence: 0.50"));
        assert!(text.ends_with("Response: Routed to MathAgent → 5"));

        assert_eq!(tasks.get(&task.id), Some(task));
    }

    #[tokio::test]
    async fn test_list_agents_command() {
        let orchestrator = orchestrator();
        let tasks = TaskStore::new();

        let response = handle_rpc(
            &orchestrator,
            &tasks,
            JsonRpcRequest::message_send("LIST_AGENTS"),
        )
        .await;

        let task: Task = serde_json::from_value(response.result.unwrap()).unwrap();
        let listing: Value = serde_json::from_str(task.artifact_text().unwrap()).unwrap();
        assert_eq!(listing["type"], "agent_list");
        assert_eq!(listing["total_count"], 1);
        assert_eq!(listing["agents"][0]["agent_id"], "MathAgent");
    }

    #[tokio::test]
    async fn test_tasks_get_unknown_task() {
        let response = handle_rpc(
            &orchestrator(),
            &TaskStore::new(),
            JsonRpcRequest::tasks_get("missing"),
        )
        .await;

        let error = response.error.unwrap();
        assert_eq!(error.code, JsonRpcError::TASK_NOT_FOUND);
        assert!(error.message.contains("missing"));
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let request = JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            id: json!(7),
            method: "tasks/cancel".to_string(),
            params: json!({}),
        };

        let response = handle_rpc(&orchestrator(), &TaskStore::new(), request).await;

        assert_eq!(response.id, json!(7));
        assert_eq!(response.error.unwrap().code, JsonRpcError::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_message_without_text_is_invalid() {
        let request = JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            id: json!(1),
            method: METHOD_MESSAGE_SEND.to_string(),
            params: json!({"message": {"role": "user", "parts": [{"kind": "text", "text": "  "}]}}),
        };

        let response = handle_rpc(&orchestrator(), &TaskStore::new(), request).await;

        assert_eq!(response.error.unwrap().code, JsonRpcError::INVALID_PARAMS);
    }

    #[test]
    fn test_parse_request_errors() {
        let garbage = parse_request(b"not json").unwrap_err();
        assert_eq!(garbage.error.unwrap().code, JsonRpcError::PARSE_ERROR);

        let old_version =
            parse_request(br#"{"jsonrpc":"1.0","id":1,"method":"message/send"}"#).unwrap_err();
        assert_eq!(old_version.error.unwrap().code, JsonRpcError::INVALID_REQUEST);
    }

    #[test]
    fn test_task_store_evicts_oldest() {
        let store = TaskStore::new();
        for i in 0..(MAX_STORED_TASKS + 5) {
            store.insert(Task::completed_with_text(
                format!("task-{i}"),
                None,
                RESULT_ARTIFACT_NAME,
                "done",
            ));
        }

        assert_eq!(store.len(), MAX_STORED_TASKS);
        assert!(store.get("task-0").is_none());
        assert!(store.get(&format!("task-{}", MAX_STORED_TASKS + 4)).is_some());
    }
}
