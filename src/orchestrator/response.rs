//! Structured results of the orchestrator's public operations
//!
//! Every operation reports `success` plus an optional sanitized `error`
//! instead of returning `Err`, so callers (the server, the CLI) can render any
//! outcome uniformly.

use crate::agent::descriptor::AgentSummary;
use crate::error::RouterError;
use crate::execution::engine::{IntermediateResults, StepRecord};
use crate::routing::decomposer::TaskRequirement;
use crate::routing::planner::ExecutionStep;
use serde::Serialize;
use std::collections::BTreeMap;

/// Current time as an RFC 3339 timestamp
pub fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// How a routed request was answered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingStatus {
    /// The selected agent answered
    Completed,
    /// The agent could not be reached; only the routing decision is returned
    RoutingOnly,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutingMetadata {
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<RoutingStatus>,
    pub agent_scores: BTreeMap<String, f64>,
    pub skill_matches: BTreeMap<String, Vec<String>>,
}

impl RoutingMetadata {
    pub fn new(request_id: String) -> Self {
        Self {
            request_id,
            start_timestamp: None,
            analysis_timestamp: None,
            response_timestamp: None,
            error_timestamp: None,
            agent_endpoint: None,
            status: None,
            agent_scores: BTreeMap::new(),
            skill_matches: BTreeMap::new(),
        }
    }
}

/// Result of single-agent routing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutingResponse {
    pub success: bool,
    pub request: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_agent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_agent_name: Option<String>,
    pub agent_skills: Vec<String>,
    pub confidence: f64,
    pub reasoning: String,
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub metadata: RoutingMetadata,
}

impl RoutingResponse {
    /// Response for a request that could not be routed at all
    pub fn failure(request: &str, error: &RouterError, mut metadata: RoutingMetadata) -> Self {
        metadata.error_timestamp = Some(timestamp());
        Self {
            success: false,
            request: request.to_string(),
            selected_agent_id: None,
            selected_agent_name: None,
            agent_skills: Vec::new(),
            confidence: 0.0,
            reasoning: String::new(),
            response: String::new(),
            error: Some(error.public_message()),
            metadata,
        }
    }

    pub fn status(&self) -> Option<RoutingStatus> {
        self.metadata.status
    }
}

/// Whether a plan used one agent or several
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionType {
    Single,
    Multi,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiAgentMetadata {
    pub request_id: String,
    pub start_timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_timestamp: Option<String>,
    pub completed_steps: usize,
    pub steps: Vec<StepRecord>,
}

/// Result of multi-agent planning and execution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiAgentResponse {
    pub success: bool,
    pub request: String,
    pub execution_type: ExecutionType,
    pub task_requirements: Vec<TaskRequirement>,
    pub execution_plan: Vec<ExecutionStep>,
    pub intermediate_results: IntermediateResults,
    pub confidence: f64,
    pub reasoning: String,
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub metadata: MultiAgentMetadata,
}

/// Either kind of response produced by automatic dispatch
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OrchestratorResponse {
    Single(RoutingResponse),
    Multi(MultiAgentResponse),
}

impl OrchestratorResponse {
    pub fn success(&self) -> bool {
        match self {
            OrchestratorResponse::Single(response) => response.success,
            OrchestratorResponse::Multi(response) => response.success,
        }
    }

    pub fn response_text(&self) -> &str {
        match self {
            OrchestratorResponse::Single(response) => &response.response,
            OrchestratorResponse::Multi(response) => &response.response,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            OrchestratorResponse::Single(response) => response.error.as_deref(),
            OrchestratorResponse::Multi(response) => response.error.as_deref(),
        }
    }

    pub fn confidence(&self) -> f64 {
        match self {
            OrchestratorResponse::Single(response) => response.confidence,
            OrchestratorResponse::Multi(response) => response.confidence,
        }
    }

    pub fn reasoning(&self) -> &str {
        match self {
            OrchestratorResponse::Single(response) => &response.reasoning,
            OrchestratorResponse::Multi(response) => &response.reasoning,
        }
    }

    /// Name of the agent that answered, or the agents in plan order
    pub fn agent_label(&self) -> String {
        match self {
            OrchestratorResponse::Single(response) => {
                response.selected_agent_name.clone().unwrap_or_default()
            }
            OrchestratorResponse::Multi(response) => response
                .execution_plan
                .iter()
                .map(|step| step.agent_id.as_str())
                .collect::<Vec<_>>()
                .join(" → "),
        }
    }
}

/// Result of a register or unregister operation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegistrationResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RegistrationResponse {
    pub fn registered(agent_id: &str, agent_name: &str, endpoint: &str) -> Self {
        Self {
            success: true,
            agent_id: Some(agent_id.to_string()),
            agent_name: Some(agent_name.to_string()),
            endpoint: Some(endpoint.to_string()),
            message: Some(format!(
                "Successfully registered {agent_name} from {endpoint}"
            )),
            error: None,
        }
    }

    pub fn unregistered(agent_id: &str, agent_name: &str, endpoint: &str) -> Self {
        Self {
            success: true,
            agent_id: Some(agent_id.to_string()),
            agent_name: Some(agent_name.to_string()),
            endpoint: Some(endpoint.to_string()),
            message: Some(format!(
                "Successfully unregistered {agent_name} (ID: {agent_id})"
            )),
            error: None,
        }
    }

    pub fn failed(message: &str, error: &RouterError) -> Self {
        Self {
            success: false,
            agent_id: None,
            agent_name: None,
            endpoint: None,
            message: Some(message.to_string()),
            error: Some(error.public_message()),
        }
    }
}

/// Agent listing returned for the `LIST_AGENTS` command
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentListing {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub agents: Vec<AgentSummary>,
    pub total_count: usize,
}

impl AgentListing {
    pub fn new(agents: Vec<AgentSummary>) -> Self {
        Self {
            kind: "agent_list",
            total_count: agents.len(),
            agents,
        }
    }
}
