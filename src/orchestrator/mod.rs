//! Router facade
//!
//! [`Orchestrator`] wires the registry, transport, selector, decomposer,
//! planner and execution engine together. Its operations never return `Err`:
//! every outcome is reported through the structured responses in
//! [`response`].

pub mod response;

use crate::agent::descriptor::{AgentDescriptor, AgentSummary};
use crate::agent::discovery::AgentRegistry;
use crate::config::RouterConfig;
use crate::error::{sanitize_error_message, RouterError};
use crate::execution::{CancellationFlag, ExecutionEngine};
use crate::observability::metrics::metrics;
use crate::routing::agent_selector::{select_agent, AgentSelection};
use crate::routing::decomposer::{
    is_multi_step, Decomposer, PatternDecomposer, TaskRequirement, GENERAL_CAPABILITY,
};
use crate::routing::planner::build_plan;
use crate::transport::{forward_request, HttpTransport, PollPolicy, Transport, TransportError};
use crate::{registry_span, request_span};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn, Instrument};
use uuid::Uuid;

pub use response::{
    timestamp, AgentListing, ExecutionType, MultiAgentMetadata, MultiAgentResponse,
    OrchestratorResponse, RegistrationResponse, RoutingMetadata, RoutingResponse, RoutingStatus,
};

/// Confidence attached to a successful decomposition
pub const DECOMPOSITION_CONFIDENCE: f64 = 0.8;

/// Confidence attached to the single `general` fallback requirement
pub const FALLBACK_CONFIDENCE: f64 = 0.3;

/// Main entry point of the router
pub struct Orchestrator {
    config: RouterConfig,
    registry: AgentRegistry,
    transport: Arc<dyn Transport>,
    decomposer: Arc<dyn Decomposer>,
    engine: ExecutionEngine,
    policy: PollPolicy,
}

impl Orchestrator {
    /// Create an orchestrator talking to agents through `transport`
    pub fn new(config: RouterConfig, transport: Arc<dyn Transport>) -> Self {
        let policy = config.transport.poll_policy();
        Self {
            decomposer: Arc::new(PatternDecomposer::new(config.planner.clone())),
            engine: ExecutionEngine::new(policy),
            registry: AgentRegistry::new(),
            transport,
            policy,
            config,
        }
    }

    /// Create an orchestrator with the HTTP transport described by `config`
    pub fn from_config(config: RouterConfig) -> Result<Self, RouterError> {
        let transport = HttpTransport::new(config.transport.http_config())?;
        Ok(Self::new(config, Arc::new(transport)))
    }

    /// Replace the request decomposer
    pub fn with_decomposer(mut self, decomposer: Arc<dyn Decomposer>) -> Self {
        self.decomposer = decomposer;
        self
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    /// Register the configured default endpoints, skipping unreachable ones
    pub async fn initialize_default_agents(&self) -> Vec<AgentDescriptor> {
        let span = registry_span!(operation = "initialize");
        self.registry
            .initialize_default_agents(self.transport.as_ref(), &self.config.agents.endpoints)
            .instrument(span)
            .await
    }

    pub async fn register_agent(&self, endpoint: &str) -> RegistrationResponse {
        let span = registry_span!(operation = "register", endpoint = %endpoint);
        match self
            .registry
            .register(self.transport.as_ref(), endpoint)
            .instrument(span)
            .await
        {
            Ok(agent) => RegistrationResponse::registered(&agent.id, &agent.name, endpoint),
            Err(e) => {
                RegistrationResponse::failed("Failed to register agent", &RouterError::from(e))
            }
        }
    }

    pub fn unregister_agent(&self, agent_identifier: &str) -> RegistrationResponse {
        let _span =
            registry_span!(operation = "unregister", identifier = %agent_identifier).entered();
        match self.registry.unregister(agent_identifier) {
            Ok(agent) => {
                RegistrationResponse::unregistered(&agent.id, &agent.name, &agent.endpoint)
            }
            Err(e) => {
                RegistrationResponse::failed("Failed to unregister agent", &RouterError::from(e))
            }
        }
    }

    pub fn list_agents(&self) -> Vec<AgentSummary> {
        self.registry.list()
    }

    /// Listing in the shape returned for the `LIST_AGENTS` command
    pub fn agent_listing(&self) -> AgentListing {
        AgentListing::new(self.list_agents())
    }

    /// Route `request`, choosing single- or multi-agent handling automatically
    pub async fn process(&self, request: &str) -> OrchestratorResponse {
        let snapshot = self.registry.snapshot();
        if is_multi_step(request, snapshot.index()) {
            OrchestratorResponse::Multi(self.process_multi_agent_request(request).await)
        } else {
            OrchestratorResponse::Single(self.process_request(request).await)
        }
    }

    /// Route `request` to the single best agent
    ///
    /// An unreachable agent degrades the answer to the routing decision; the
    /// response is still successful with status `routing_only`.
    pub async fn process_request(&self, request: &str) -> RoutingResponse {
        let request_id = Uuid::new_v4().to_string();
        let span = request_span!(request_id = %request_id, mode = "single");
        self.route_single(request, request_id).instrument(span).await
    }

    async fn route_single(&self, request: &str, request_id: String) -> RoutingResponse {
        metrics().request_received();
        let started = Instant::now();
        let mut metadata = RoutingMetadata::new(request_id);
        metadata.start_timestamp = Some(timestamp());

        let snapshot = self.registry.snapshot();
        let selection = match select_agent(request, &snapshot) {
            Ok(selection) => selection,
            Err(e) => {
                warn!(error = %e, "Request could not be routed");
                metrics().request_failed(started.elapsed());
                return RoutingResponse::failure(request, &e, metadata);
            }
        };

        metadata.analysis_timestamp = Some(timestamp());
        metadata.agent_endpoint = Some(selection.agent.endpoint.clone());
        for score in &selection.scores {
            metadata
                .agent_scores
                .insert(score.agent_id.clone(), score.score);
            metadata
                .skill_matches
                .insert(score.agent_id.clone(), score.matched_skills.clone());
        }

        info!(
            agent_id = %selection.agent.id,
            confidence = selection.confidence,
            "Agent selected"
        );

        let outcome = forward_request(
            self.transport.as_ref(),
            &selection.agent.endpoint,
            request,
            &self.policy,
        )
        .await;

        let (response, status) = match outcome {
            Ok(text) => {
                metrics().request_routed(started.elapsed());
                (
                    format!("Routed to {} → {}", selection.agent.name, text),
                    RoutingStatus::Completed,
                )
            }
            Err(e) => {
                warn!(
                    agent_id = %selection.agent.id,
                    error = %e,
                    "Forwarding failed, returning routing decision only"
                );
                metrics().request_routing_only(started.elapsed());
                (routing_only_response(&selection, &e), RoutingStatus::RoutingOnly)
            }
        };

        metadata.status = Some(status);
        metadata.response_timestamp = Some(timestamp());

        RoutingResponse {
            success: true,
            request: request.to_string(),
            selected_agent_id: Some(selection.agent.id.clone()),
            selected_agent_name: Some(selection.agent.name.clone()),
            agent_skills: selection.agent.skill_names(),
            confidence: selection.confidence,
            reasoning: selection.reasoning,
            response,
            error: None,
            metadata,
        }
    }

    /// Decompose `request`, plan it across agents and execute the plan
    pub async fn process_multi_agent_request(&self, request: &str) -> MultiAgentResponse {
        self.process_multi_agent_request_with_cancel(request, &CancellationFlag::new())
            .await
    }

    /// Like [`Self::process_multi_agent_request`], stopping before the next
    /// step once `cancel` is set
    pub async fn process_multi_agent_request_with_cancel(
        &self,
        request: &str,
        cancel: &CancellationFlag,
    ) -> MultiAgentResponse {
        let request_id = Uuid::new_v4().to_string();
        let span = request_span!(request_id = %request_id, mode = "multi");
        self.route_multi(request, request_id, cancel)
            .instrument(span)
            .await
    }

    async fn route_multi(
        &self,
        request: &str,
        request_id: String,
        cancel: &CancellationFlag,
    ) -> MultiAgentResponse {
        metrics().request_received();
        metrics().multi_agent_request();
        let started = Instant::now();
        let mut metadata = MultiAgentMetadata {
            request_id,
            start_timestamp: timestamp(),
            completion_timestamp: None,
            error_timestamp: None,
            completed_steps: 0,
            steps: Vec::new(),
        };

        let snapshot = self.registry.snapshot();
        let (requirements, confidence, reasoning) =
            match self.decomposer.decompose(request, snapshot.index()).await {
                Ok(requirements) if !requirements.is_empty() => {
                    let reasoning = decomposition_reasoning(&requirements);
                    (requirements, DECOMPOSITION_CONFIDENCE, reasoning)
                }
                Ok(_) => fallback_requirements(
                    request,
                    &RouterError::decomposition("no requirements produced"),
                ),
                Err(e) => fallback_requirements(request, &e),
            };

        let execution_type = if requirements.len() > 1 {
            ExecutionType::Multi
        } else {
            ExecutionType::Single
        };

        let plan = match build_plan(&requirements, &snapshot) {
            Ok(plan) => plan,
            Err(e) => {
                warn!(error = %e, "Plan construction failed");
                metrics().plan_failed();
                metrics().request_failed(started.elapsed());
                metadata.error_timestamp = Some(timestamp());
                return MultiAgentResponse {
                    success: false,
                    request: request.to_string(),
                    execution_type,
                    task_requirements: requirements,
                    execution_plan: Vec::new(),
                    intermediate_results: Default::default(),
                    confidence,
                    reasoning,
                    response: String::new(),
                    error: Some(e.public_message()),
                    metadata,
                };
            }
        };
        metrics().plan_built(plan.len());

        let outcome = self
            .engine
            .execute(self.transport.as_ref(), &plan, &snapshot, request, cancel)
            .await;

        metadata.completed_steps = outcome.completed_steps();
        let error = outcome.error.as_ref().map(RouterError::public_message);
        if error.is_some() {
            metrics().request_failed(started.elapsed());
            metadata.error_timestamp = Some(timestamp());
        } else {
            metrics().request_routed(started.elapsed());
            metadata.completion_timestamp = Some(timestamp());
        }
        metadata.steps = outcome.steps;

        MultiAgentResponse {
            success: error.is_none(),
            request: request.to_string(),
            execution_type,
            task_requirements: requirements,
            execution_plan: plan.steps().to_vec(),
            intermediate_results: outcome.results,
            confidence,
            reasoning,
            response: outcome.response,
            error,
            metadata,
        }
    }
}

fn decomposition_reasoning(requirements: &[TaskRequirement]) -> String {
    match requirements {
        [single] => format!("Single-capability request: {}", single.capability_type),
        _ => format!(
            "Multi-capability request requiring: {}",
            requirements
                .iter()
                .map(|requirement| requirement.capability_type.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

fn fallback_requirements(
    request: &str,
    error: &RouterError,
) -> (Vec<TaskRequirement>, f64, String) {
    warn!(error = %error, "Decomposition failed, falling back to a general requirement");
    (
        vec![TaskRequirement::single(GENERAL_CAPABILITY, request)],
        FALLBACK_CONFIDENCE,
        format!(
            "Fallback to single-agent routing: {}",
            error.public_message()
        ),
    )
}

fn routing_only_response(selection: &AgentSelection, error: &TransportError) -> String {
    let agent = &selection.agent;
    format!(
        "Smart Routing Decision\n\n\
         Selected Agent: {name}\n\
         Endpoint: {endpoint}\n\
         Confidence: {confidence:.2}\n\
         Reasoning: {reasoning}\n\n\
         Could not forward request: {error}\n\
         Connect directly to {name} at {endpoint}",
        name = agent.name,
        endpoint = agent.endpoint,
        confidence = selection.confidence,
        reasoning = selection.reasoning,
        error = sanitize_error_message(&error.to_string()),
    )
}
