//! Agent management API
//!
//! Mounted under `/management/api/v1/agents`. Registration and removal are
//! available as JSON `POST`s and as query-string `GET`s.

use crate::agent::descriptor::AgentSummary;
use crate::orchestrator::Orchestrator;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tracing::info;
use warp::Filter;

/// Body of `POST /register` and query of `GET /register_agent`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegisterAgentRequest {
    pub endpoint: String,
}

/// Body of `POST /unregister` and query of `GET /unregister_agent`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnregisterAgentRequest {
    pub agent_identifier: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListAgentsResponse {
    pub success: bool,
    pub agents: Vec<AgentSummary>,
    pub total_count: usize,
    pub message: String,
}

/// Largest accepted management request body
const MAX_BODY_BYTES: u64 = 16 * 1024;

fn with_orchestrator(
    orchestrator: Arc<Orchestrator>,
) -> impl Filter<Extract = (Arc<Orchestrator>,), Error = Infallible> + Clone {
    warp::any().map(move || orchestrator.clone())
}

fn agents_path() -> impl Filter<Extract = (), Error = warp::Rejection> + Clone {
    warp::path("management")
        .and(warp::path("api"))
        .and(warp::path("v1"))
        .and(warp::path("agents"))
}

/// Warp filters for the management API
pub fn management_routes(
    orchestrator: Arc<Orchestrator>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    // GET /list and GET /list_agents
    let list = agents_path()
        .and(warp::path("list").or(warp::path("list_agents")).unify())
        .and(warp::path::end())
        .and(warp::get())
        .and(with_orchestrator(orchestrator.clone()))
        .and_then(list_agents);

    // POST /register {"endpoint": ...}
    let register = agents_path()
        .and(warp::path("register"))
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(with_orchestrator(orchestrator.clone()))
        .and_then(register_agent);

    // GET /register_agent?endpoint=...
    let register_get = agents_path()
        .and(warp::path("register_agent"))
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<RegisterAgentRequest>())
        .and(with_orchestrator(orchestrator.clone()))
        .and_then(register_agent);

    // POST /unregister {"agent_identifier": ...}
    let unregister = agents_path()
        .and(warp::path("unregister"))
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(with_orchestrator(orchestrator.clone()))
        .and_then(unregister_agent);

    // GET /unregister_agent?agent_identifier=...
    let unregister_get = agents_path()
        .and(warp::path("unregister_agent"))
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<UnregisterAgentRequest>())
        .and(with_orchestrator(orchestrator))
        .and_then(unregister_agent);

    list.or(register)
        .or(register_get)
        .or(unregister)
        .or(unregister_get)
}

async fn list_agents(orchestrator: Arc<Orchestrator>) -> Result<impl warp::Reply, Infallible> {
    let agents = orchestrator.list_agents();
    info!(count = agents.len(), "Listing registered agents");

    Ok(warp::reply::json(&ListAgentsResponse {
        success: true,
        total_count: agents.len(),
        message: format!("Found {} registered agents", agents.len()),
        agents,
    }))
}

async fn register_agent(
    request: RegisterAgentRequest,
    orchestrator: Arc<Orchestrator>,
) -> Result<impl warp::Reply, Infallible> {
    info!(endpoint = %request.endpoint, "Registering agent");
    let response = orchestrator.register_agent(&request.endpoint).await;
    Ok(warp::reply::json(&response))
}

async fn unregister_agent(
    request: UnregisterAgentRequest,
    orchestrator: Arc<Orchestrator>,
) -> Result<impl warp::Reply, Infallible> {
    info!(identifier = %request.agent_identifier, "Unregistering agent");
    let response = orchestrator.unregister_agent(&request.agent_identifier);
    Ok(warp::reply::json(&response))
}
