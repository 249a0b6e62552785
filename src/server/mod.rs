//! HTTP server exposing the router as an agent
//!
//! Routes:
//!
//! - `GET /.well-known/agent.json`: the router's own agent card
//! - `POST /`: JSON-RPC (`message/send`, `tasks/get`)
//! - `/management/api/v1/agents/...`: list, register and unregister agents
//! - `GET /health`, `/ready`, `/live`, `/metrics`

pub mod card;
pub mod management;
pub mod rpc;

use crate::observability::health::{health_routes, HealthMonitor};
use crate::orchestrator::Orchestrator;
use crate::protocol::AGENT_CARD_PATH;
use serde::Serialize;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};
use warp::http::StatusCode;
use warp::hyper::body::Bytes;
use warp::{Filter, Rejection, Reply};

pub use card::{router_agent_card, router_skills};
pub use management::{management_routes, ListAgentsResponse};
pub use rpc::{render_reply, TaskStore, LIST_AGENTS_COMMAND, RESULT_ARTIFACT_NAME};

/// Largest accepted JSON-RPC body
const MAX_RPC_BODY_BYTES: u64 = 1024 * 1024;

/// Server startup errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to resolve bind address {address}: {message}")]
    AddressResolution { address: String, message: String },

    #[error("Failed to bind {address}: {message}")]
    Bind { address: String, message: String },
}

#[derive(Clone)]
struct RpcContext {
    orchestrator: Arc<Orchestrator>,
    tasks: TaskStore,
    health: Arc<HealthMonitor>,
}

/// The router's HTTP front end
pub struct RouterServer {
    orchestrator: Arc<Orchestrator>,
    tasks: TaskStore,
    health: Arc<HealthMonitor>,
}

impl RouterServer {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        let health = Arc::new(HealthMonitor::new(
            orchestrator.config().router.name.clone(),
            orchestrator.registry().clone(),
        ));
        Self {
            orchestrator,
            tasks: TaskStore::new(),
            health,
        }
    }

    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    pub fn tasks(&self) -> &TaskStore {
        &self.tasks
    }

    /// All routes with rejections rendered as JSON errors
    pub fn routes(&self) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
        let card = router_agent_card(self.orchestrator.config());
        let (well_known, card_file) = AGENT_CARD_PATH
            .split_once('/')
            .unwrap_or((".well-known", "agent.json"));

        // GET /.well-known/agent.json
        let card_route = warp::path(well_known)
            .and(warp::path(card_file))
            .and(warp::path::end())
            .and(warp::get())
            .map(move || warp::reply::json(&card));

        let context = RpcContext {
            orchestrator: self.orchestrator.clone(),
            tasks: self.tasks.clone(),
            health: self.health.clone(),
        };

        // POST / - JSON-RPC
        let rpc_route = warp::path::end()
            .and(warp::post())
            .and(warp::body::content_length_limit(MAX_RPC_BODY_BYTES))
            .and(warp::body::bytes())
            .and(warp::any().map(move || context.clone()))
            .and_then(rpc_endpoint);

        card_route
            .or(rpc_route)
            .or(management_routes(self.orchestrator.clone()))
            .or(health_routes(self.health.clone()))
            .with(warp::cors().allow_any_origin())
            .with(warp::trace::request())
            .recover(handle_rejection)
    }

    /// Serve until `shutdown` resolves
    pub async fn run<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let address = self.orchestrator.config().bind_address();
        let socket: SocketAddr = tokio::net::lookup_host(&address)
            .await
            .map_err(|e| ServerError::AddressResolution {
                address: address.clone(),
                message: e.to_string(),
            })?
            .next()
            .ok_or_else(|| ServerError::AddressResolution {
                address: address.clone(),
                message: "no addresses found".to_string(),
            })?;

        let (bound, server) = warp::serve(self.routes())
            .try_bind_with_graceful_shutdown(socket, shutdown)
            .map_err(|e| ServerError::Bind {
                address: address.clone(),
                message: e.to_string(),
            })?;

        info!(
            address = %bound,
            agents = self.orchestrator.registry().agent_count(),
            "Router listening"
        );
        server.await;
        info!("Router stopped");

        Ok(())
    }
}

async fn rpc_endpoint(body: Bytes, context: RpcContext) -> Result<impl Reply, Infallible> {
    let response = match rpc::parse_request(&body) {
        Ok(request) => rpc::handle_rpc(&context.orchestrator, &context.tasks, request).await,
        Err(response) => response,
    };
    context.health.mark_request_processed();

    Ok(warp::reply::json(&response))
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    code: u16,
}

async fn handle_rejection(rejection: Rejection) -> Result<impl Reply, Infallible> {
    let (status, message) = if rejection.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found".to_string())
    } else if let Some(e) = rejection.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, format!("Invalid request body: {e}"))
    } else if let Some(e) = rejection.find::<warp::reject::InvalidQuery>() {
        (StatusCode::BAD_REQUEST, format!("Invalid query: {e}"))
    } else if rejection.find::<warp::reject::PayloadTooLarge>().is_some() {
        (
            StatusCode::PAYLOAD_TOO_LARGE,
            "Request body too large".to_string(),
        )
    } else if rejection.find::<warp::reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            "Method not allowed".to_string(),
        )
    } else {
        error!(rejection = ?rejection, "Unhandled rejection");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_string(),
        )
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&ErrorResponse {
            error: message,
            code: status.as_u16(),
        }),
        status,
    ))
}
