//! Router HTTP API tests
//!
//! Exercises the assembled warp routes the way clients use them: register an
//! agent through the management API, route requests over JSON-RPC, and watch
//! the health probes follow the registry.

mod test_helpers;

use agent_router::orchestrator::Orchestrator;
use agent_router::protocol::{AgentCard, JsonRpcError, JsonRpcRequest, JsonRpcResponse, Task};
use agent_router::server::{ListAgentsResponse, RouterServer, LIST_AGENTS_COMMAND};
use agent_router::testing::mocks::ScriptedReply;
use serde_json::{json, Value};
use std::sync::Arc;
use test_helpers::{MATH_ENDPOINT, WEATHER_ENDPOINT};

fn server() -> RouterServer {
    let transport = test_helpers::discoverable_transport()
        .with_reply(MATH_ENDPOINT, ScriptedReply::Immediate("5".to_string()));
    let orchestrator = Orchestrator::new(test_helpers::test_config(), Arc::new(transport));
    RouterServer::new(Arc::new(orchestrator))
}

async fn send_text(server: &RouterServer, text: &str) -> JsonRpcResponse {
    let reply = warp::test::request()
        .method("POST")
        .path("/")
        .json(&JsonRpcRequest::message_send(text))
        .reply(&server.routes())
        .await;
    assert_eq!(reply.status(), 200);
    serde_json::from_slice(reply.body()).unwrap()
}

fn artifact_text(response: JsonRpcResponse) -> String {
    let task: Task = serde_json::from_value(response.result.unwrap()).unwrap();
    task.artifact_text().unwrap().to_string()
}

#[tokio::test]
async fn test_register_then_route_over_http() {
    let server = server();
    let routes = server.routes();

    // Arrange: empty router is not ready
    let ready = warp::test::request().path("/ready").reply(&routes).await;
    assert_eq!(ready.status(), 503);

    let registered = warp::test::request()
        .method("POST")
        .path("/management/api/v1/agents/register")
        .json(&json!({ "endpoint": MATH_ENDPOINT }))
        .reply(&routes)
        .await;
    let body: Value = serde_json::from_slice(registered.body()).unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(
        body["message"],
        format!("Successfully registered MathAgent from {MATH_ENDPOINT}")
    );

    let ready = warp::test::request().path("/ready").reply(&routes).await;
    assert_eq!(ready.status(), 200);

    // Act
    let text = artifact_text(send_text(&server, "what is 2+3").await);

    // Assert
    assert_eq!(
        text.lines().next(),
        Some("Routed to MathAgent"),
        "unexpected reply: {text}"
    );
    assert!(text.contains("\nConfidence: "));
    assert!(text.contains("\nReasoning: Selected MathAgent"));
    assert!(text.ends_with("Response: Routed to MathAgent → 5"));
}

#[tokio::test]
async fn test_list_agents_command_and_endpoint_agree() {
    let server = server();
    let routes = server.routes();
    for endpoint in [MATH_ENDPOINT, WEATHER_ENDPOINT] {
        warp::test::request()
            .path(&format!(
                "/management/api/v1/agents/register_agent?endpoint={endpoint}"
            ))
            .reply(&routes)
            .await;
    }

    let listed = warp::test::request()
        .path("/management/api/v1/agents/list")
        .reply(&routes)
        .await;
    let listed: ListAgentsResponse = serde_json::from_slice(listed.body()).unwrap();

    let listing: Value =
        serde_json::from_str(&artifact_text(send_text(&server, LIST_AGENTS_COMMAND).await))
            .unwrap();

    assert_eq!(listed.total_count, 2);
    assert_eq!(listing["type"], "agent_list");
    assert_eq!(listing["total_count"], 2);
    let ids: Vec<&str> = listed.agents.iter().map(|a| a.agent_id.as_str()).collect();
    assert_eq!(ids, vec!["MathAgent", "WeatherAgent"]);
    assert_eq!(listing["agents"][1]["agent_id"], "WeatherAgent");
}

#[tokio::test]
async fn test_empty_registry_reply_is_error_text() {
    let server = server();

    let text = artifact_text(send_text(&server, "what is 2+3").await);

    assert_eq!(text, "Error: No agents available for routing");
}

#[tokio::test]
async fn test_unregister_over_http() {
    let server = server();
    let routes = server.routes();
    warp::test::request()
        .method("POST")
        .path("/management/api/v1/agents/register")
        .json(&json!({ "endpoint": MATH_ENDPOINT }))
        .reply(&routes)
        .await;

    let removed = warp::test::request()
        .method("POST")
        .path("/management/api/v1/agents/unregister")
        .json(&json!({ "agent_identifier": "MathAgent" }))
        .reply(&routes)
        .await;
    let body: Value = serde_json::from_slice(removed.body()).unwrap();

    assert_eq!(body["success"], true);
    assert_eq!(server.orchestrator().registry().agent_count(), 0);

    let health = warp::test::request().path("/health").reply(&routes).await;
    assert_eq!(health.status(), 503);
    let health: Value = serde_json::from_slice(health.body()).unwrap();
    assert_eq!(health["status"], "degraded");
}

#[tokio::test]
async fn test_management_rejects_malformed_body() {
    let routes = server().routes();

    let response = warp::test::request()
        .method("POST")
        .path("/management/api/v1/agents/register")
        .header("content-type", "application/json")
        .body("{\"url\": 1}")
        .reply(&routes)
        .await;

    assert_eq!(response.status(), 400);
    let body: Value = serde_json::from_slice(response.body()).unwrap();
    assert_eq!(body["code"], 400);
}

#[tokio::test]
async fn test_unknown_rpc_method() {
    let routes = server().routes();
    let request = json!({"jsonrpc": "2.0", "id": 3, "method": "tasks/resubscribe", "params": {}});

    let reply = warp::test::request()
        .method("POST")
        .path("/")
        .json(&request)
        .reply(&routes)
        .await;

    let response: JsonRpcResponse = serde_json::from_slice(reply.body()).unwrap();
    assert_eq!(response.id, json!(3));
    assert_eq!(
        response.error.unwrap().code,
        JsonRpcError::METHOD_NOT_FOUND
    );
}

#[tokio::test]
async fn test_agent_card_advertises_router() {
    let routes = server().routes();

    let reply = warp::test::request()
        .path("/.well-known/agent.json")
        .reply(&routes)
        .await;

    let card: AgentCard = serde_json::from_slice(reply.body()).unwrap();
    assert_eq!(card.url, "http://localhost:8000/");
    assert!(card.capabilities.push_notifications);
    assert!(!card.capabilities.streaming);
    assert_eq!(card.version, env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_metrics_endpoint_reports_sections() {
    let routes = server().routes();

    let reply = warp::test::request().path("/metrics").reply(&routes).await;

    assert_eq!(reply.status(), 200);
    let body: Value = serde_json::from_slice(reply.body()).unwrap();
    for section in ["requests", "planning", "agents", "registry"] {
        assert!(body[section].is_object(), "missing {section}");
    }
}
