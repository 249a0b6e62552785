//! HTTP transport tests against mock agents
//!
//! Uses wiremock to stand in for remote agents speaking JSON-RPC over HTTP.

mod test_helpers;

use agent_router::orchestrator::{Orchestrator, RoutingStatus};
use agent_router::protocol::{JsonRpcRequest, JsonRpcResponse, Task};
use agent_router::server::RouterServer;
use agent_router::testing::mocks::math_agent_card;
use agent_router::transport::{
    forward_request, HttpTransport, HttpTransportConfig, PollPolicy, SendOutcome, Transport,
    TransportError,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn transport() -> HttpTransport {
    HttpTransport::new(
        HttpTransportConfig::new()
            .with_discovery_timeout_ms(2000)
            .with_request_timeout_ms(2000),
    )
    .unwrap()
}

fn fast_policy() -> PollPolicy {
    PollPolicy::new(Duration::from_millis(5), 5)
}

async fn mount_card(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/.well-known/agent.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(math_agent_card(&server.uri())))
        .mount(server)
        .await;
}

fn message_reply(text: &str) -> serde_json::Value {
    json!({
        "jsonrpc": "2.0",
        "id": "1",
        "result": {
            "kind": "message",
            "role": "agent",
            "messageId": "m-1",
            "parts": [{"kind": "text", "text": text}]
        }
    })
}

fn task_reply(state: &str, artifact_text: Option<&str>) -> serde_json::Value {
    let artifacts = match artifact_text {
        Some(text) => json!([{"artifactId": "a-1", "parts": [{"kind": "text", "text": text}]}]),
        None => json!([]),
    };
    json!({
        "jsonrpc": "2.0",
        "id": "1",
        "result": {
            "kind": "task",
            "id": "task-42",
            "status": {"state": state},
            "artifacts": artifacts
        }
    })
}

#[tokio::test]
async fn test_fetch_agent_card() {
    let server = MockServer::start().await;
    mount_card(&server).await;

    let card = transport().fetch_agent_card(&server.uri()).await.unwrap();

    assert_eq!(card.name, "MathAgent");
    assert_eq!(card.skills.len(), 1);
    assert_eq!(card.url, server.uri());
}

#[tokio::test]
async fn test_missing_agent_card_is_http_error() {
    let server = MockServer::start().await;

    let result = transport().fetch_agent_card(&server.uri()).await;

    assert!(matches!(result, Err(TransportError::Http { status: 404, .. })));
}

#[tokio::test]
async fn test_direct_message_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_partial_json(json!({"method": "message/send"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(message_reply("5")))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = transport().send_task(&server.uri(), "what is 2+3").await.unwrap();

    assert_eq!(outcome, SendOutcome::Immediate("5".to_string()));
}

#[tokio::test]
async fn test_working_task_is_polled_until_completed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "message/send"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(task_reply("working", None)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(
            json!({"method": "tasks/get", "params": {"id": "task-42"}}),
        ))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(task_reply("completed", Some("92 EUR"))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let text = forward_request(&transport(), &server.uri(), "convert", &fast_policy())
        .await
        .unwrap();

    assert_eq!(text, "92 EUR");
}

#[tokio::test]
async fn test_task_completed_on_send_needs_no_poll() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "message/send"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(task_reply("completed", Some("done"))),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "tasks/get"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(task_reply("completed", None)))
        .expect(0)
        .mount(&server)
        .await;

    let text = forward_request(&transport(), &server.uri(), "task", &fast_policy())
        .await
        .unwrap();

    assert_eq!(text, "done");
}

#[tokio::test]
async fn test_failed_task_on_send_is_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(task_reply("failed", None)))
        .mount(&server)
        .await;

    let result = transport().send_task(&server.uri(), "task").await;

    match result {
        Err(TransportError::TaskFailed { task_id, state, .. }) => {
            assert_eq!(task_id, "task-42");
            assert_eq!(state, "failed");
        }
        other => panic!("expected task failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_rpc_error_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": "1",
            "error": {"code": -32602, "message": "Invalid params"}
        })))
        .mount(&server)
        .await;

    let result = transport().send_task(&server.uri(), "task").await;

    assert_eq!(
        result,
        Err(TransportError::Rpc {
            code: -32602,
            message: "Invalid params".to_string()
        })
    );
}

#[tokio::test]
async fn test_server_error_is_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let result = transport().send_task(&server.uri(), "task").await;

    assert_eq!(
        result,
        Err(TransportError::Http {
            status: 500,
            body: "boom".to_string()
        })
    );
}

#[tokio::test]
async fn test_malformed_result_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": "1",
            "result": {"unexpected": true}
        })))
        .mount(&server)
        .await;

    let result = transport().send_task(&server.uri(), "task").await;

    assert!(matches!(result, Err(TransportError::InvalidResponse(_))));
}

#[tokio::test]
async fn test_slow_agent_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(message_reply("late"))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;
    let transport = HttpTransport::new(HttpTransportConfig::new().with_request_timeout_ms(50))
        .unwrap();

    let result = transport.send_task(&server.uri(), "task").await;

    assert!(matches!(result, Err(TransportError::Network(_))));
}

#[tokio::test]
async fn test_router_forwards_to_live_agent() {
    // Arrange: a real agent behind HTTP, registered through the orchestrator
    let agent = MockServer::start().await;
    mount_card(&agent).await;
    Mock::given(method("POST"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(message_reply("5")))
        .mount(&agent)
        .await;

    let orchestrator = Orchestrator::from_config(test_helpers::test_config()).unwrap();
    let registered = orchestrator.register_agent(&agent.uri()).await;
    assert!(registered.success);

    // Act
    let response = orchestrator.process_request("what is 2+3").await;

    // Assert
    assert_eq!(response.status(), Some(RoutingStatus::Completed));
    assert_eq!(response.response, "Routed to MathAgent → 5");
}

#[tokio::test]
async fn test_router_endpoint_end_to_end() {
    let agent = MockServer::start().await;
    mount_card(&agent).await;
    Mock::given(method("POST"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(message_reply("5")))
        .mount(&agent)
        .await;

    let orchestrator = Orchestrator::from_config(test_helpers::test_config()).unwrap();
    orchestrator.register_agent(&agent.uri()).await;
    let server = RouterServer::new(Arc::new(orchestrator));
    let routes = server.routes();

    let reply = warp::test::request()
        .method("POST")
        .path("/")
        .json(&JsonRpcRequest::message_send("what is 2+3"))
        .reply(&routes)
        .await;

    assert_eq!(reply.status(), 200);
    let envelope: JsonRpcResponse = serde_json::from_slice(reply.body()).unwrap();
    let task: Task = serde_json::from_value(envelope.result.unwrap()).unwrap();
    let text = task.artifact_text().unwrap();
    assert!(text.starts_with("Routed to MathAgent\n"));
    assert!(text.ends_with("Response: Routed to MathAgent → 5"));
}
