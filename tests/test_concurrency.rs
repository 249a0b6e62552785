//! Concurrent use of a shared orchestrator
//!
//! Requests and registry changes run side by side on one `Arc<Orchestrator>`;
//! every request must see a consistent registry snapshot.

mod test_helpers;

use agent_router::orchestrator::{Orchestrator, OrchestratorResponse};
use agent_router::testing::mocks::{agent_card, skill, MockTransport, ScriptedReply};
use futures::future::join_all;
use std::sync::Arc;
use test_helpers::{CURRENCY_ENDPOINT, MATH_ENDPOINT};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_requests_are_all_routed() {
    let transport = MockTransport::new()
        .with_reply(MATH_ENDPOINT, ScriptedReply::Echo("math".to_string()))
        .with_reply(CURRENCY_ENDPOINT, ScriptedReply::Echo("fx".to_string()));
    let orchestrator = test_helpers::orchestrator_with_agents(transport.clone());

    let requests: Vec<String> = (0..20)
        .map(|i| {
            if i % 2 == 0 {
                format!("what is {i}+1")
            } else {
                format!("convert {i} usd to eur")
            }
        })
        .collect();

    let handles = requests.iter().cloned().map(|request| {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move { orchestrator.process_request(&request).await })
    });
    let responses: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    for (request, response) in requests.iter().zip(&responses) {
        assert!(response.success, "request {request} failed");
        let expected = if request.starts_with("what") {
            "MathAgent"
        } else {
            "CurrencyAgent"
        };
        assert_eq!(response.selected_agent_id.as_deref(), Some(expected));
        assert!(response.response.ends_with(request.as_str()));
    }
    assert_eq!(transport.get_sent_requests().await.len(), 20);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_registrations_are_not_lost() {
    let endpoints: Vec<String> = (0..16)
        .map(|i| format!("http://localhost:{}", 8100 + i))
        .collect();
    let mut transport = MockTransport::new();
    for (i, endpoint) in endpoints.iter().enumerate() {
        transport = transport.with_card(
            endpoint,
            agent_card(
                &format!("Worker{i}"),
                endpoint,
                "Parallel worker",
                vec![skill(&format!("job_{i}"), "Runs jobs", &["jobs"])],
            ),
        );
    }
    let orchestrator = Arc::new(Orchestrator::new(
        test_helpers::test_config(),
        Arc::new(transport),
    ));

    let handles = endpoints.iter().cloned().map(|endpoint| {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move { orchestrator.register_agent(&endpoint).await })
    });
    let results = join_all(handles).await;

    assert!(results.into_iter().all(|joined| joined.unwrap().success));
    assert_eq!(orchestrator.registry().agent_count(), endpoints.len());

    // Every agent's own skill made it into the final index
    let snapshot = orchestrator.registry().snapshot();
    for i in 0..endpoints.len() {
        let owners = snapshot.index().agents_for(&format!("job {i}"));
        assert_eq!(owners, Some(&[format!("Worker{i}")][..]));
    }
    // Shared by every agent, so it cannot discriminate
    assert!(!snapshot.index().contains("jobs"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_requests_during_registry_churn() {
    let orchestrator = test_helpers::orchestrator_with_agents(MockTransport::new());

    let churn = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move {
            for _ in 0..25 {
                orchestrator.unregister_agent("CurrencyAgent");
                orchestrator.registry().register_descriptor(
                    CURRENCY_ENDPOINT,
                    agent_router::testing::mocks::currency_agent_card(CURRENCY_ENDPOINT),
                );
                tokio::task::yield_now().await;
            }
        })
    };

    let requests = (0..25).map(|_| {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move { orchestrator.process("convert 5 usd to eur").await })
    });
    let responses = join_all(requests).await;
    churn.await.unwrap();

    for joined in responses {
        let OrchestratorResponse::Single(response) = joined.unwrap() else {
            panic!("single-domain request should not be planned");
        };
        // MathAgent is always registered, so routing never fails
        assert!(response.success);
        let id = response.selected_agent_id.unwrap();
        assert!(id == "CurrencyAgent" || id == "MathAgent");
    }
    assert_eq!(orchestrator.registry().agent_count(), 2);
}
