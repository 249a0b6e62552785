//! Test helpers and utilities for integration tests

use agent_router::config::RouterConfig;
use agent_router::orchestrator::Orchestrator;
use agent_router::protocol::AgentCard;
use agent_router::testing::mocks::{
    agent_card, currency_agent_card, math_agent_card, skill, MockTransport,
};
use std::sync::Arc;

pub const MATH_ENDPOINT: &str = "http://localhost:8001";
pub const CURRENCY_ENDPOINT: &str = "http://localhost:8002";
pub const WEATHER_ENDPOINT: &str = "http://localhost:8003";

/// Create a test configuration for integration tests
#[allow(dead_code)]
pub fn test_config() -> RouterConfig {
    RouterConfig::test_config()
}

/// Weather agent fixture, a third domain for planner tests
#[allow(dead_code)]
pub fn weather_agent_card(url: &str) -> AgentCard {
    agent_card(
        "WeatherAgent",
        url,
        "Reports current weather and forecasts",
        vec![skill(
            "weather_forecast",
            "Get the weather forecast and temperature for a city",
            &["weather", "forecast", "temperature"],
        )],
    )
}

/// Orchestrator over `transport` with math and currency agents registered
#[allow(dead_code)]
pub fn orchestrator_with_agents(transport: MockTransport) -> Arc<Orchestrator> {
    let orchestrator = Orchestrator::new(test_config(), Arc::new(transport));
    orchestrator
        .registry()
        .register_descriptor(MATH_ENDPOINT, math_agent_card(MATH_ENDPOINT));
    orchestrator
        .registry()
        .register_descriptor(CURRENCY_ENDPOINT, currency_agent_card(CURRENCY_ENDPOINT));
    Arc::new(orchestrator)
}

/// Mock transport serving the cards of all three fixture agents
#[allow(dead_code)]
pub fn discoverable_transport() -> MockTransport {
    MockTransport::new()
        .with_card(MATH_ENDPOINT, math_agent_card(MATH_ENDPOINT))
        .with_card(CURRENCY_ENDPOINT, currency_agent_card(CURRENCY_ENDPOINT))
        .with_card(WEATHER_ENDPOINT, weather_agent_card(WEATHER_ENDPOINT))
}
