//! Health check endpoints for container orchestration
//!
//! Exposes `/health`, `/ready`, `/live` and `/metrics` as warp filters that
//! the router server mounts next to its protocol routes.

use crate::agent::discovery::AgentRegistry;
use crate::observability::metrics::metrics;
use serde::Serialize;
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use warp::http::StatusCode;
use warp::Filter;

/// Health state of the router
pub struct HealthMonitor {
    router_name: String,
    registry: AgentRegistry,
    last_request_processed: AtomicU64,
}

impl HealthMonitor {
    pub fn new(router_name: impl Into<String>, registry: AgentRegistry) -> Self {
        Self {
            router_name: router_name.into(),
            registry,
            last_request_processed: AtomicU64::new(0),
        }
    }

    /// Update last request processed timestamp
    pub fn mark_request_processed(&self) {
        self.last_request_processed
            .store(current_timestamp(), Ordering::Relaxed);
    }

    /// The router is ready once at least one agent is registered
    pub fn is_ready(&self) -> bool {
        self.registry.agent_count() > 0
    }

    pub fn health_status(&self) -> HealthStatus {
        let now = current_timestamp();

        let mut checks = HashMap::new();
        checks.insert("registry".to_string(), self.check_registry(now));
        checks.insert(
            "request_processing".to_string(),
            self.check_request_processing(now),
        );

        let overall_healthy = checks.values().all(|check| check.status == "healthy");

        HealthStatus {
            status: if overall_healthy { "healthy" } else { "degraded" }.to_string(),
            timestamp: now,
            router: self.router_name.clone(),
            uptime_seconds: metrics().get_metrics().uptime_seconds,
            checks,
        }
    }

    fn check_registry(&self, now: u64) -> HealthCheck {
        let count = self.registry.agent_count();
        if count > 0 {
            HealthCheck {
                status: "healthy".to_string(),
                message: Some(format!("{count} agent(s) registered")),
                last_check: now,
            }
        } else {
            HealthCheck {
                status: "unhealthy".to_string(),
                message: Some("No agents registered".to_string()),
                last_check: now,
            }
        }
    }

    fn check_request_processing(&self, now: u64) -> HealthCheck {
        let last = self.last_request_processed.load(Ordering::Relaxed);
        let message = if last == 0 {
            "No requests processed yet".to_string()
        } else {
            format!("Last request {} seconds ago", now.saturating_sub(last))
        };

        HealthCheck {
            status: "healthy".to_string(),
            message: Some(message),
            last_check: now,
        }
    }
}

/// Warp filters for the health endpoints
pub fn health_routes(
    monitor: Arc<HealthMonitor>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let health_monitor = monitor.clone();
    let ready_monitor = monitor;

    // GET /health - overall status with detailed checks
    let health_route = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .and_then(move || {
            let monitor = health_monitor.clone();
            async move {
                let status = monitor.health_status();
                let code = if status.status == "healthy" {
                    StatusCode::OK
                } else {
                    StatusCode::SERVICE_UNAVAILABLE
                };
                Ok::<_, Infallible>(warp::reply::with_status(warp::reply::json(&status), code))
            }
        });

    // GET /ready - readiness probe
    let ready_route = warp::path("ready")
        .and(warp::path::end())
        .and(warp::get())
        .and_then(move || {
            let monitor = ready_monitor.clone();
            async move {
                let ready = monitor.is_ready();
                let response = ReadinessResponse {
                    ready,
                    timestamp: current_timestamp(),
                };
                let code = if ready {
                    StatusCode::OK
                } else {
                    StatusCode::SERVICE_UNAVAILABLE
                };
                Ok::<_, Infallible>(warp::reply::with_status(warp::reply::json(&response), code))
            }
        });

    // GET /live - liveness probe
    let live_route = warp::path("live")
        .and(warp::path::end())
        .and(warp::get())
        .map(|| {
            warp::reply::json(&LivenessResponse {
                alive: true,
                timestamp: current_timestamp(),
            })
        });

    // GET /metrics - complete metrics export
    let metrics_route = warp::path("metrics")
        .and(warp::path::end())
        .and(warp::get())
        .map(|| warp::reply::json(&metrics().get_metrics()));

    health_route.or(ready_route).or(live_route).or(metrics_route)
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthCheck {
    pub status: String,
    pub message: Option<String>,
    pub last_check: u64,
}

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: u64,
    pub router: String,
    pub uptime_seconds: u64,
    pub checks: HashMap<String, HealthCheck>,
}

#[derive(Debug, Serialize)]
struct ReadinessResponse {
    ready: bool,
    timestamp: u64,
}

#[derive(Debug, Serialize)]
struct LivenessResponse {
    alive: bool,
    timestamp: u64,
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::mocks::math_agent_card;

    fn monitor_with_agent() -> HealthMonitor {
        let registry = AgentRegistry::new();
        registry.register_descriptor(
            "http://localhost:8001",
            math_agent_card("http://localhost:8001"),
        );
        HealthMonitor::new("Router", registry)
    }

    #[test]
    fn test_empty_registry_is_degraded() {
        let monitor = HealthMonitor::new("Router", AgentRegistry::new());

        let status = monitor.health_status();
        assert_eq!(status.status, "degraded");
        assert_eq!(status.checks["registry"].status, "unhealthy");
        assert!(!monitor.is_ready());
    }

    #[test]
    fn test_registered_agent_is_healthy() {
        let monitor = monitor_with_agent();

        let status = monitor.health_status();
        assert_eq!(status.status, "healthy");
        assert_eq!(status.router, "Router");
        assert!(monitor.is_ready());
    }

    #[test]
    fn test_request_processing_message() {
        let monitor = monitor_with_agent();
        let before = monitor.health_status();
        assert_eq!(
            before.checks["request_processing"].message.as_deref(),
            Some("No requests processed yet")
        );

        monitor.mark_request_processed();
        let after = monitor.health_status();
        assert!(after.checks["request_processing"]
            .message
            .as_deref()
            .unwrap()
            .starts_with("Last request"));
    }

    #[tokio::test]
    async fn test_health_routes() {
        let routes = health_routes(Arc::new(monitor_with_agent()));

        let health = warp::test::request()
            .method("GET")
            .path("/health")
            .reply(&routes)
            .await;
        assert_eq!(health.status(), 200);

        let live = warp::test::request()
            .method("GET")
            .path("/live")
            .reply(&routes)
            .await;
        assert_eq!(live.status(), 200);
        let body: serde_json::Value = serde_json::from_slice(live.body()).unwrap();
        assert_eq!(body["alive"], true);

        let metrics = warp::test::request()
            .method("GET")
            .path("/metrics")
            .reply(&routes)
            .await;
        assert_eq!(metrics.status(), 200);
        let body: serde_json::Value = serde_json::from_slice(metrics.body()).unwrap();
        assert!(body.get("requests").is_some());
        assert!(body.get("registry").is_some());
    }

    #[tokio::test]
    async fn test_ready_route_without_agents() {
        let routes = health_routes(Arc::new(HealthMonitor::new("Router", AgentRegistry::new())));

        let response = warp::test::request()
            .method("GET")
            .path("/ready")
            .reply(&routes)
            .await;
        assert_eq!(response.status(), 503);
    }
}
