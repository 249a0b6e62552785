//! Observability: structured logging, metrics collection and health endpoints

pub mod health;
pub mod logging;
pub mod metrics;

// Re-export for convenience
pub use health::{health_routes, HealthMonitor, HealthStatus};
pub use logging::{init_default_logging, init_logging, LogFormat};
pub use metrics::{metrics, MetricsCollector, MetricsSnapshot};

// Span macros for structured logging
pub use logging::{registry_span, request_span, step_span};
