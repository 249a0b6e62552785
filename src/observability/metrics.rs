//! Metrics collection for the router
//!
//! Counters for request outcomes, plan construction, per-agent step
//! execution and registry size. All counters are lock-free atomics; timing
//! samples live behind a mutex and are bounded.

use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Bound on retained timing samples
const MAX_TIMING_SAMPLES: usize = 1000;

/// Global metrics collector
static METRICS: Lazy<MetricsCollector> = Lazy::new(MetricsCollector::new);

/// Get global metrics instance
pub fn metrics() -> &'static MetricsCollector {
    &METRICS
}

/// Thread-safe metrics collector
#[derive(Debug)]
pub struct MetricsCollector {
    // Requests
    requests_received: AtomicU64,
    requests_in_flight: AtomicU64,
    requests_routed: AtomicU64,
    requests_routing_only: AtomicU64,
    requests_failed: AtomicU64,
    multi_agent_requests: AtomicU64,
    processing_times: Mutex<Vec<u64>>,

    // Planning
    plans_built: AtomicU64,
    plans_failed: AtomicU64,
    planned_steps: AtomicU64,

    // Per-agent step execution
    agent_stats: Mutex<HashMap<String, AgentCallStats>>,

    // Registry
    registered_agents: AtomicU64,
    registrations: AtomicU64,
    unregistrations: AtomicU64,

    uptime_start: AtomicU64,
}

impl MetricsCollector {
    /// Create new metrics collector
    pub fn new() -> Self {
        Self {
            requests_received: AtomicU64::new(0),
            requests_in_flight: AtomicU64::new(0),
            requests_routed: AtomicU64::new(0),
            requests_routing_only: AtomicU64::new(0),
            requests_failed: AtomicU64::new(0),
            multi_agent_requests: AtomicU64::new(0),
            processing_times: Mutex::new(Vec::new()),
            plans_built: AtomicU64::new(0),
            plans_failed: AtomicU64::new(0),
            planned_steps: AtomicU64::new(0),
            agent_stats: Mutex::new(HashMap::new()),
            registered_agents: AtomicU64::new(0),
            registrations: AtomicU64::new(0),
            unregistrations: AtomicU64::new(0),
            uptime_start: AtomicU64::new(current_timestamp()),
        }
    }

    /// Record a request entering the router
    pub fn request_received(&self) {
        self.requests_received.fetch_add(1, Ordering::Relaxed);
        self.requests_in_flight.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a request that went through the multi-agent path
    pub fn multi_agent_request(&self) {
        self.multi_agent_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a request answered by a downstream agent
    pub fn request_routed(&self, duration: Duration) {
        self.requests_routed.fetch_add(1, Ordering::Relaxed);
        self.request_finished(duration);
    }

    /// Record a request answered with a routing decision only
    pub fn request_routing_only(&self, duration: Duration) {
        self.requests_routing_only.fetch_add(1, Ordering::Relaxed);
        self.request_finished(duration);
    }

    /// Record a request that failed outright
    pub fn request_failed(&self, duration: Duration) {
        self.requests_failed.fetch_add(1, Ordering::Relaxed);
        self.request_finished(duration);
    }

    fn request_finished(&self, duration: Duration) {
        // Saturating decrement; reset() may race with requests in flight
        let _ = self
            .requests_in_flight
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
                current.checked_sub(1)
            });
        self.record_processing_time(duration);
    }

    /// Record processing time, keeping the most recent samples only
    pub fn record_processing_time(&self, duration: Duration) {
        let mut times = self
            .processing_times
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        times.push(duration.as_millis() as u64);
        if times.len() > MAX_TIMING_SAMPLES {
            times.remove(0);
        }
    }

    /// Record a successfully built plan
    pub fn plan_built(&self, steps: usize) {
        self.plans_built.fetch_add(1, Ordering::Relaxed);
        self.planned_steps.fetch_add(steps as u64, Ordering::Relaxed);
    }

    /// Record a plan that could not be built
    pub fn plan_failed(&self) {
        self.plans_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one plan step sent to an agent
    pub fn step_executed(&self, agent_id: &str, duration: Duration, success: bool) {
        let mut stats = self
            .agent_stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let entry = stats
            .entry(agent_id.to_string())
            .or_insert_with(|| AgentCallStats {
                agent_id: agent_id.to_string(),
                ..AgentCallStats::default()
            });

        entry.calls += 1;
        if !success {
            entry.failures += 1;
        }
        entry.call_times.push(duration.as_millis() as u64);
        if entry.call_times.len() > MAX_TIMING_SAMPLES {
            entry.call_times.remove(0);
        }
        entry.last_call = current_timestamp();
    }

    /// Record a registration
    pub fn agent_registered(&self) {
        self.registrations.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an unregistration
    pub fn agent_unregistered(&self) {
        self.unregistrations.fetch_add(1, Ordering::Relaxed);
    }

    /// Set the current registry size
    pub fn set_registered_agents(&self, count: usize) {
        self.registered_agents.store(count as u64, Ordering::Relaxed);
    }

    /// Reset all metrics (useful for testing)
    pub fn reset(&self) {
        for counter in [
            &self.requests_received,
            &self.requests_in_flight,
            &self.requests_routed,
            &self.requests_routing_only,
            &self.requests_failed,
            &self.multi_agent_requests,
            &self.plans_built,
            &self.plans_failed,
            &self.planned_steps,
            &self.registered_agents,
            &self.registrations,
            &self.unregistrations,
        ] {
            counter.store(0, Ordering::Relaxed);
        }

        self.processing_times
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.agent_stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.uptime_start
            .store(current_timestamp(), Ordering::Relaxed);
    }

    fn processing_time_statistics(&self) -> (f64, f64, f64, f64) {
        let times = self
            .processing_times
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if times.is_empty() {
            return (0.0, 0.0, 0.0, 0.0);
        }

        let mut sorted = times.clone();
        sorted.sort_unstable();
        let avg = sorted.iter().sum::<u64>() as f64 / sorted.len() as f64;

        (
            avg,
            percentile(&sorted, 50.0),
            percentile(&sorted, 95.0),
            percentile(&sorted, 99.0),
        )
    }

    fn agent_statistics(&self) -> AgentMetrics {
        let stats = self
            .agent_stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let mut total_calls = 0;
        let mut total_failures = 0;
        let mut total_time = 0u64;
        let mut timed_calls = 0u64;

        let agents = stats
            .iter()
            .map(|(id, entry)| {
                total_calls += entry.calls;
                total_failures += entry.failures;
                total_time += entry.call_times.iter().sum::<u64>();
                timed_calls += entry.call_times.len() as u64;
                (id.clone(), entry.snapshot())
            })
            .collect();

        AgentMetrics {
            agents,
            total_calls,
            total_failures,
            avg_call_time_ms: if timed_calls > 0 {
                total_time as f64 / timed_calls as f64
            } else {
                0.0
            },
        }
    }

    /// Get complete metrics snapshot
    pub fn get_metrics(&self) -> MetricsSnapshot {
        let now = current_timestamp();
        let (avg, p50, p95, p99) = self.processing_time_statistics();

        MetricsSnapshot {
            requests: RequestMetrics {
                requests_received: self.requests_received.load(Ordering::Relaxed),
                requests_in_flight: self.requests_in_flight.load(Ordering::Relaxed),
                requests_routed: self.requests_routed.load(Ordering::Relaxed),
                requests_routing_only: self.requests_routing_only.load(Ordering::Relaxed),
                requests_failed: self.requests_failed.load(Ordering::Relaxed),
                multi_agent_requests: self.multi_agent_requests.load(Ordering::Relaxed),
                avg_processing_time_ms: avg,
                processing_time_p50_ms: p50,
                processing_time_p95_ms: p95,
                processing_time_p99_ms: p99,
            },
            planning: PlanningMetrics {
                plans_built: self.plans_built.load(Ordering::Relaxed),
                plans_failed: self.plans_failed.load(Ordering::Relaxed),
                planned_steps: self.planned_steps.load(Ordering::Relaxed),
            },
            agents: self.agent_statistics(),
            registry: RegistryMetrics {
                registered_agents: self.registered_agents.load(Ordering::Relaxed),
                registrations: self.registrations.load(Ordering::Relaxed),
                unregistrations: self.unregistrations.load(Ordering::Relaxed),
            },
            uptime_seconds: now.saturating_sub(self.uptime_start.load(Ordering::Relaxed)),
            timestamp: now,
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

// Internal per-agent statistics (with timing data)
#[derive(Debug, Default)]
struct AgentCallStats {
    agent_id: String,
    calls: u64,
    failures: u64,
    call_times: Vec<u64>, // milliseconds
    last_call: u64,
}

impl AgentCallStats {
    fn snapshot(&self) -> AgentCallStatsSnapshot {
        let avg_call_time_ms = if self.call_times.is_empty() {
            0.0
        } else {
            self.call_times.iter().sum::<u64>() as f64 / self.call_times.len() as f64
        };
        let success_rate = if self.calls > 0 {
            (self.calls - self.failures) as f64 / self.calls as f64
        } else {
            0.0
        };

        AgentCallStatsSnapshot {
            agent_id: self.agent_id.clone(),
            calls: self.calls,
            failures: self.failures,
            avg_call_time_ms,
            last_call: self.last_call,
            success_rate,
        }
    }
}

// Public metrics structures
#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub requests: RequestMetrics,
    pub planning: PlanningMetrics,
    pub agents: AgentMetrics,
    pub registry: RegistryMetrics,
    pub uptime_seconds: u64,
    pub timestamp: u64,
}

#[derive(Debug, Serialize)]
pub struct RequestMetrics {
    pub requests_received: u64,
    pub requests_in_flight: u64,
    pub requests_routed: u64,
    pub requests_routing_only: u64,
    pub requests_failed: u64,
    pub multi_agent_requests: u64,
    pub avg_processing_time_ms: f64,
    pub processing_time_p50_ms: f64,
    pub processing_time_p95_ms: f64,
    pub processing_time_p99_ms: f64,
}

#[derive(Debug, Serialize)]
pub struct PlanningMetrics {
    pub plans_built: u64,
    pub plans_failed: u64,
    pub planned_steps: u64,
}

#[derive(Debug, Serialize)]
pub struct AgentMetrics {
    pub agents: HashMap<String, AgentCallStatsSnapshot>,
    pub total_calls: u64,
    pub total_failures: u64,
    pub avg_call_time_ms: f64,
}

#[derive(Debug, Serialize)]
pub struct AgentCallStatsSnapshot {
    pub agent_id: String,
    pub calls: u64,
    pub failures: u64,
    pub avg_call_time_ms: f64,
    pub last_call: u64,
    pub success_rate: f64,
}

#[derive(Debug, Serialize)]
pub struct RegistryMetrics {
    pub registered_agents: u64,
    pub registrations: u64,
    pub unregistrations: u64,
}

// Helper functions
fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn percentile(sorted_data: &[u64], percentile: f64) -> f64 {
    if sorted_data.is_empty() {
        return 0.0;
    }

    let index = (percentile / 100.0) * (sorted_data.len() - 1) as f64;
    let lower = sorted_data[index.floor() as usize] as f64;
    let upper = sorted_data[index.ceil() as usize] as f64;

    lower + (upper - lower) * index.fract()
}
