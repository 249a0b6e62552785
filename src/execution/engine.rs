//! Plan execution
//!
//! Runs an [`ExecutionPlan`] one step at a time. Each step's task text carries
//! the original request and the outputs of the steps it depends on; each
//! output is stored under the step's output key. The first error stops the
//! plan and nothing is retried.

use crate::agent::discovery::RegistrySnapshot;
use crate::error::RouterError;
use crate::execution::cancellation::CancellationFlag;
use crate::observability::metrics::metrics;
use crate::routing::planner::{ExecutionPlan, ExecutionStep};
use crate::step_span;
use crate::transport::{forward_request, PollPolicy, Transport};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::time::Instant;
use tracing::{info, warn, Instrument};

/// Step outputs keyed by output key, in insertion order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntermediateResults {
    entries: Vec<(String, String)>,
}

impl IntermediateResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a result; keys are written once
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        if self.get(&key).is_none() {
            self.entries.push((key, value.into()));
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value.as_str())
    }

    /// Most recently stored result
    pub fn last(&self) -> Option<&str> {
        self.entries.last().map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for IntermediateResults {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Record of a completed step
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct StepRecord {
    pub step_id: String,
    pub agent_id: String,
    pub agent_name: String,
    pub task: String,
    pub result: String,
}

/// Result of running a plan
#[derive(Debug)]
pub struct ExecutionOutcome {
    /// Aggregated response text
    pub response: String,
    pub results: IntermediateResults,
    pub steps: Vec<StepRecord>,
    /// Error that stopped the plan, if any
    pub error: Option<RouterError>,
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn completed_steps(&self) -> usize {
        self.steps.len()
    }
}

/// Build the text sent to an agent for one step
///
/// Without available dependency results the task reads
/// `Original request: …\nTask: …`; otherwise the dependency outputs are listed
/// under `Previous results:` and the task follows as `Your task: …`.
pub fn build_task_with_dependencies(
    task_description: &str,
    dependencies: &[String],
    results: &IntermediateResults,
    original_request: &str,
) -> String {
    let context: Vec<String> = dependencies
        .iter()
        .filter_map(|key| results.get(key).map(|value| format!("{key}: {value}")))
        .collect();

    if context.is_empty() {
        format!("Original request: {original_request}\nTask: {task_description}")
    } else {
        format!(
            "Original request: {original_request}\nPrevious results:\n{}\n\n\
             Your task: {task_description}",
            context.join("\n")
        )
    }
}

/// Sequential plan executor
#[derive(Debug, Clone, Default)]
pub struct ExecutionEngine {
    policy: PollPolicy,
}

impl ExecutionEngine {
    pub fn new(policy: PollPolicy) -> Self {
        Self { policy }
    }

    /// Run `plan` to completion, first error, or cancellation
    pub async fn execute<T: Transport + ?Sized>(
        &self,
        transport: &T,
        plan: &ExecutionPlan,
        snapshot: &RegistrySnapshot,
        original_request: &str,
        cancel: &CancellationFlag,
    ) -> ExecutionOutcome {
        let mut results = IntermediateResults::new();
        let mut records: Vec<StepRecord> = Vec::with_capacity(plan.len());
        let mut cursor = 0;

        let error = loop {
            let Some(step) = plan.steps().get(cursor) else {
                break None;
            };

            if cancel.is_cancelled() {
                warn!(completed_steps = cursor, "Plan execution cancelled");
                break Some(RouterError::Cancelled {
                    completed_steps: cursor,
                });
            }

            match self
                .run_step(transport, step, cursor, snapshot, &results, original_request)
                .await
            {
                Ok(record) => {
                    results.insert(step.output_key.clone(), record.result.clone());
                    records.push(record);
                    cursor += 1;
                }
                Err(e) => break Some(e),
            }
        };

        let response = aggregate(plan, &records, &results, error.as_ref());

        ExecutionOutcome {
            response,
            results,
            steps: records,
            error,
        }
    }

    async fn run_step<T: Transport + ?Sized>(
        &self,
        transport: &T,
        step: &ExecutionStep,
        index: usize,
        snapshot: &RegistrySnapshot,
        results: &IntermediateResults,
        original_request: &str,
    ) -> Result<StepRecord, RouterError> {
        let agent = snapshot.get(&step.agent_id).ok_or_else(|| {
            RouterError::planning(format!("Agent {} is not registered", step.agent_id))
        })?;

        let task = build_task_with_dependencies(
            &step.task_description,
            &step.input_dependencies,
            results,
            original_request,
        );

        let span = step_span!(step_id = %step.step_id, agent_id = %agent.id);
        let started = Instant::now();
        let outcome = forward_request(transport, &agent.endpoint, &task, &self.policy)
            .instrument(span)
            .await;

        match outcome {
            Ok(result) => {
                metrics().step_executed(&agent.id, started.elapsed(), true);
                info!(
                    step_id = %step.step_id,
                    agent_id = %agent.id,
                    "Step completed"
                );
                Ok(StepRecord {
                    step_id: step.step_id.clone(),
                    agent_id: agent.id.clone(),
                    agent_name: agent.name.clone(),
                    task: step.task_description.clone(),
                    result,
                })
            }
            Err(source) => {
                metrics().step_executed(&agent.id, started.elapsed(), false);
                warn!(
                    step_id = %step.step_id,
                    agent_id = %agent.id,
                    error = %source,
                    "Step failed"
                );
                Err(RouterError::step_execution(index, agent.id.clone(), source))
            }
        }
    }
}

fn step_lines(records: &[StepRecord]) -> Vec<String> {
    records
        .iter()
        .enumerate()
        .map(|(i, record)| format!("Step {} ({}): {}", i + 1, record.agent_name, record.result))
        .collect()
}

/// Aggregate step outputs into the final response text
fn aggregate(
    plan: &ExecutionPlan,
    records: &[StepRecord],
    results: &IntermediateResults,
    error: Option<&RouterError>,
) -> String {
    if let Some(error) = error {
        let mut response = format!("Multi-agent execution failed: {error}");
        if !records.is_empty() {
            response.push_str("\n\nCompleted steps:\n");
            response.push_str(&step_lines(records).join("\n"));
        }
        return response;
    }

    if plan.len() > 1 {
        let mut parts = vec!["Multi-Agent Collaboration Result:\n".to_string()];
        parts.extend(step_lines(records));
        if let Some(final_result) = results.last() {
            parts.push(format!("\nFinal Answer: {final_result}"));
        }
        return parts.join("\n");
    }

    match records.first() {
        Some(record) => format!("Routed to {} → {}", record.agent_name, record.result),
        None => "No results generated".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::discovery::AgentRegistry;
    use crate::routing::decomposer::TaskRequirement;
    use crate::routing::planner::build_plan;
    use crate::testing::mocks::{currency_agent_card, math_agent_card, MockTransport, ScriptedReply};
    use crate::transport::TransportError;
    use std::time::Duration;

    fn registry() -> AgentRegistry {
        let registry = AgentRegistry::new();
        registry.register_descriptor("http://math", math_agent_card("http://math"));
        registry.register_descriptor("http://fx", currency_agent_card("http://fx"));
        registry
    }

    fn engine() -> ExecutionEngine {
        ExecutionEngine::new(PollPolicy::new(Duration::from_millis(1), 3))
    }

    fn two_step_plan(snapshot: &RegistrySnapshot) -> ExecutionPlan {
        let requirements = vec![
            TaskRequirement::step(0, "convert", "convert 100 usd to eur then times 2"),
            TaskRequirement::step(1, "times", "convert 100 usd to eur then times 2"),
        ];
        build_plan(&requirements, snapshot).unwrap()
    }

    #[test]
    fn test_task_without_dependencies() {
        let task =
            build_task_with_dependencies("add numbers", &[], &IntermediateResults::new(), "2+3");
        assert_eq!(task, "Original request: 2+3\nTask: add numbers");
    }

    #[test]
    fn test_task_with_dependencies() {
        let mut results = IntermediateResults::new();
        results.insert("step_0_output", "92 EUR");

        let task = build_task_with_dependencies(
            "double it",
            &["step_0_output".to_string()],
            &results,
            "convert then double",
        );

        assert_eq!(
            task,
            "Original request: convert then double\nPrevious results:\n\
             step_0_output: 92 EUR\n\nYour task: double it"
        );
    }

    #[test]
    fn test_missing_dependency_falls_back_to_plain_task() {
        let task = build_task_with_dependencies(
            "double it",
            &["step_0_output".to_string()],
            &IntermediateResults::new(),
            "req",
        );
        assert_eq!(task, "Original request: req\nTask: double it");
    }

    #[test]
    fn test_intermediate_results_are_append_only() {
        let mut results = IntermediateResults::new();
        results.insert("a", "1");
        results.insert("b", "2");
        results.insert("a", "overwritten");

        assert_eq!(results.get("a"), Some("1"));
        assert_eq!(results.last(), Some("2"));
        assert_eq!(
            serde_json::to_string(&results).unwrap(),
            r#"{"a":"1","b":"2"}"#
        );
    }

    #[tokio::test]
    async fn test_two_step_plan_threads_results() {
        let registry = registry();
        let snapshot = registry.snapshot();
        let plan = two_step_plan(&snapshot);
        let transport = MockTransport::new()
            .with_reply("http://fx", ScriptedReply::Immediate("92 EUR".into()))
            .with_reply("http://math", ScriptedReply::Immediate("184 EUR".into()));

        let outcome = engine()
            .execute(
                &transport,
                &plan,
                &snapshot,
                "convert 100 usd to eur then times 2",
                &CancellationFlag::new(),
            )
            .await;

        assert!(outcome.is_success());
        assert_eq!(outcome.results.get("step_0_output"), Some("92 EUR"));
        assert_eq!(outcome.results.get("step_1_output"), Some("184 EUR"));
        assert_eq!(
            outcome.response,
            "Multi-Agent Collaboration Result:\n\n\
             Step 1 (CurrencyAgent): 92 EUR\nStep 2 (MathAgent): 184 EUR\n\n\
             Final Answer: 184 EUR"
        );

        let sent = transport.get_sent_requests().await;
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].0, "http://fx");
        assert!(sent[1].1.contains("Previous results:\nstep_0_output: 92 EUR"));
    }

    #[tokio::test]
    async fn test_failed_step_stops_plan_and_keeps_results() {
        let registry = registry();
        let snapshot = registry.snapshot();
        let plan = two_step_plan(&snapshot);
        let transport = MockTransport::new()
            .with_reply("http://fx", ScriptedReply::Immediate("92 EUR".into()))
            .with_unreachable("http://math");

        let outcome = engine()
            .execute(&transport, &plan, &snapshot, "req", &CancellationFlag::new())
            .await;

        assert!(!outcome.is_success());
        assert_eq!(outcome.completed_steps(), 1);
        assert!(matches!(
            outcome.error,
            Some(RouterError::StepExecution { step_index: 1, .. })
        ));
        assert!(outcome
            .response
            .starts_with("Multi-agent execution failed: Step 1 failed:"));
        assert!(outcome.response.contains("Step 1 (CurrencyAgent): 92 EUR"));
    }

    #[tokio::test]
    async fn test_first_step_failure_sends_nothing_else() {
        let registry = registry();
        let snapshot = registry.snapshot();
        let plan = two_step_plan(&snapshot);
        let transport = MockTransport::new().with_reply(
            "http://fx",
            ScriptedReply::Fail(TransportError::Http {
                status: 503,
                body: "unavailable".into(),
            }),
        );

        let outcome = engine()
            .execute(&transport, &plan, &snapshot, "req", &CancellationFlag::new())
            .await;

        assert_eq!(outcome.completed_steps(), 0);
        assert_eq!(transport.get_sent_requests().await.len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_plan_runs_no_steps() {
        let registry = registry();
        let snapshot = registry.snapshot();
        let plan = two_step_plan(&snapshot);
        let transport = MockTransport::new();
        let cancel = CancellationFlag::new();
        cancel.cancel();

        let outcome = engine()
            .execute(&transport, &plan, &snapshot, "req", &cancel)
            .await;

        assert!(matches!(
            outcome.error,
            Some(RouterError::Cancelled { completed_steps: 0 })
        ));
        assert!(transport.get_sent_requests().await.is_empty());
    }

    #[tokio::test]
    async fn test_single_step_plan_response() {
        let registry = registry();
        let snapshot = registry.snapshot();
        let requirement = TaskRequirement::single("times", "what is 3 times 4");
        let plan = build_plan(&[requirement], &snapshot).unwrap();
        let transport =
            MockTransport::new().with_reply("http://math", ScriptedReply::Immediate("12".into()));

        let outcome = engine()
            .execute(&transport, &plan, &snapshot, "what is 3 times 4", &CancellationFlag::new())
            .await;

        assert_eq!(outcome.response, "Routed to MathAgent → 12");
    }
}
