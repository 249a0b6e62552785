//! Execution planning
//!
//! Assigns an agent to every [`TaskRequirement`] and lays the steps out in a
//! linear plan where each step may read the outputs of all earlier steps.
//! Planning is local; no agent is contacted.

use crate::agent::discovery::RegistrySnapshot;
use crate::error::RouterError;
use crate::routing::decomposer::TaskRequirement;
use crate::routing::scoring::score_agent_for_capability;
use serde::Serialize;
use tracing::{debug, info};

/// One step of an execution plan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionStep {
    /// `step_<i>`
    pub step_id: String,
    pub agent_id: String,
    pub task_description: String,
    /// Output keys of all earlier steps, in order
    pub input_dependencies: Vec<String>,
    /// `step_<i>_output`
    pub output_key: String,
    pub required_capabilities: Vec<String>,
}

/// Ordered, immutable sequence of steps
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionPlan {
    steps: Vec<ExecutionStep>,
}

impl ExecutionPlan {
    pub fn steps(&self) -> &[ExecutionStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Agent ids in step order
    pub fn agent_ids(&self) -> Vec<&str> {
        self.steps.iter().map(|step| step.agent_id.as_str()).collect()
    }
}

/// Output key of step `index`
pub fn output_key(index: usize) -> String {
    format!("step_{index}_output")
}

/// Resolve the agent best suited for `capability`
///
/// An exact index hit picks the best-scoring owner (the first owner when all
/// score zero). Otherwise the first indexed keyword that contains or is
/// contained in the capability is used, and failing that the first registered
/// agent. `None` only for an empty registry.
pub fn find_best_agent_for_capability(
    capability: &str,
    snapshot: &RegistrySnapshot,
) -> Option<String> {
    let index = snapshot.index();
    let capability = capability.to_lowercase();

    if let Some(candidates) = index.agents_for(&capability) {
        let mut best: Option<&str> = None;
        let mut best_score = 0.0;
        for candidate in candidates {
            let Some(agent) = snapshot.get(candidate) else {
                continue;
            };
            let score = score_agent_for_capability(agent, &capability);
            if score > best_score {
                best_score = score;
                best = Some(candidate);
            }
        }

        if let Some(agent_id) = best.or_else(|| candidates.first().map(String::as_str)) {
            debug!(
                capability = %capability,
                agent_id = %agent_id,
                score = best_score,
                "Exact capability match"
            );
            return Some(agent_id.to_string());
        }
    }

    let partial = index.iter().find(|(keyword, _)| {
        !capability.is_empty()
            && (keyword.contains(capability.as_str()) || capability.contains(keyword))
    });
    if let Some((keyword, owners)) = partial {
        if let Some(agent_id) = owners.first() {
            debug!(
                capability = %capability,
                keyword = %keyword,
                agent_id = %agent_id,
                "Partial capability match"
            );
            return Some(agent_id.clone());
        }
    }

    snapshot.agents().first().map(|agent| {
        debug!(
            capability = %capability,
            agent_id = %agent.id,
            "No capability match, using first agent"
        );
        agent.id.clone()
    })
}

/// Build a linear plan for `requirements`
///
/// Step `i` depends on the outputs of steps `0..i`.
pub fn build_plan(
    requirements: &[TaskRequirement],
    snapshot: &RegistrySnapshot,
) -> Result<ExecutionPlan, RouterError> {
    if snapshot.is_empty() {
        return Err(RouterError::planning("No agents registered"));
    }
    if requirements.is_empty() {
        return Err(RouterError::planning("No task requirements to plan"));
    }

    let mut steps = Vec::with_capacity(requirements.len());
    for (i, requirement) in requirements.iter().enumerate() {
        let agent_id = find_best_agent_for_capability(&requirement.capability_type, snapshot)
            .ok_or_else(|| {
                RouterError::planning(format!(
                    "No agent found for capability: {}",
                    requirement.capability_type
                ))
            })?;

        steps.push(ExecutionStep {
            step_id: format!("step_{i}"),
            agent_id,
            task_description: requirement.description.clone(),
            input_dependencies: (0..i).map(output_key).collect(),
            output_key: output_key(i),
            required_capabilities: vec![requirement.capability_type.clone()],
        });
    }

    let plan = ExecutionPlan { steps };
    info!(steps = plan.len(), agents = ?plan.agent_ids(), "Execution plan built");
    Ok(plan)
}
