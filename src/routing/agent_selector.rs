//! Single-agent selection
//!
//! The Analyze stage of single-agent routing: every registered agent is scored
//! against the request and the strictly best one is selected. Ties keep the
//! agent registered first.

use crate::agent::descriptor::AgentDescriptor;
use crate::agent::discovery::RegistrySnapshot;
use crate::error::RouterError;
use crate::routing::scoring::{score_agent, AgentScore};
use tracing::{debug, info};

/// Confidence reported when no agent matched and the first one is used
pub const DEFAULT_AGENT_CONFIDENCE: f64 = 0.3;

/// Score at which confidence saturates
const CONFIDENCE_SCALE: f64 = 5.0;

/// Outcome of the Analyze stage
#[derive(Debug, Clone, PartialEq)]
pub struct AgentSelection {
    pub agent: AgentDescriptor,
    pub confidence: f64,
    pub reasoning: String,
    pub matched_skills: Vec<String>,
    pub matched_keywords: Vec<String>,
    /// Scores of every agent in registry order
    pub scores: Vec<AgentScore>,
}

/// Map a raw score to a confidence in `[0, 1]`
pub fn confidence_from_score(score: f64) -> f64 {
    if score.is_nan() {
        return 0.0;
    }
    (score / CONFIDENCE_SCALE).clamp(0.0, 1.0)
}

/// Pick the best agent for `request`
///
/// Falls back to the first registered agent with confidence 0.3 when nothing
/// scores above zero. Fails only when the registry is empty.
pub fn select_agent(
    request: &str,
    snapshot: &RegistrySnapshot,
) -> Result<AgentSelection, RouterError> {
    let agents = snapshot.agents();
    let Some(first) = agents.first() else {
        return Err(RouterError::NoAgentsAvailable);
    };

    let scores: Vec<AgentScore> = agents
        .iter()
        .map(|agent| score_agent(request, agent))
        .collect();

    let mut best: Option<usize> = None;
    let mut best_score = 0.0;
    for (position, score) in scores.iter().enumerate() {
        debug!(agent_id = %score.agent_id, score = score.score, "Scored agent");
        if score.score > best_score {
            best_score = score.score;
            best = Some(position);
        }
    }

    let selection = match best {
        Some(position) => {
            let agent = agents[position].clone();
            let score = &scores[position];
            AgentSelection {
                reasoning: reasoning(&agent, &score.matched_keywords, &score.matched_skills),
                confidence: confidence_from_score(best_score),
                matched_skills: score.matched_skills.clone(),
                matched_keywords: score.matched_keywords.clone(),
                agent,
                scores,
            }
        }
        None => AgentSelection {
            reasoning: reasoning(first, &[], &[]),
            confidence: DEFAULT_AGENT_CONFIDENCE,
            matched_skills: Vec::new(),
            matched_keywords: Vec::new(),
            agent: first.clone(),
            scores,
        },
    };

    info!(
        agent_id = %selection.agent.id,
        confidence = selection.confidence,
        "Selected agent"
    );
    Ok(selection)
}

fn reasoning(agent: &AgentDescriptor, keywords: &[String], skills: &[String]) -> String {
    let mut parts = vec![format!("Selected {}", agent.name)];

    if !keywords.is_empty() {
        parts.push(format!("based on keywords: {}", keywords.join(", ")));
    }

    if !skills.is_empty() {
        let lead = if keywords.is_empty() { "based on" } else { "and" };
        parts.push(format!("{lead} skills: {}", skills.join(", ")));
    }

    if keywords.is_empty() && skills.is_empty() {
        parts.push("using default agent (no specific matches found)".to_string());
    }

    parts.join(" ")
}
