//! Request decomposition
//!
//! A [`Decomposer`] turns a request into ordered [`TaskRequirement`]s. The
//! default [`PatternDecomposer`] is deterministic: it ranks every indexed
//! capability against the request and, when the request spans agents with
//! disjoint capabilities, emits one requirement per domain.

use crate::agent::capability::CapabilityIndex;
use crate::config::PlannerConfig;
use crate::error::RouterError;
use crate::routing::scoring::score_capability;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// Capability used when nothing more specific is known
pub const GENERAL_CAPABILITY: &str = "general";

/// Phrases that chain sub-tasks together
pub const CONNECTIVES: &[&str] = &[
    "and then",
    "then",
    "after",
    "followed by",
    "next",
    "and also",
    "combined with",
    "together with",
];

static CONNECTIVE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    let alternatives = CONNECTIVES
        .iter()
        .map(|phrase| regex::escape(phrase))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{alternatives})\b")).expect("static regex is valid")
});

/// How many top-ranked capabilities are checked for a cross-domain pair
const CROSS_DOMAIN_WINDOW: usize = 5;
const CROSS_DOMAIN_PRIMARY: f64 = 1.0;
const CROSS_DOMAIN_SECONDARY: f64 = 0.5;

/// One unit of work a request needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRequirement {
    pub capability_type: String,
    pub description: String,
    pub input_format: String,
    pub output_format: String,
    /// Higher runs earlier
    pub priority: f64,
}

impl TaskRequirement {
    /// Requirement that hands the whole request to one capability
    pub fn single(capability: impl Into<String>, request: &str) -> Self {
        Self {
            capability_type: capability.into(),
            description: request.to_string(),
            input_format: "user request".to_string(),
            output_format: "processed response".to_string(),
            priority: 1.0,
        }
    }

    /// Requirement for step `position` of a multi-agent plan
    pub fn step(position: usize, capability: &str, request: &str) -> Self {
        let (description, input_format) = if position == 0 {
            (
                format!("Process the {capability} components from this request: {request}"),
                "user request",
            )
        } else {
            (
                format!(
                    "Use the previous results to handle the {capability} aspects \
                     and complete the request"
                ),
                "previous step output",
            )
        };

        Self {
            capability_type: capability.to_string(),
            description,
            input_format: input_format.to_string(),
            output_format: format!("{capability} result"),
            priority: 1.0 - 0.1 * position as f64,
        }
    }
}

/// A capability keyword with its score for a request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedCapability {
    pub capability: String,
    pub score: f64,
}

/// Score every indexed capability, keep positive ones, best first
///
/// The sort is stable, so equal scores keep the index's keyword order.
pub fn rank_capabilities(request: &str, index: &CapabilityIndex) -> Vec<RankedCapability> {
    let mut ranked: Vec<RankedCapability> = index
        .keywords()
        .map(|capability| RankedCapability {
            capability: capability.to_string(),
            score: score_capability(request, capability),
        })
        .filter(|ranked| ranked.score > 0.0)
        .collect();

    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked
}

/// Whether the request contains a chaining phrase such as "and then"
pub fn has_connective(request: &str) -> bool {
    CONNECTIVE_PATTERN.is_match(request)
}

fn agents_of<'a>(index: &'a CapabilityIndex, capability: &str) -> HashSet<&'a str> {
    index
        .agents_for(capability)
        .unwrap_or_default()
        .iter()
        .map(String::as_str)
        .collect()
}

/// Whether `request` needs more than one agent
///
/// True when it contains a connective, or when two of the top five ranked
/// capabilities (the first above 1.0, the second above 0.5) belong to disjoint
/// agent sets.
pub fn is_multi_step(request: &str, index: &CapabilityIndex) -> bool {
    is_multi_step_ranked(request, &rank_capabilities(request, index), index)
}

fn is_multi_step_ranked(
    request: &str,
    ranked: &[RankedCapability],
    index: &CapabilityIndex,
) -> bool {
    if has_connective(request) {
        return true;
    }

    let window = &ranked[..ranked.len().min(CROSS_DOMAIN_WINDOW)];
    window.iter().enumerate().any(|(i, first)| {
        window[i + 1..].iter().any(|second| {
            first.score > CROSS_DOMAIN_PRIMARY
                && second.score > CROSS_DOMAIN_SECONDARY
                && agents_of(index, &first.capability)
                    .is_disjoint(&agents_of(index, &second.capability))
        })
    })
}

/// Pluggable request decomposition
#[async_trait]
pub trait Decomposer: Send + Sync {
    /// Split `request` into ordered requirements using the current capabilities
    async fn decompose(
        &self,
        request: &str,
        index: &CapabilityIndex,
    ) -> Result<Vec<TaskRequirement>, RouterError>;
}

/// Deterministic keyword-based decomposer
#[derive(Debug, Clone, Default)]
pub struct PatternDecomposer {
    config: PlannerConfig,
}

impl PatternDecomposer {
    pub fn new(config: PlannerConfig) -> Self {
        Self { config }
    }

    /// Synchronous decomposition; never fails
    pub fn decompose_request(
        &self,
        request: &str,
        index: &CapabilityIndex,
    ) -> Vec<TaskRequirement> {
        let Some(first_keyword) = index.keywords().next() else {
            return vec![TaskRequirement::single(GENERAL_CAPABILITY, request)];
        };

        let ranked = rank_capabilities(request, index);
        let Some(best) = ranked.first() else {
            return vec![TaskRequirement::single(first_keyword, request)];
        };

        if !is_multi_step_ranked(request, &ranked, index) {
            return vec![TaskRequirement::single(&best.capability, request)];
        }

        let selected = self.select_cross_domain(&ranked, index);
        debug!(
            capabilities = ?selected,
            "Cross-domain capabilities selected"
        );

        if selected.len() < 2 {
            return vec![TaskRequirement::single(&best.capability, request)];
        }

        selected
            .iter()
            .enumerate()
            .map(|(position, capability)| TaskRequirement::step(position, capability, request))
            .collect()
    }

    fn select_cross_domain<'a>(
        &self,
        ranked: &'a [RankedCapability],
        index: &CapabilityIndex,
    ) -> Vec<&'a str> {
        // A weak primary never anchors a plan
        let Some(first) = ranked
            .first()
            .filter(|first| first.score > self.config.primary_threshold)
        else {
            return Vec::new();
        };

        let mut selected = vec![first.capability.as_str()];
        let mut used_agents: HashSet<&str> = agents_of(index, &first.capability);

        for candidate in ranked.iter().skip(1) {
            if selected.len() >= self.config.max_steps {
                break;
            }
            if candidate.score <= self.config.secondary_threshold {
                continue;
            }

            let owners = agents_of(index, &candidate.capability);
            if owners.is_empty() || !owners.is_disjoint(&used_agents) {
                continue;
            }

            selected.push(candidate.capability.as_str());
            used_agents.extend(owners);
        }

        selected
    }
}

#[async_trait]
impl Decomposer for PatternDecomposer {
    async fn decompose(
        &self,
        request: &str,
        index: &CapabilityIndex,
    ) -> Result<Vec<TaskRequirement>, RouterError> {
        Ok(self.decompose_request(request, index))
    }
}
