//! Registered agent metadata
//!
//! [`AgentDescriptor`] is the registry's view of a remote agent, resolved from
//! the agent card it publishes.

use crate::protocol::{AgentCapabilities, AgentCard, AgentSkill};
use serde::{Deserialize, Serialize};

/// A named skill offered by an agent
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Skill {
    pub id: String,
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
}

impl From<AgentSkill> for Skill {
    fn from(skill: AgentSkill) -> Self {
        Self {
            id: skill.id,
            name: skill.name,
            description: skill.description,
            tags: skill.tags,
        }
    }
}

/// Information about a registered agent
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentDescriptor {
    /// Registry identity; the declared name unless another endpoint already owns it
    pub id: String,
    /// Name declared in the agent card
    pub name: String,
    /// Endpoint tasks are sent to
    pub endpoint: String,
    pub description: String,
    pub version: String,
    pub skills: Vec<Skill>,
    pub capabilities: AgentCapabilities,
}

impl AgentDescriptor {
    /// Build a descriptor from a fetched card
    ///
    /// The card's own `url` is preferred as the task endpoint; the discovery
    /// endpoint is used when the card leaves it empty.
    pub fn from_card(id: String, card: AgentCard, discovery_endpoint: &str) -> Self {
        let endpoint = if card.url.trim().is_empty() {
            discovery_endpoint.to_string()
        } else {
            card.url
        };

        Self {
            id,
            name: card.name,
            endpoint,
            description: card.description,
            version: card.version,
            skills: card.skills.into_iter().map(Skill::from).collect(),
            capabilities: card.capabilities,
        }
    }

    /// All tags across all skills, in skill order
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.skills
            .iter()
            .flat_map(|skill| skill.tags.iter().map(String::as_str))
    }

    /// Skill names in declaration order
    pub fn skill_names(&self) -> Vec<String> {
        self.skills.iter().map(|skill| skill.name.clone()).collect()
    }

    /// Enabled protocol capability flags
    pub fn enabled_capabilities(&self) -> Vec<String> {
        [
            ("streaming", self.capabilities.streaming),
            ("pushNotifications", self.capabilities.push_notifications),
            (
                "stateTransitionHistory",
                self.capabilities.state_transition_history,
            ),
        ]
        .into_iter()
        .filter(|(_, enabled)| *enabled)
        .map(|(name, _)| name.to_string())
        .collect()
    }

    pub fn summary(&self) -> AgentSummary {
        AgentSummary {
            agent_id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            endpoint: self.endpoint.clone(),
            skills: self
                .skills
                .iter()
                .map(|skill| SkillSummary {
                    name: skill.name.clone(),
                    description: skill.description.clone(),
                })
                .collect(),
            keywords: self.tags().map(str::to_string).collect(),
            capabilities: self.enabled_capabilities(),
        }
    }
}

/// Listing view of an agent
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentSummary {
    pub agent_id: String,
    pub name: String,
    pub description: String,
    pub endpoint: String,
    pub skills: Vec<SkillSummary>,
    pub keywords: Vec<String>,
    pub capabilities: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SkillSummary {
    pub name: String,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::mocks::{agent_card, math_agent_card, skill};

    #[test]
    fn test_descriptor_prefers_card_url() {
        let card = math_agent_card("http://math.internal:8002/");
        let descriptor =
            AgentDescriptor::from_card("MathAgent".into(), card, "http://localhost:8002");

        assert_eq!(descriptor.endpoint, "http://math.internal:8002/");
        assert_eq!(descriptor.skill_names(), vec!["arithmetic_calculation"]);
    }

    #[test]
    fn test_descriptor_falls_back_to_discovery_endpoint() {
        let card = agent_card("Bare", "", "", vec![]);
        let descriptor = AgentDescriptor::from_card("Bare".into(), card, "http://localhost:9000");

        assert_eq!(descriptor.endpoint, "http://localhost:9000");
    }

    #[test]
    fn test_summary_flattens_tags_and_flags() {
        let mut card = agent_card(
            "Ops",
            "http://ops",
            "Deploys apps",
            vec![
                skill("sync", "Sync an application", &["argocd", "sync"]),
                skill("status", "Application status", &["health"]),
            ],
        );
        card.capabilities.streaming = true;
        card.capabilities.state_transition_history = true;

        let summary = AgentDescriptor::from_card("Ops".into(), card, "http://ops").summary();

        assert_eq!(summary.keywords, vec!["argocd", "sync", "health"]);
        assert_eq!(
            summary.capabilities,
            vec!["streaming", "stateTransitionHistory"]
        );
        assert_eq!(summary.skills.len(), 2);
        assert_eq!(summary.skills[1].description, "Application status");
    }
}
