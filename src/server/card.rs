//! The router's own agent card

use crate::config::RouterConfig;
use crate::protocol::{AgentCapabilities, AgentCard, AgentSkill};

fn router_skill(id: &str, name: &str, description: &str, tags: &[&str]) -> AgentSkill {
    AgentSkill {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        tags: tags.iter().map(|tag| tag.to_string()).collect(),
    }
}

/// Skills the router advertises about itself
pub fn router_skills() -> Vec<AgentSkill> {
    vec![
        router_skill(
            "request_routing",
            "Request Routing",
            "Intelligent request routing to specialized agents",
            &["routing", "orchestration"],
        ),
        router_skill(
            "agent_coordination",
            "Agent Coordination",
            "Multi-agent system coordination and management",
            &["coordination", "management"],
        ),
        router_skill(
            "skill_matching",
            "Skill Matching",
            "Skill-based agent selection and matching",
            &["matching", "selection"],
        ),
        router_skill(
            "confidence_scoring",
            "Confidence Scoring",
            "Confidence scoring for routing decisions",
            &["scoring", "confidence"],
        ),
        router_skill(
            "dynamic_agent_discovery",
            "Dynamic Agent Discovery",
            "Discover and integrate new agents dynamically",
            &["discovery", "integration", "dynamic"],
        ),
        router_skill(
            "semantic_routing",
            "Semantic Routing",
            "Route requests based on semantic understanding",
            &["semantic", "understanding", "context"],
        ),
        router_skill(
            "agent_management",
            "Agent Management",
            "Register, unregister, and list agents via API endpoints",
            &["management", "api", "registration"],
        ),
    ]
}

/// Agent card served at the router's discovery path
pub fn router_agent_card(config: &RouterConfig) -> AgentCard {
    AgentCard {
        name: config.router.name.clone(),
        description: config.router.description.clone(),
        url: config.public_url(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        capabilities: AgentCapabilities {
            streaming: false,
            push_notifications: true,
            state_transition_history: false,
        },
        skills: router_skills(),
        default_input_modes: vec!["text".to_string()],
        default_output_modes: vec!["text".to_string()],
    }
}
