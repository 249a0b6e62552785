//! Request scoring heuristics
//!
//! Pure functions scoring a free-text request against an agent, against a
//! capability keyword, and an agent against a capability. Scores are
//! non-negative and grow with the number of matching keyword occurrences.

use crate::agent::capability::{normalize_skill_name, skill_keywords};
use crate::agent::descriptor::AgentDescriptor;
use serde::Serialize;

/// Words too common to discriminate between capabilities
pub const GENERIC_TERMS: &[&str] = &[
    "what", "is", "the", "and", "for", "with", "can", "will", "get", "set", "do", "make", "use",
];

const OPERATOR_SYMBOLS: &[char] = &['+', '-', '*', '/', '=', '<', '>'];
const OPERATION_TERMS: &[&str] = &["operation", "calculation", "compute", "process"];

const TAG_MATCH: f64 = 1.0;
const SKILL_MATCH: f64 = 1.5;
const GENERIC_SCORE: f64 = 0.1;
const SYMBOL_MATCH: f64 = 3.0;
const SUBSTRING_MATCH: f64 = 2.0;
const SHORT_WORD_MATCH: f64 = 1.0;
const LONG_WORD_MATCH: f64 = 1.5;
const REVERSE_WORD_MATCH: f64 = 0.3;
const OPERATOR_BOOST: f64 = 1.0;

/// Score of one agent for a request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentScore {
    pub agent_id: String,
    pub score: f64,
    /// Skill names whose keywords appear in the request
    pub matched_skills: Vec<String>,
    /// Skill tags found in the request, as declared
    pub matched_keywords: Vec<String>,
}

/// Score how well `agent` fits `request`
///
/// +1.0 per skill tag found in the request, +1.5 per skill with any keyword
/// found in the request. Matching is case-insensitive substring matching.
pub fn score_agent(request: &str, agent: &AgentDescriptor) -> AgentScore {
    let request = request.to_lowercase();
    let mut score = 0.0;
    let mut matched_keywords = Vec::new();
    let mut matched_skills = Vec::new();

    for tag in agent.tags() {
        if !tag.is_empty() && request.contains(&tag.to_lowercase()) {
            score += TAG_MATCH;
            matched_keywords.push(tag.to_string());
        }
    }

    for skill in &agent.skills {
        if skill_keywords(skill)
            .iter()
            .any(|keyword| request.contains(keyword.as_str()))
        {
            score += SKILL_MATCH;
            matched_skills.push(skill.name.clone());
        }
    }

    AgentScore {
        agent_id: agent.id.clone(),
        score,
        matched_skills,
        matched_keywords,
    }
}

fn is_generic(word: &str) -> bool {
    GENERIC_TERMS.contains(&word)
}

/// Score how strongly `request` calls for `capability`
pub fn score_capability(request: &str, capability: &str) -> f64 {
    let request = request.to_lowercase();
    let capability = capability.to_lowercase();

    if capability.is_empty() {
        return 0.0;
    }
    if is_generic(&capability) {
        return GENERIC_SCORE;
    }

    let mut score = 0.0;

    if capability.chars().count() == 1 && request.contains(&capability) {
        score += SYMBOL_MATCH;
    }

    if request.contains(&capability) {
        let specificity = (capability.chars().count() as f64 / 10.0).min(1.0);
        score += SUBSTRING_MATCH + specificity;
    }

    for word in capability.split_whitespace() {
        if word.len() > 2 && !is_generic(word) && request.contains(word) {
            score += if word.len() > 4 {
                LONG_WORD_MATCH
            } else {
                SHORT_WORD_MATCH
            };
        }
    }

    for word in request.split_whitespace() {
        if word.len() > 3 && !is_generic(word) && capability.contains(word) {
            score += REVERSE_WORD_MATCH;
        }
    }

    if request.contains(OPERATOR_SYMBOLS)
        && OPERATION_TERMS.iter().any(|term| capability.contains(term))
    {
        score += OPERATOR_BOOST;
    }

    score
}

/// Score how well `agent` serves `capability`
///
/// +2.0 when a skill name contains the capability, +1.5 per tag containing or
/// contained in it, +1.0 when a skill description mentions it.
pub fn score_agent_for_capability(agent: &AgentDescriptor, capability: &str) -> f64 {
    let capability = capability.to_lowercase();
    if capability.is_empty() {
        return 0.0;
    }

    let mut score = 0.0;
    for skill in &agent.skills {
        let name = skill.name.to_lowercase();
        if name.contains(&capability) || normalize_skill_name(&name).contains(&capability) {
            score += 2.0;
        }

        for tag in skill.tags.iter().map(|tag| tag.to_lowercase()) {
            if !tag.is_empty() && (tag.contains(&capability) || capability.contains(&tag)) {
                score += 1.5;
            }
        }

        if skill.description.to_lowercase().contains(&capability) {
            score += 1.0;
        }
    }
    score
}
