//! Capability keyword extraction and indexing
//!
//! Capabilities are derived from agent metadata by pure functions: skill names,
//! tags and description words become lowercase keywords, and the
//! [`CapabilityIndex`] maps each keyword to the agents offering it. The index is
//! rebuilt from scratch whenever the registry changes.

use crate::agent::descriptor::{AgentDescriptor, Skill};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Words of at least three word characters
static MEANINGFUL_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\w{3,}\b").expect("static regex is valid"));

/// Filler words skipped when mining descriptions
pub const DESCRIPTION_STOPWORDS: &[&str] =
    &["the", "and", "for", "with", "this", "that", "can", "will"];

/// Keywords too generic to route on
pub const CAPABILITY_STOPLIST: &[&str] = &[
    "agent",
    "service",
    "system",
    "manage",
    "handle",
    "process",
    "operation",
    "data",
];

const SKILL_DESCRIPTION_WORDS: usize = 10;
const AGENT_DESCRIPTION_WORDS: usize = 5;
const SKILL_KEYWORD_DESCRIPTION_WORDS: usize = 3;

/// Lowercase a skill name and turn `_`/`-` separators into spaces
pub fn normalize_skill_name(name: &str) -> String {
    name.to_lowercase().replace(['_', '-'], " ")
}

/// Lowercased words of three or more word characters, in text order
pub fn meaningful_words(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    MEANINGFUL_WORD
        .find_iter(&lower)
        .map(|m| m.as_str().to_string())
        .collect()
}

fn description_words(text: &str, limit: usize) -> impl Iterator<Item = String> {
    meaningful_words(text)
        .into_iter()
        .take(limit)
        .filter(|word| !DESCRIPTION_STOPWORDS.contains(&word.as_str()))
}

/// Capability keywords contributed by one skill
pub fn skill_capabilities(skill: &Skill) -> BTreeSet<String> {
    let mut capabilities = BTreeSet::new();

    let name = normalize_skill_name(&skill.name);
    capabilities.extend(
        name.split_whitespace()
            .filter(|word| word.len() > 2)
            .map(str::to_string),
    );
    if !name.trim().is_empty() {
        capabilities.insert(name);
    }

    capabilities.extend(
        skill
            .tags
            .iter()
            .filter(|tag| tag.len() > 2)
            .map(|tag| tag.to_lowercase()),
    );

    capabilities.extend(description_words(&skill.description, SKILL_DESCRIPTION_WORDS));
    capabilities
}

/// Capability keywords of an agent: every skill plus the agent's name and description
pub fn agent_capabilities(agent: &AgentDescriptor) -> BTreeSet<String> {
    let mut capabilities: BTreeSet<String> =
        agent.skills.iter().flat_map(skill_capabilities).collect();

    capabilities.extend(meaningful_words(&agent.name));
    capabilities.extend(description_words(
        &agent.description,
        AGENT_DESCRIPTION_WORDS,
    ));
    capabilities
}

/// Keywords that signal a request needs this particular skill
///
/// Every tag, the normalized name and its longer words, then the first three
/// description words longer than two characters.
pub fn skill_keywords(skill: &Skill) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();
    let mut push = |keyword: String| {
        if !keyword.is_empty() && !keywords.contains(&keyword) {
            keywords.push(keyword);
        }
    };

    for tag in &skill.tags {
        push(tag.to_lowercase());
    }

    let name = normalize_skill_name(&skill.name);
    for word in name.split_whitespace().filter(|word| word.len() > 2) {
        push(word.to_string());
    }
    push(name.trim().to_string());

    skill
        .description
        .split_whitespace()
        .take(SKILL_KEYWORD_DESCRIPTION_WORDS)
        .map(|word| {
            word.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|word| word.len() > 2)
        .for_each(&mut push);

    keywords
}

/// Build the capability index for `agents`
pub fn build_capability_index(agents: &[AgentDescriptor]) -> CapabilityIndex {
    CapabilityIndex::build(agents)
}

/// Keyword to agent-id mapping built from a registry snapshot
///
/// Keywords iterate in lexical order; agent ids for a keyword keep registry
/// order. Every keyword maps to at least one agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CapabilityIndex {
    entries: BTreeMap<String, Vec<String>>,
}

impl CapabilityIndex {
    /// Build the index for the given agents (pure function)
    ///
    /// With two or more agents, keywords every agent offers are dropped since
    /// they cannot discriminate. Stoplisted keywords are always dropped.
    pub fn build(agents: &[AgentDescriptor]) -> Self {
        let mut entries: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for agent in agents {
            for capability in agent_capabilities(agent) {
                let owners = entries.entry(capability).or_default();
                if !owners.contains(&agent.id) {
                    owners.push(agent.id.clone());
                }
            }
        }

        let agent_count = agents.len();
        entries.retain(|capability, owners| {
            let universal = agent_count >= 2 && owners.len() >= agent_count;
            !universal && !CAPABILITY_STOPLIST.contains(&capability.as_str())
        });

        Self { entries }
    }

    /// Agents offering `capability`
    pub fn agents_for(&self, capability: &str) -> Option<&[String]> {
        self.entries.get(capability).map(Vec::as_slice)
    }

    pub fn contains(&self, capability: &str) -> bool {
        self.entries.contains_key(capability)
    }

    /// All keywords in lexical order
    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(keyword, owners)| (keyword.as_str(), owners.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
