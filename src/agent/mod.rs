//! Agent registry
//!
//! Remote agents are registered by fetching their agent cards. The registry
//! owns the agent list and the capability index derived from it.

pub mod capability;
pub mod descriptor;
pub mod discovery;

pub use capability::{
    agent_capabilities, build_capability_index, meaningful_words, normalize_skill_name,
    skill_capabilities, skill_keywords, CapabilityIndex,
};
pub use descriptor::{AgentDescriptor, AgentSummary, Skill, SkillSummary};
pub use discovery::{AgentRegistry, RegistryError, RegistrySnapshot};
