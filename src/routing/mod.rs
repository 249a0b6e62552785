//! Routing Infrastructure
//!
//! Capability-based routing in three layers:
//!
//! - [`scoring`]: pure heuristics scoring requests against agents and
//!   capability keywords
//! - [`agent_selector`]: single-agent selection with confidence and reasoning
//! - [`decomposer`] and [`planner`]: multi-step detection, decomposition into
//!   requirements, and agent assignment into a linear execution plan

pub mod agent_selector;
pub mod decomposer;
pub mod planner;
pub mod scoring;

pub use agent_selector::{
    confidence_from_score, select_agent, AgentSelection, DEFAULT_AGENT_CONFIDENCE,
};
pub use decomposer::{
    has_connective, is_multi_step, rank_capabilities, Decomposer, PatternDecomposer,
    RankedCapability, TaskRequirement, GENERAL_CAPABILITY,
};
pub use planner::{build_plan, find_best_agent_for_capability, ExecutionPlan, ExecutionStep};
pub use scoring::{score_agent, score_agent_for_capability, score_capability, AgentScore};
