//! Agent Router - Rust Implementation
//!
//! A capability-based request router for interoperable JSON-RPC agents.
//!
//! # Overview
//!
//! The router keeps a registry of remote agents discovered through their
//! agent cards and routes natural-language requests to them:
//! - Single requests go to the best-scoring agent, with confidence and reasoning
//! - Requests spanning several capabilities are decomposed into an ordered plan
//!   whose steps feed their results forward
//! - The router exposes itself as an agent over JSON-RPC, with a management
//!   API for registering and unregistering agents
//!
//! # Quick Start
//!
//! ```rust
//! use agent_router::config::RouterConfig;
//! use agent_router::orchestrator::Orchestrator;
//! use agent_router::testing::{math_agent_card, MockTransport, ScriptedReply};
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let endpoint = "http://localhost:8001";
//! let transport = MockTransport::new()
//!     .with_reply(endpoint, ScriptedReply::Immediate("5".to_string()));
//!
//! let orchestrator = Orchestrator::new(RouterConfig::test_config(), Arc::new(transport));
//! orchestrator
//!     .registry()
//!     .register_descriptor(endpoint, math_agent_card(endpoint));
//!
//! let response = orchestrator.process("what is 2+3").await;
//! assert!(response.success());
//! assert_eq!(response.agent_label(), "MathAgent");
//! # });
//! ```

pub mod agent;
pub mod config;
pub mod error;
pub mod execution;
pub mod observability;
pub mod orchestrator;
pub mod protocol;
pub mod routing;
pub mod server;
pub mod testing;
pub mod transport;

pub use agent::{AgentDescriptor, AgentRegistry, AgentSummary};
pub use config::RouterConfig;
pub use error::{RouterError, RouterResult};
pub use orchestrator::{Orchestrator, OrchestratorResponse};
pub use server::RouterServer;
pub use transport::{HttpTransport, Transport};
