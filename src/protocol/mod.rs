//! Wire protocol types for agent communication
//!
//! JSON-RPC envelopes, task and message structures, and agent cards exchanged
//! between the router and the agents it routes to.

pub mod messages;

pub use messages::*;
