//! Testing utilities and mock implementations
//!
//! This module provides mock implementations for testing the router without
//! requiring live agent services.

pub mod mocks;

pub use mocks::*;
