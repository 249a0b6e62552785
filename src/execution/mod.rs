//! Multi-step plan execution

pub mod cancellation;
pub mod engine;

pub use cancellation::CancellationFlag;
pub use engine::{
    build_task_with_dependencies, ExecutionEngine, ExecutionOutcome, IntermediateResults,
    StepRecord,
};
