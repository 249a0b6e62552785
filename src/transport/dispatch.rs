//! Task dispatch with bounded polling
//!
//! Submits a request to an agent and, when the agent answers asynchronously,
//! polls the task at a fixed interval until it reaches a terminal state or the
//! attempt budget runs out.

use crate::protocol::TaskState;
use crate::transport::{SendOutcome, Transport, TransportError};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Fixed-interval polling policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay before each poll
    pub interval: Duration,
    /// Maximum number of polls before giving up
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_attempts: 30,
        }
    }
}

impl PollPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }
}

/// Forward a request to an agent and wait for its text result
///
/// Completed and input-required tasks yield their text. Failed, canceled and
/// rejected tasks are errors, as is a task still running after
/// `policy.max_attempts` polls.
pub async fn forward_request<T: Transport + ?Sized>(
    transport: &T,
    endpoint: &str,
    request_text: &str,
    policy: &PollPolicy,
) -> Result<String, TransportError> {
    let handle = match transport.send_task(endpoint, request_text).await? {
        SendOutcome::Immediate(text) => {
            debug!(endpoint = %endpoint, "Agent answered synchronously");
            return Ok(text);
        }
        SendOutcome::Pending(handle) => handle,
    };

    info!(
        endpoint = %endpoint,
        task_id = %handle.task_id,
        max_attempts = policy.max_attempts,
        "Agent accepted task, polling for completion"
    );

    for attempt in 1..=policy.max_attempts {
        tokio::time::sleep(policy.interval).await;

        let poll = transport.poll_task(endpoint, &handle).await?;
        debug!(
            task_id = %handle.task_id,
            attempt,
            state = poll.state.as_str(),
            "Polled task"
        );

        match poll.state {
            TaskState::Completed => {
                return Ok(poll
                    .text
                    .unwrap_or_else(|| "Task completed but no response text found".to_string()))
            }
            TaskState::InputRequired => {
                return Ok(poll
                    .text
                    .unwrap_or_else(|| "Agent requires input but no message provided".to_string()))
            }
            TaskState::Failed | TaskState::Canceled | TaskState::Rejected => {
                warn!(task_id = %handle.task_id, state = poll.state.as_str(), "Agent task failed");
                return Err(TransportError::TaskFailed {
                    task_id: handle.task_id,
                    state: poll.state.as_str().to_string(),
                    message: poll.text.unwrap_or_else(|| "Agent task failed".to_string()),
                });
            }
            _ => continue,
        }
    }

    warn!(
        task_id = %handle.task_id,
        attempts = policy.max_attempts,
        "Task did not complete within polling budget"
    );
    Err(TransportError::Timeout {
        task_id: handle.task_id,
        attempts: policy.max_attempts,
    })
}
