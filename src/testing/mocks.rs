//! Mock implementations for testing
//!
//! Provides an in-memory scripted [`Transport`] and agent card fixtures so the
//! registry, router, planner and execution engine can be exercised without
//! running any remote agent.

use crate::protocol::{AgentCapabilities, AgentCard, AgentSkill};
use crate::transport::{SendOutcome, TaskHandle, TaskPoll, Transport, TransportError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// How the mock answers `send_task` for one endpoint
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Answer synchronously with this text
    Immediate(String),
    /// Answer synchronously with `"<prefix>: <request text>"`
    Echo(String),
    /// Return a pending task; polls walk the sequence and repeat its last entry
    Polled(Vec<TaskPoll>),
    /// Fail the send with this error
    Fail(TransportError),
}

pub type SentRequest = (String, String);

/// Mock transport for testing
#[derive(Debug, Default, Clone)]
pub struct MockTransport {
    cards: HashMap<String, AgentCard>,
    replies: HashMap<String, ScriptedReply>,
    pub sent_requests: Arc<Mutex<Vec<SentRequest>>>,
    pub card_fetches: Arc<Mutex<Vec<String>>>,
    poll_positions: Arc<Mutex<HashMap<String, usize>>>,
    polls: Arc<Mutex<u32>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `card` at `endpoint`'s discovery path
    pub fn with_card(mut self, endpoint: &str, card: AgentCard) -> Self {
        self.cards.insert(endpoint.to_string(), card);
        self
    }

    /// Script the reply for tasks sent to `endpoint`
    pub fn with_reply(mut self, endpoint: &str, reply: ScriptedReply) -> Self {
        self.replies.insert(endpoint.to_string(), reply);
        self
    }

    /// Make every task sent to `endpoint` fail with a network error
    pub fn with_unreachable(self, endpoint: &str) -> Self {
        self.with_reply(
            endpoint,
            ScriptedReply::Fail(TransportError::Network(format!(
                "connection refused: {endpoint}"
            ))),
        )
    }

    pub async fn get_sent_requests(&self) -> Vec<SentRequest> {
        self.sent_requests.lock().await.clone()
    }

    pub async fn poll_count(&self) -> u32 {
        *self.polls.lock().await
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn fetch_agent_card(&self, endpoint: &str) -> Result<AgentCard, TransportError> {
        self.card_fetches.lock().await.push(endpoint.to_string());

        self.cards.get(endpoint).cloned().ok_or_else(|| {
            TransportError::Network(format!("Mock card lookup failed for {endpoint}"))
        })
    }

    async fn send_task(
        &self,
        endpoint: &str,
        request_text: &str,
    ) -> Result<SendOutcome, TransportError> {
        self.sent_requests
            .lock()
            .await
            .push((endpoint.to_string(), request_text.to_string()));

        match self.replies.get(endpoint) {
            Some(ScriptedReply::Immediate(text)) => Ok(SendOutcome::Immediate(text.clone())),
            Some(ScriptedReply::Echo(prefix)) => {
                Ok(SendOutcome::Immediate(format!("{prefix}: {request_text}")))
            }
            Some(ScriptedReply::Polled(_)) => {
                Ok(SendOutcome::Pending(TaskHandle::new(format!("task-{endpoint}"))))
            }
            Some(ScriptedReply::Fail(err)) => Err(err.clone()),
            None => Ok(SendOutcome::Immediate(format!("ok: {request_text}"))),
        }
    }

    async fn poll_task(
        &self,
        endpoint: &str,
        _handle: &TaskHandle,
    ) -> Result<TaskPoll, TransportError> {
        *self.polls.lock().await += 1;

        let Some(ScriptedReply::Polled(sequence)) = self.replies.get(endpoint) else {
            return Err(TransportError::Rpc {
                code: -32001,
                message: format!("No task scripted for {endpoint}"),
            });
        };

        let mut positions = self.poll_positions.lock().await;
        let position = positions.entry(endpoint.to_string()).or_insert(0);
        let index = (*position).min(sequence.len().saturating_sub(1));
        *position += 1;

        Ok(sequence.get(index).cloned().unwrap_or_else(TaskPoll::pending))
    }
}

/// Build a skill fixture
pub fn skill(name: &str, description: &str, tags: &[&str]) -> AgentSkill {
    AgentSkill {
        id: name.to_lowercase().replace(' ', "_"),
        name: name.to_string(),
        description: description.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}

/// Build an agent card fixture
pub fn agent_card(name: &str, url: &str, description: &str, skills: Vec<AgentSkill>) -> AgentCard {
    AgentCard {
        name: name.to_string(),
        description: description.to_string(),
        url: url.to_string(),
        version: "1.0.0".to_string(),
        capabilities: AgentCapabilities::default(),
        skills,
        default_input_modes: vec!["text".to_string()],
        default_output_modes: vec!["text".to_string()],
    }
}

/// Math agent fixture used across routing tests
pub fn math_agent_card(url: &str) -> AgentCard {
    agent_card(
        "MathAgent",
        url,
        "Solves arithmetic problems",
        vec![skill(
            "arithmetic_calculation",
            "Perform arithmetic: add, subtract, multiply, times, divide numbers",
            &["math", "calculate", "+", "-"],
        )],
    )
}

/// Currency agent fixture used across routing tests
pub fn currency_agent_card(url: &str) -> AgentCard {
    agent_card(
        "CurrencyAgent",
        url,
        "Converts money between currencies",
        vec![skill(
            "currency_exchange",
            "Convert between currencies using live exchange rates",
            &["usd", "eur", "convert"],
        )],
    )
}
