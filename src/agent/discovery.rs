//! Agent Discovery System
//!
//! Registers remote agents by fetching their agent cards and keeps the
//! capability index in step with the registered set. Readers work on an
//! immutable [`RegistrySnapshot`]; every mutation builds a new snapshot under a
//! single writer lock and swaps it in, so a reader never sees an index that
//! disagrees with the agent list.

use crate::agent::capability::CapabilityIndex;
use crate::agent::descriptor::{AgentDescriptor, AgentSummary};
use crate::observability::metrics::metrics;
use crate::protocol::AgentCard;
use crate::transport::{Transport, TransportError};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Registry errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("Agent not found: {identifier}. Available agents: {known:?}")]
    NotFound {
        identifier: String,
        known: Vec<String>,
    },

    #[error("Failed to fetch agent card from {endpoint}: {source}")]
    MetadataFetch {
        endpoint: String,
        #[source]
        source: TransportError,
    },

    #[error("Invalid agent endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
}

/// Consistent view of the registered agents and their capability index
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    agents: Vec<AgentDescriptor>,
    index: CapabilityIndex,
}

impl RegistrySnapshot {
    fn from_agents(agents: Vec<AgentDescriptor>) -> Self {
        let index = CapabilityIndex::build(&agents);
        Self { agents, index }
    }

    /// Agents in registration order
    pub fn agents(&self) -> &[AgentDescriptor] {
        &self.agents
    }

    pub fn index(&self) -> &CapabilityIndex {
        &self.index
    }

    pub fn get(&self, agent_id: &str) -> Option<&AgentDescriptor> {
        self.agents.iter().find(|agent| agent.id == agent_id)
    }

    pub fn agent_ids(&self) -> Vec<String> {
        self.agents.iter().map(|agent| agent.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

/// Thread-safe registry of remote agents
#[derive(Debug, Clone, Default)]
pub struct AgentRegistry {
    snapshot: Arc<RwLock<Arc<RegistrySnapshot>>>,
    /// Serializes mutations so concurrent registrations cannot lose updates
    write_lock: Arc<Mutex<()>>,
}

impl AgentRegistry {
    /// Create a new empty agent registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot; cheap to clone and safe to hold across awaits
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Fetch the agent card at `endpoint` and register the agent it describes
    ///
    /// The card is fetched before the registry is locked; a failed fetch leaves
    /// the registry untouched.
    pub async fn register<T: Transport + ?Sized>(
        &self,
        transport: &T,
        endpoint: &str,
    ) -> Result<AgentDescriptor, RegistryError> {
        let endpoint = validate_endpoint(endpoint)?;

        debug!(endpoint = %endpoint, "Fetching agent card");
        let card = transport
            .fetch_agent_card(&endpoint)
            .await
            .map_err(|source| {
                warn!(endpoint = %endpoint, error = %source, "Agent card fetch failed");
                RegistryError::MetadataFetch {
                    endpoint: endpoint.clone(),
                    source,
                }
            })?;

        Ok(self.register_descriptor(&endpoint, card))
    }

    /// Register an agent from an already fetched card
    ///
    /// Re-registering the same name from the same endpoint replaces the entry
    /// in place. A name already owned by a different endpoint is registered as
    /// `"<name>@<host:port>"`.
    pub fn register_descriptor(&self, endpoint: &str, card: AgentCard) -> AgentDescriptor {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.snapshot();
        let mut agents = current.agents().to_vec();

        let provisional = AgentDescriptor::from_card(card.name.clone(), card, endpoint);
        let mut existing = agents.iter().position(|agent| {
            agent.name == provisional.name && same_endpoint(&agent.endpoint, &provisional.endpoint)
        });

        let mut provisional = provisional;
        if existing.is_none() && agents.iter().any(|agent| agent.id == provisional.id) {
            provisional.id = format!("{}@{}", provisional.name, host_port(&provisional.endpoint));
            warn!(
                name = %provisional.name,
                agent_id = %provisional.id,
                "Agent name already registered from another endpoint, using qualified id"
            );
            existing = agents.iter().position(|agent| agent.id == provisional.id);
        }

        let descriptor = match existing {
            Some(position) => {
                let descriptor = AgentDescriptor {
                    id: agents[position].id.clone(),
                    ..provisional
                };
                agents[position] = descriptor.clone();
                info!(
                    agent_id = %descriptor.id,
                    endpoint = %descriptor.endpoint,
                    "Replaced agent registration"
                );
                descriptor
            }
            None => {
                let descriptor = provisional;
                agents.push(descriptor.clone());
                info!(
                    agent_id = %descriptor.id,
                    endpoint = %descriptor.endpoint,
                    skills = descriptor.skills.len(),
                    "Registered new agent"
                );
                descriptor
            }
        };

        self.publish(agents);
        metrics().agent_registered();
        descriptor
    }

    /// Remove an agent by id, endpoint, name or endpoint fragment
    ///
    /// Rules are tried in order: exact id, exact endpoint, case-insensitive
    /// name, then endpoint substring. The first rule that matches any agent
    /// wins and the first match in registration order is removed.
    pub fn unregister(&self, identifier: &str) -> Result<AgentDescriptor, RegistryError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.snapshot();
        let mut agents = current.agents().to_vec();

        let Some(position) = resolve_identifier(&agents, identifier) else {
            debug!(identifier = %identifier, "No agent matched unregister request");
            return Err(RegistryError::NotFound {
                identifier: identifier.to_string(),
                known: current.agent_ids(),
            });
        };

        let removed = agents.remove(position);
        self.publish(agents);
        metrics().agent_unregistered();

        info!(
            agent_id = %removed.id,
            endpoint = %removed.endpoint,
            "Unregistered agent"
        );
        Ok(removed)
    }

    /// Register every endpoint, logging and skipping failures
    pub async fn initialize_default_agents<T: Transport + ?Sized>(
        &self,
        transport: &T,
        endpoints: &[String],
    ) -> Vec<AgentDescriptor> {
        let mut registered = Vec::with_capacity(endpoints.len());
        for endpoint in endpoints {
            match self.register(transport, endpoint).await {
                Ok(descriptor) => registered.push(descriptor),
                Err(e) => warn!(endpoint = %endpoint, error = %e, "Skipping default agent"),
            }
        }

        info!(
            requested = endpoints.len(),
            registered = registered.len(),
            "Default agent initialization complete"
        );
        registered
    }

    /// Summaries of all agents in registration order
    pub fn list(&self) -> Vec<AgentSummary> {
        self.snapshot()
            .agents()
            .iter()
            .map(AgentDescriptor::summary)
            .collect()
    }

    /// Get agent information by id
    pub fn get_agent(&self, agent_id: &str) -> Option<AgentDescriptor> {
        self.snapshot().get(agent_id).cloned()
    }

    /// Get count of registered agents
    pub fn agent_count(&self) -> usize {
        self.snapshot().len()
    }

    pub fn get_all_agent_ids(&self) -> Vec<String> {
        self.snapshot().agent_ids()
    }

    fn publish(&self, agents: Vec<AgentDescriptor>) {
        let next = Arc::new(RegistrySnapshot::from_agents(agents));
        metrics().set_registered_agents(next.len());
        debug!(
            agents = next.len(),
            capabilities = next.index().len(),
            "Capability index rebuilt"
        );
        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = next;
    }
}

fn validate_endpoint(endpoint: &str) -> Result<String, RegistryError> {
    let trimmed = endpoint.trim();
    let invalid = |reason: String| RegistryError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason,
    };

    let url = url::Url::parse(trimmed).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }
    Ok(trimmed.to_string())
}

fn same_endpoint(a: &str, b: &str) -> bool {
    a.trim().trim_end_matches('/') == b.trim().trim_end_matches('/')
}

/// `host:port` of an endpoint, or the raw endpoint when it does not parse
fn host_port(endpoint: &str) -> String {
    url::Url::parse(endpoint)
        .ok()
        .and_then(|url| {
            let host = url.host_str()?.to_string();
            Some(match url.port_or_known_default() {
                Some(port) => format!("{host}:{port}"),
                None => host,
            })
        })
        .unwrap_or_else(|| endpoint.to_string())
}

fn resolve_identifier(agents: &[AgentDescriptor], identifier: &str) -> Option<usize> {
    let identifier = identifier.trim();
    if identifier.is_empty() {
        return None;
    }
    let lowered = identifier.to_lowercase();

    agents
        .iter()
        .position(|agent| agent.id == identifier)
        .or_else(|| {
            agents
                .iter()
                .position(|agent| same_endpoint(&agent.endpoint, identifier))
        })
        .or_else(|| {
            agents
                .iter()
                .position(|agent| agent.name.to_lowercase() == lowered)
        })
        .or_else(|| {
            agents
                .iter()
                .position(|agent| agent.endpoint.contains(identifier))
        })
}
