//! Agent registry.
//!
//! An agent is the persona a call is answered with: the synthesized voice,
//! the instruction prompt and the greeting that opens the conversation.
//! The registry is built once at startup from the built-in table plus any
//! `agents:` entries in the YAML config, and never changes afterwards.
//!
//! Unknown agent ids are not an error; [`AgentRegistry::lookup`] falls back
//! to the configured default agent.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;

use crate::config::{ConfigError, ConfigResult};
use crate::core::realtime::OpenAIRealtimeVoice;

/// Greeting used when an agent does not declare one.
pub const DEFAULT_GREETING: &str = "Hello";

/// Id of the built-in default agent.
pub const DEFAULT_AGENT_ID: &str = "michela";

const MICHELA_INSTRUCTIONS: &str = "Sei l'assistente virtuale di Michela Radicchi. \
Parla in italiano con tono cordiale e professionale. \
Aiuta chi risponde a fissare un appuntamento telefonico con Michela \
per verificare la sua situazione debitoria. \
Proponi due orari di richiamo: oggi alle 17:00 oppure domani alle 12:00. \
Chiedi quale preferisce, conferma la scelta e saluta educatamente.";

const ANDREA_INSTRUCTIONS: &str = "Sei l'assistente di intelligenza artificiale di Francesco Caruccio. \
Parla sempre in italiano, con tono amichevole e professionale. \
Spiega ad Andrea che questa chiamata è un prototipo di conversazione in tempo reale \
basato sull'intelligenza artificiale. \
Ricordagli di fissare l'analisi e salutalo da parte di Francesco.";

/// Session parameters for one agent.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    /// Registry key
    pub id: String,
    /// Synthesized voice
    pub voice: OpenAIRealtimeVoice,
    /// System prompt
    pub instructions: String,
    /// Text sent as the caller's first turn once the stream starts
    pub greeting: String,
}

/// Agent entry as written in the YAML config.
///
/// ```yaml
/// agents:
///   support:
///     voice: coral
///     instructions: "You are a helpful support agent."
///     greeting: "Hi"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct AgentDefinition {
    pub voice: OpenAIRealtimeVoice,
    pub instructions: String,
    #[serde(default)]
    pub greeting: Option<String>,
}

impl AgentDefinition {
    fn into_config(self, id: &str) -> AgentConfig {
        AgentConfig {
            id: id.to_string(),
            voice: self.voice,
            instructions: self.instructions,
            greeting: self
                .greeting
                .unwrap_or_else(|| DEFAULT_GREETING.to_string()),
        }
    }
}

/// Immutable agent lookup table with a default entry.
#[derive(Debug, Clone)]
pub struct AgentRegistry {
    agents: HashMap<String, Arc<AgentConfig>>,
    default_id: String,
}

impl AgentRegistry {
    /// Built-in agents with `overrides` merged on top.
    ///
    /// Fails if `default_id` is not present in the merged table.
    pub fn new(
        default_id: &str,
        overrides: &HashMap<String, AgentDefinition>,
    ) -> ConfigResult<Self> {
        let mut agents: HashMap<String, Arc<AgentConfig>> = builtin_agents()
            .into_iter()
            .map(|agent| (agent.id.clone(), Arc::new(agent)))
            .collect();

        for (id, definition) in overrides {
            if id.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "agent id must not be empty".to_string(),
                ));
            }
            agents.insert(id.clone(), Arc::new(definition.clone().into_config(id)));
        }

        if !agents.contains_key(default_id) {
            return Err(ConfigError::Validation(format!(
                "default agent '{}' is not defined",
                default_id
            )));
        }

        Ok(Self {
            agents,
            default_id: default_id.to_string(),
        })
    }

    /// Built-in agents only, default `michela`.
    pub fn builtin() -> Self {
        let agents = builtin_agents()
            .into_iter()
            .map(|agent| (agent.id.clone(), Arc::new(agent)))
            .collect();
        Self {
            agents,
            default_id: DEFAULT_AGENT_ID.to_string(),
        }
    }

    /// Agent for `agent_id`, or the default agent when the id is unknown.
    pub fn lookup(&self, agent_id: &str) -> Arc<AgentConfig> {
        match self.agents.get(agent_id) {
            Some(agent) => agent.clone(),
            None => {
                tracing::debug!(agent = %agent_id, "Unknown agent, using default");
                self.default_agent()
            }
        }
    }

    /// Whether `agent_id` names a registered agent.
    pub fn contains(&self, agent_id: &str) -> bool {
        self.agents.contains_key(agent_id)
    }

    /// The default agent.
    pub fn default_agent(&self) -> Arc<AgentConfig> {
        // The constructors guarantee the default id is present.
        match self.agents.get(&self.default_id) {
            Some(agent) => agent.clone(),
            None => Arc::new(fallback_agent()),
        }
    }

    pub fn default_id(&self) -> &str {
        &self.default_id
    }

    /// Registered agent ids, sorted.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.agents.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn builtin_agents() -> Vec<AgentConfig> {
    vec![
        fallback_agent(),
        AgentConfig {
            id: "andrea".to_string(),
            voice: OpenAIRealtimeVoice::Alloy,
            instructions: ANDREA_INSTRUCTIONS.to_string(),
            greeting: DEFAULT_GREETING.to_string(),
        },
    ]
}

fn fallback_agent() -> AgentConfig {
    AgentConfig {
        id: DEFAULT_AGENT_ID.to_string(),
        voice: OpenAIRealtimeVoice::Shimmer,
        instructions: MICHELA_INSTRUCTIONS.to_string(),
        greeting: DEFAULT_GREETING.to_string(),
    }
}
