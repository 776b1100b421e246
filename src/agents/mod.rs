use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

pub mod analyzer;
pub mod debugger;
pub mod docs;

pub use analyzer::AnalyzerAgent;
pub use debugger::DebuggerAgent;
pub use docs::DocsGeneratorAgent;

use crate::providers::LlmService;

/// The fixed set of capabilities this system ships. Task types arrive as
/// string tags over the wire and are mapped onto this enum before dispatch,
/// so unknown tags are rejected in exactly one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapabilityKind {
    Debugger,
    Analyzer,
    DocsGenerator,
}

impl CapabilityKind {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "debugger" => Some(Self::Debugger),
            "analyzer" => Some(Self::Analyzer),
            "docs_generator" => Some(Self::DocsGenerator),
            _ => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Self::Debugger => "debugger",
            Self::Analyzer => "analyzer",
            Self::DocsGenerator => "docs_generator",
        }
    }
}

/// Input handed to a capability: the task's opaque input map merged with
/// the batch session id.
#[derive(Debug, Clone)]
pub struct CapabilityInput {
    pub data: Map<String, Value>,
    pub session_id: String,
}

impl CapabilityInput {
    pub fn new(data: Map<String, Value>, session_id: impl Into<String>) -> Self {
        Self {
            data,
            session_id: session_id.into(),
        }
    }

    /// String field lookup; non-string values are ignored.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }
}

/// Outcome of one capability invocation. Capabilities signal failure
/// through `success`, never by returning Err: transport and validation
/// problems both end up here so the engine has a single path to translate.
#[derive(Debug, Clone)]
pub struct CapabilityReport {
    pub success: bool,
    pub result: Option<String>,
    pub error: Option<String>,
    pub tokens_used: Option<u32>,
}

impl CapabilityReport {
    pub fn ok(result: impl Into<String>) -> Self {
        Self {
            success: true,
            result: Some(result.into()),
            error: None,
            tokens_used: None,
        }
    }

    pub fn ok_with_tokens(result: impl Into<String>, tokens_used: u32) -> Self {
        Self {
            tokens_used: Some(tokens_used),
            ..Self::ok(result)
        }
    }

    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(error.into()),
            tokens_used: None,
        }
    }
}

/// A single callable capability. Implementations are stateless: one input
/// in, one report out, no shared mutable state between invocations.
#[async_trait]
pub trait Capability: Send + Sync {
    fn kind(&self) -> CapabilityKind;

    async fn execute(&self, input: &CapabilityInput) -> CapabilityReport;
}

/// Lookup table from capability kind to implementation, built once at
/// startup and read-only afterwards.
pub struct AgentRegistry {
    agents: HashMap<CapabilityKind, Arc<dyn Capability>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self {
            agents: HashMap::new(),
        }
    }

    /// Register the three stock agents against a shared LLM service.
    pub fn with_default_agents(llm: Arc<LlmService>) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(DebuggerAgent::new(llm.clone())));
        registry.register(Arc::new(AnalyzerAgent::new(llm.clone())));
        registry.register(Arc::new(DocsGeneratorAgent::new(llm)));
        registry
    }

    pub fn register(&mut self, agent: Arc<dyn Capability>) {
        self.agents.insert(agent.kind(), agent);
    }

    /// Resolve a wire tag to its capability. `None` covers both unknown
    /// tags and kinds that were never registered.
    pub fn dispatch(&self, task_type: &str) -> Option<Arc<dyn Capability>> {
        let kind = CapabilityKind::from_tag(task_type)?;
        self.agents.get(&kind).cloned()
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared system-prompt scaffolding used by all stock agents.
pub(crate) fn build_system_prompt(agent_role: &str, instructions: &str) -> String {
    format!(
        "You are a {agent_role} assistant. Your task is to help developers with code-related work.\n\
         \n\
         {instructions}\n\
         \n\
         Always be precise, clear, and actionable in your responses. Use code blocks for code examples.\n\
         Format your response in markdown when appropriate."
    )
}

// ~4 characters per token, same estimate the providers use.
pub(crate) fn estimate_tokens(prompt: &str, response: &str) -> u32 {
    ((prompt.len() + response.len()) / 4) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tag_round_trip() {
        for kind in [
            CapabilityKind::Debugger,
            CapabilityKind::Analyzer,
            CapabilityKind::DocsGenerator,
        ] {
            assert_eq!(CapabilityKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(CapabilityKind::from_tag("image_generator"), None);
    }

    #[test]
    fn test_dispatch_unknown_tag() {
        let registry = AgentRegistry::new();
        assert!(registry.dispatch("debugger").is_none());
        assert!(registry.dispatch("nonsense").is_none());
    }

    #[test]
    fn test_input_get_str_ignores_non_strings() {
        let mut data = Map::new();
        data.insert("code".to_string(), Value::String("x = 1".to_string()));
        data.insert("priority".to_string(), Value::from(3));
        let input = CapabilityInput::new(data, "s1");

        assert_eq!(input.get_str("code"), Some("x = 1"));
        assert_eq!(input.get_str("priority"), None);
        assert_eq!(input.get_str("missing"), None);
    }
}
