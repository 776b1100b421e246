pub mod agents;
pub mod config;
pub mod history;
pub mod orchestrator;
pub mod parsing;
pub mod providers;

use std::sync::Arc;

use agents::AgentRegistry;
use config::Settings;
use history::MemoryHistory;
use orchestrator::Orchestrator;
use providers::LlmService;

/// Wire up an orchestrator with the stock agents, the provider chain from
/// settings, and an in-memory history sink.
pub async fn build_orchestrator(settings: &Settings) -> Orchestrator {
    let llm = Arc::new(LlmService::from_settings(settings));
    llm.probe().await;
    let registry = Arc::new(AgentRegistry::with_default_agents(llm));

    Orchestrator::new(registry, settings.max_parallel_tasks)
        .with_history(Arc::new(MemoryHistory::new()))
}
