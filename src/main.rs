use anyhow::{Context, Result};

use agentflow::config::Settings;
use agentflow::orchestrator::BatchRequest;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let path = std::env::args()
        .nth(1)
        .context("usage: agentflow <batch-request.json>")?;

    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read batch request from {path}"))?;
    let request: BatchRequest =
        serde_json::from_str(&raw).context("invalid batch request JSON")?;

    let settings = Settings::from_env();
    let orchestrator = agentflow::build_orchestrator(&settings).await;

    let outcome = orchestrator.run(request).await?;

    println!("Overall status: {}", outcome.overall_status);
    println!(
        "Tasks: {} total, {} completed, {} failed\n",
        outcome.total_tasks, outcome.completed_tasks, outcome.failed_tasks
    );
    println!("{}", outcome.summary);

    Ok(())
}
