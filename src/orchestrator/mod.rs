use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

pub mod aggregate;
pub mod engine;
pub mod resolver;

pub use engine::ExecutionEngine;

use crate::agents::AgentRegistry;
use crate::history::{BatchRecord, HistorySink};

/// One unit of work submitted by the caller. Consumed once per batch,
/// never mutated, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSpec {
    pub task_id: String,
    pub task_type: String,
    #[serde(default)]
    pub input_data: Map<String, Value>,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub priority: i32,
}

/// Terminal states only: the batch runs to completion before returning,
/// so callers never observe a pending or running task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Completed,
    Failed,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Produced exactly once per submitted task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: String,
    pub task_type: String,
    pub status: TaskStatus,
    pub result: Option<String>,
    pub error: Option<String>,
    pub execution_time_ms: f64,
    pub tokens_used: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Completed,
    Partial,
    Failed,
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchStatus::Completed => write!(f, "completed"),
            BatchStatus::Partial => write!(f, "partial"),
            BatchStatus::Failed => write!(f, "failed"),
        }
    }
}

/// The orchestrator's return value for one batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub overall_status: BatchStatus,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub failed_tasks: usize,
    pub task_results: Vec<TaskResult>,
    pub summary: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    Sequential,
    Parallel,
}

/// Inbound batch submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRequest {
    pub session_id: String,
    pub tasks: Vec<TaskSpec>,
    #[serde(default)]
    pub parallel_execution: bool,
    #[serde(default)]
    pub context: Option<String>,
}

/// Batch-level failures. Everything below batch granularity is recovered
/// into a failed TaskResult instead of surfacing here.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("no tasks provided")]
    EmptyBatch,

    #[error("duplicate task id in batch: {0}")]
    DuplicateTaskId(String),
}

/// Coordinates one batch end to end: validate, order by dependencies,
/// execute, aggregate, and report to the history sink.
pub struct Orchestrator {
    engine: ExecutionEngine,
    history: Option<Arc<dyn HistorySink>>,
}

impl Orchestrator {
    pub fn new(registry: Arc<AgentRegistry>, max_parallel_tasks: usize) -> Self {
        Self {
            engine: ExecutionEngine::new(registry, max_parallel_tasks),
            history: None,
        }
    }

    pub fn with_history(mut self, sink: Arc<dyn HistorySink>) -> Self {
        self.history = Some(sink);
        self
    }

    /// Run one batch to completion. Individual task failures never abort
    /// the batch; the only error paths here are the submission
    /// preconditions (empty batch, duplicate ids).
    pub async fn run(&self, request: BatchRequest) -> Result<BatchOutcome, OrchestratorError> {
        validate(&request.tasks)?;

        let order = resolver::resolve(&request.tasks);
        let mode = self.engine.select_mode(request.parallel_execution, &request.tasks);

        info!(
            session_id = %request.session_id,
            tasks = order.len(),
            ?mode,
            "starting batch"
        );

        let results = self
            .engine
            .run(order, mode, &request.session_id, request.context.as_deref())
            .await;
        let outcome = aggregate::aggregate(results);

        info!(
            session_id = %request.session_id,
            status = %outcome.overall_status,
            completed = outcome.completed_tasks,
            failed = outcome.failed_tasks,
            "batch finished"
        );

        self.report(&request.session_id, mode, &outcome);
        Ok(outcome)
    }

    // Fire-and-forget: a sink failure is logged and the outcome is
    // returned unchanged.
    fn report(&self, session_id: &str, mode: ExecutionMode, outcome: &BatchOutcome) {
        let Some(sink) = &self.history else { return };

        let tokens_used: u64 = outcome
            .task_results
            .iter()
            .filter_map(|r| r.tokens_used.map(u64::from))
            .sum();

        let record = BatchRecord {
            id: Uuid::new_v4(),
            session_id: session_id.to_string(),
            total_tasks: outcome.total_tasks,
            completed_tasks: outcome.completed_tasks,
            failed_tasks: outcome.failed_tasks,
            mode,
            tokens_used,
            summary: outcome.summary.clone(),
            created_at: Utc::now(),
        };

        if let Err(err) = sink.record_batch(record) {
            warn!(error = %err, "failed to record batch history");
        }
    }
}

fn validate(tasks: &[TaskSpec]) -> Result<(), OrchestratorError> {
    if tasks.is_empty() {
        return Err(OrchestratorError::EmptyBatch);
    }

    let mut seen = HashSet::new();
    for task in tasks {
        if !seen.insert(task.task_id.as_str()) {
            return Err(OrchestratorError::DuplicateTaskId(task.task_id.clone()));
        }
    }

    Ok(())
}
