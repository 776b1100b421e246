use futures::future::join_all;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error};

use super::{ExecutionMode, TaskResult, TaskSpec, TaskStatus};
use crate::agents::{AgentRegistry, CapabilityInput};

/// Drives a resolved task order to completion and yields one TaskResult
/// per task, in order. Failures stay task-local: a capability error, a
/// missing task type, or a panic inside a task each produce a failed
/// result for that task and nothing else. Every task runs on its own
/// spawned tokio task so the panic boundary is the same in both modes.
pub struct ExecutionEngine {
    registry: Arc<AgentRegistry>,
    max_parallel_tasks: usize,
}

impl ExecutionEngine {
    pub fn new(registry: Arc<AgentRegistry>, max_parallel_tasks: usize) -> Self {
        Self {
            registry,
            max_parallel_tasks: max_parallel_tasks.max(1),
        }
    }

    /// Parallel execution is only sound when no task orders itself after
    /// another, so dependencies force sequential mode regardless of what
    /// the caller asked for.
    pub fn select_mode(&self, parallel_requested: bool, tasks: &[TaskSpec]) -> ExecutionMode {
        let has_dependencies = tasks.iter().any(|t| !t.depends_on.is_empty());
        if parallel_requested && !has_dependencies {
            ExecutionMode::Parallel
        } else {
            ExecutionMode::Sequential
        }
    }

    pub async fn run(
        &self,
        order: Vec<TaskSpec>,
        mode: ExecutionMode,
        session_id: &str,
        context: Option<&str>,
    ) -> Vec<TaskResult> {
        match mode {
            ExecutionMode::Sequential => self.run_sequential(order, session_id, context).await,
            ExecutionMode::Parallel => self.run_parallel(order, session_id, context).await,
        }
    }

    async fn run_sequential(
        &self,
        order: Vec<TaskSpec>,
        session_id: &str,
        context: Option<&str>,
    ) -> Vec<TaskResult> {
        let mut results = Vec::with_capacity(order.len());
        for task in order {
            let task_id = task.task_id.clone();
            let task_type = task.task_type.clone();
            let handle = self.spawn_task(task, session_id.to_string(), context.map(String::from));
            results.push(join_into_result(task_id, task_type, handle.await));
        }
        results
    }

    async fn run_parallel(
        &self,
        order: Vec<TaskSpec>,
        session_id: &str,
        context: Option<&str>,
    ) -> Vec<TaskResult> {
        let semaphore = Arc::new(Semaphore::new(self.max_parallel_tasks));

        let mut identities = Vec::with_capacity(order.len());
        let mut handles = Vec::with_capacity(order.len());
        for task in order {
            let registry = self.registry.clone();
            let semaphore = semaphore.clone();
            let session = session_id.to_string();
            let batch_context = context.map(String::from);
            identities.push((task.task_id.clone(), task.task_type.clone()));
            handles.push(tokio::spawn(async move {
                // Holding the permit bounds the fan-out.
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("semaphore is never closed");
                execute_task(registry, task, session, batch_context).await
            }));
        }

        // join_all preserves input order, so the result list matches the
        // resolved order no matter which task finishes first.
        let joined = join_all(handles).await;
        identities
            .into_iter()
            .zip(joined)
            .map(|((task_id, task_type), res)| join_into_result(task_id, task_type, res))
            .collect()
    }

    fn spawn_task(
        &self,
        task: TaskSpec,
        session_id: String,
        context: Option<String>,
    ) -> JoinHandle<TaskResult> {
        let registry = self.registry.clone();
        tokio::spawn(async move { execute_task(registry, task, session_id, context).await })
    }
}

fn join_into_result(
    task_id: String,
    task_type: String,
    joined: Result<TaskResult, JoinError>,
) -> TaskResult {
    match joined {
        Ok(result) => result,
        Err(join_err) => {
            error!(task_id = %task_id, error = %join_err, "task aborted abnormally");
            TaskResult {
                task_id,
                task_type,
                status: TaskStatus::Failed,
                result: None,
                error: Some(format!("Task aborted: {join_err}")),
                execution_time_ms: 0.0,
                tokens_used: None,
            }
        }
    }
}

/// Execute one task end to end: registry lookup, capability invocation,
/// wall-clock timing around the invocation only. The batch context is
/// merged into the input under "context" unless the task brought its own.
async fn execute_task(
    registry: Arc<AgentRegistry>,
    task: TaskSpec,
    session_id: String,
    context: Option<String>,
) -> TaskResult {
    let started = Instant::now();

    let Some(agent) = registry.dispatch(&task.task_type) else {
        return TaskResult {
            task_id: task.task_id,
            status: TaskStatus::Failed,
            result: None,
            error: Some(format!("Unknown task type: {}", task.task_type)),
            execution_time_ms: elapsed_ms(started),
            task_type: task.task_type,
            tokens_used: None,
        };
    };

    debug!(task_id = %task.task_id, task_type = %task.task_type, "executing task");

    let mut data = task.input_data;
    if !data.contains_key("context") {
        if let Some(ctx) = context {
            data.insert("context".to_string(), Value::String(ctx));
        }
    }

    let input = CapabilityInput::new(data, session_id);
    let report = agent.execute(&input).await;

    TaskResult {
        task_id: task.task_id,
        task_type: task.task_type,
        status: if report.success {
            TaskStatus::Completed
        } else {
            TaskStatus::Failed
        },
        result: report.result,
        error: report.error,
        execution_time_ms: elapsed_ms(started),
        tokens_used: report.tokens_used,
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}
