use super::{BatchOutcome, BatchStatus, TaskResult, TaskStatus};

/// Fold per-task results into a batch outcome. Total by construction:
/// any well-formed result list produces an outcome, never an error.
pub fn aggregate(results: Vec<TaskResult>) -> BatchOutcome {
    let total_tasks = results.len();
    let completed_tasks = results
        .iter()
        .filter(|r| r.status == TaskStatus::Completed)
        .count();
    let failed_tasks = total_tasks - completed_tasks;

    let overall_status = if failed_tasks == 0 {
        BatchStatus::Completed
    } else if completed_tasks > 0 {
        BatchStatus::Partial
    } else {
        BatchStatus::Failed
    };

    let summary = render_summary(&results);

    BatchOutcome {
        overall_status,
        total_tasks,
        completed_tasks,
        failed_tasks,
        task_results: results,
        summary,
    }
}

/// One block per task, in engine output order (dependency/priority order),
/// so the same result list always renders the same text.
fn render_summary(results: &[TaskResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let payload = r
                .result
                .as_deref()
                .or(r.error.as_deref())
                .unwrap_or("(no output)");
            format!(
                "### Task {}: {}\nStatus: {}\nTime: {:.2}ms\nResult:\n{}",
                i + 1,
                r.task_id,
                r.status,
                r.execution_time_ms,
                payload
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(id: &str, status: TaskStatus) -> TaskResult {
        TaskResult {
            task_id: id.to_string(),
            task_type: "analyzer".to_string(),
            status,
            result: match status {
                TaskStatus::Completed => Some(format!("output of {id}")),
                TaskStatus::Failed => None,
            },
            error: match status {
                TaskStatus::Completed => None,
                TaskStatus::Failed => Some(format!("error in {id}")),
            },
            execution_time_ms: 12.5,
            tokens_used: None,
        }
    }

    #[test]
    fn test_all_completed() {
        let outcome = aggregate(vec![
            result("a", TaskStatus::Completed),
            result("b", TaskStatus::Completed),
        ]);
        assert_eq!(outcome.overall_status, BatchStatus::Completed);
        assert_eq!(outcome.total_tasks, 2);
        assert_eq!(outcome.completed_tasks, 2);
        assert_eq!(outcome.failed_tasks, 0);
    }

    #[test]
    fn test_partial() {
        let outcome = aggregate(vec![
            result("a", TaskStatus::Completed),
            result("b", TaskStatus::Failed),
        ]);
        assert_eq!(outcome.overall_status, BatchStatus::Partial);
        assert_eq!(outcome.completed_tasks, 1);
        assert_eq!(outcome.failed_tasks, 1);
    }

    #[test]
    fn test_all_failed() {
        let outcome = aggregate(vec![result("a", TaskStatus::Failed)]);
        assert_eq!(outcome.overall_status, BatchStatus::Failed);
    }

    #[test]
    fn test_summary_order_and_content() {
        let outcome = aggregate(vec![
            result("first", TaskStatus::Completed),
            result("second", TaskStatus::Failed),
        ]);

        let first_pos = outcome.summary.find("### Task 1: first").unwrap();
        let second_pos = outcome.summary.find("### Task 2: second").unwrap();
        assert!(first_pos < second_pos);
        assert!(outcome.summary.contains("output of first"));
        // Failed tasks render their error where the result would go.
        assert!(outcome.summary.contains("error in second"));
    }

    #[test]
    fn test_summary_is_deterministic() {
        let results = || vec![result("a", TaskStatus::Completed), result("b", TaskStatus::Failed)];
        assert_eq!(aggregate(results()).summary, aggregate(results()).summary);
    }
}
