use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use uuid::Uuid;

use crate::orchestrator::ExecutionMode;

/// Record of one completed batch, written after the outcome is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRecord {
    pub id: Uuid,
    pub session_id: String,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub failed_tasks: usize,
    pub mode: ExecutionMode,
    /// Estimated tokens spent across the batch's tasks.
    pub tokens_used: u64,
    pub summary: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
#[error("history sink error: {0}")]
pub struct HistoryError(pub String);

/// Destination for batch records. Recording is fire-and-forget from the
/// orchestrator's point of view: an error here never changes the outcome
/// returned to the caller.
pub trait HistorySink: Send + Sync {
    fn record_batch(&self, record: BatchRecord) -> Result<(), HistoryError>;
}

/// In-memory sink, newest last. Suits a single-process deployment and
/// tests; swap in a database-backed sink behind the same trait if records
/// need to outlive the process.
#[derive(Default)]
pub struct MemoryHistory {
    records: Mutex<Vec<BatchRecord>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_session(&self, session_id: &str) -> Vec<BatchRecord> {
        self.records
            .lock()
            .map(|records| {
                records
                    .iter()
                    .filter(|r| r.session_id == session_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl HistorySink for MemoryHistory {
    fn record_batch(&self, record: BatchRecord) -> Result<(), HistoryError> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| HistoryError("history lock poisoned".to_string()))?;
        records.push(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(session: &str) -> BatchRecord {
        BatchRecord {
            id: Uuid::new_v4(),
            session_id: session.to_string(),
            total_tasks: 2,
            completed_tasks: 1,
            failed_tasks: 1,
            mode: ExecutionMode::Sequential,
            tokens_used: 128,
            summary: "### Task 1 ...".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_record_and_query_by_session() {
        let history = MemoryHistory::new();
        history.record_batch(record("a")).unwrap();
        history.record_batch(record("b")).unwrap();
        history.record_batch(record("a")).unwrap();

        assert_eq!(history.len(), 3);
        assert_eq!(history.for_session("a").len(), 2);
        assert_eq!(history.for_session("missing").len(), 0);
    }
}
