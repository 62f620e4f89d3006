//! InMemoryJobExecutor - 開発用の job 実行側
//!
//! Tracks which job each local task runs and counts persist calls per job.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::domain::{ExecutionError, JobId, NodeResult, TaskId};
use crate::ports::JobExecutor;

#[derive(Default)]
struct ExecutorState {
    running: HashMap<TaskId, JobId>,
    failing: HashMap<TaskId, String>,
    persisted: HashMap<JobId, u32>,
}

#[derive(Default)]
pub struct InMemoryJobExecutor {
    state: Mutex<ExecutorState>,
}

impl InMemoryJobExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ExecutorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn start(&self, task: TaskId, job_id: JobId) {
        self.lock().running.insert(task, job_id);
    }

    pub fn stop(&self, task: &TaskId) {
        self.lock().running.remove(task);
    }

    /// Every persist against `task` fails with `reason` from now on.
    pub fn fail_task(&self, task: TaskId, reason: impl Into<String>) {
        self.lock().failing.insert(task, reason.into());
    }

    pub fn persist_count(&self, job_id: &JobId) -> u32 {
        self.lock().persisted.get(job_id).copied().unwrap_or(0)
    }
}

#[async_trait]
impl JobExecutor for InMemoryJobExecutor {
    async fn persist(&self, job_id: &JobId, task: &TaskId) -> Result<NodeResult, ExecutionError> {
        let mut state = self.lock();
        if let Some(reason) = state.failing.get(task) {
            return Err(ExecutionError::Failed(reason.clone()));
        }
        let Some(running) = state.running.get(task) else {
            return Err(ExecutionError::TaskNotFound(task.clone()));
        };
        if running != job_id {
            return Err(ExecutionError::JobMismatch {
                task: task.clone(),
                expected: job_id.clone(),
                actual: running.clone(),
            });
        }
        *state.persisted.entry(job_id.clone()).or_default() += 1;
        Ok(NodeResult::new(true))
    }
}
