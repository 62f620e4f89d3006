use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{JobId, ResolutionError, TaskId};
use crate::ports::TaskResolver;

/// Job ownership table kept in memory.
#[derive(Default)]
pub struct InMemoryTaskResolver {
    owners: RwLock<HashMap<JobId, Vec<TaskId>>>,
}

impl InMemoryTaskResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn assign(&self, job_id: JobId, task: TaskId) {
        self.owners.write().await.entry(job_id).or_default().push(task);
    }

    pub async fn unassign(&self, job_id: &JobId) {
        self.owners.write().await.remove(job_id);
    }
}

#[async_trait]
impl TaskResolver for InMemoryTaskResolver {
    async fn resolve(&self, job_id: &JobId) -> Result<Vec<TaskId>, ResolutionError> {
        Ok(self
            .owners
            .read()
            .await
            .get(job_id)
            .cloned()
            .unwrap_or_default())
    }
}
