use async_trait::async_trait;

use crate::domain::{ExecutionError, JobId, NodeResult, TaskId};

/// Performs the actual persistence on the node hosting `task`.
///
/// Called once per resolved node. Retries are not this trait's concern.
#[async_trait]
pub trait JobExecutor: Send + Sync {
    async fn persist(&self, job_id: &JobId, task: &TaskId) -> Result<NodeResult, ExecutionError>;
}
