use async_trait::async_trait;

use crate::domain::{JobId, ResolutionError, TaskId};

/// Answers "which node runs job X", as seen by cluster membership.
#[async_trait]
pub trait TaskResolver: Send + Sync {
    /// Every task currently executing `job_id`, each carrying its node.
    ///
    /// An empty result is allowed here; the dispatcher turns it into
    /// `ResolutionError::JobNotRunning`.
    async fn resolve(&self, job_id: &JobId) -> Result<Vec<TaskId>, ResolutionError>;
}
