//! Receiving side: one `NodeService` per node.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, warn};

use crate::action::{ActionHandler, ActionRegistry, PersistJobAction, RegistryError, TaskAction};
use crate::domain::{
    ExecutionError, NodeFailure, NodeId, PersistJobRequest, PersistJobResponse, TaskFailure,
    TasksResponse, TransportError,
};
use crate::ports::JobExecutor;

/// Decodes incoming requests, runs the registered handler, encodes the answer.
pub struct NodeService {
    node: NodeId,
    registry: ActionRegistry,
}

impl NodeService {
    pub fn new(node: impl Into<NodeId>, registry: ActionRegistry) -> Self {
        Self {
            node: node.into(),
            registry,
        }
    }

    /// Node serving the persist action through `executor`.
    pub fn with_persist_handler(
        node: impl Into<NodeId>,
        executor: Arc<dyn JobExecutor>,
    ) -> Result<Self, RegistryError> {
        let node = node.into();
        let mut registry = ActionRegistry::new();
        registry.register::<PersistJobAction, _>(PersistJobHandler::new(node.clone(), executor))?;
        Ok(Self::new(node, registry))
    }

    pub fn node(&self) -> &NodeId {
        &self.node
    }

    pub async fn handle(&self, action: &str, payload: &[u8]) -> Result<Bytes, TransportError> {
        let Some(handler) = self.registry.get(action) else {
            return Err(TransportError::UnknownAction {
                node: self.node.clone(),
                action: action.to_string(),
            });
        };
        handler
            .handle_bytes(payload)
            .await
            .map_err(|source| TransportError::BadRequest {
                node: self.node.clone(),
                source,
            })
    }
}

/// Persists the job task named by the request, if it lives on this node.
pub struct PersistJobHandler {
    node: NodeId,
    executor: Arc<dyn JobExecutor>,
}

impl PersistJobHandler {
    pub fn new(node: NodeId, executor: Arc<dyn JobExecutor>) -> Self {
        Self { node, executor }
    }

    fn node_failed(&self, err: ExecutionError) -> PersistJobResponse {
        let failure = NodeFailure::new(self.node.clone(), err.to_string());
        PersistJobResponse::with_failures(TasksResponse::new(Vec::new(), vec![failure]), false)
    }
}

#[async_trait]
impl ActionHandler<PersistJobAction> for PersistJobHandler {
    async fn handle(&self, request: PersistJobRequest) -> PersistJobResponse {
        let target = request.target();
        if !target.targets_node(&self.node) {
            warn!(node = %self.node, job_id = %request.job_id(), "persist request filtered out by node");
            return self.node_failed(ExecutionError::NotTargeted {
                node: self.node.clone(),
            });
        }
        if !target.targets_action(PersistJobAction::NAME) {
            warn!(node = %self.node, job_id = %request.job_id(), "persist request filtered out by action");
            return self.node_failed(ExecutionError::ActionFiltered {
                action: PersistJobAction::NAME.to_string(),
            });
        }

        let Some(task) = target.task().cloned() else {
            warn!(node = %self.node, job_id = %request.job_id(), "persist request without target task");
            return self.node_failed(ExecutionError::MissingTarget);
        };

        if task.node() != &self.node {
            let err = ExecutionError::WrongNode {
                task: task.clone(),
                node: self.node.clone(),
            };
            return PersistJobResponse::task_failed(TaskFailure::new(task, err.to_string()));
        }

        match self.executor.persist(request.job_id(), &task).await {
            Ok(result) => {
                debug!(%task, job_id = %request.job_id(), persisted = result.persisted, "persist finished");
                PersistJobResponse::from(result)
            }
            Err(err) => {
                warn!(%task, job_id = %request.job_id(), error = %err, "persist failed");
                PersistJobResponse::task_failed(TaskFailure::new(task, err.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{JobId, TaskId, TaskTarget};
    use crate::impls::InMemoryJobExecutor;
    use crate::wire;

    fn node_with_job() -> NodeService {
        let executor = InMemoryJobExecutor::new();
        executor.start(TaskId::new("n1", 4), JobId::new("job-42"));
        NodeService::with_persist_handler("n1", Arc::new(executor)).unwrap()
    }

    async fn ask(node: &NodeService, request: &PersistJobRequest) -> PersistJobResponse {
        let bytes = node
            .handle(PersistJobAction::NAME, &wire::encode(request).unwrap())
            .await
            .unwrap();
        wire::decode(&bytes).unwrap()
    }

    #[tokio::test]
    async fn persists_hosted_task() {
        let node = node_with_job();
        let request = PersistJobRequest::new("job-42").for_task(TaskId::new("n1", 4));
        let response = ask(&node, &request).await;
        assert!(response.is_persisted());
        assert!(!response.tasks().has_failures());
    }

    #[tokio::test]
    async fn unknown_task_is_a_task_failure() {
        let node = node_with_job();
        let request = PersistJobRequest::new("job-42").for_task(TaskId::new("n1", 5));
        let response = ask(&node, &request).await;
        assert!(!response.is_persisted());
        assert_eq!(response.task_failures().len(), 1);
        assert!(response.task_failures()[0].reason.contains("not running"));
    }

    #[tokio::test]
    async fn task_on_other_node_is_a_task_failure() {
        let node = node_with_job();
        let target = TaskTarget::new("job-42")
            .with_task(TaskId::new("n2", 4))
            .with_nodes(vec![NodeId::from("n1"), NodeId::from("n2")]);
        let response = ask(&node, &PersistJobRequest::from_target(target)).await;
        assert_eq!(response.task_failures().len(), 1);
        assert!(response.task_failures()[0].reason.contains("not hosted on node n1"));
    }

    #[tokio::test]
    async fn request_without_task_is_a_node_failure() {
        let node = node_with_job();
        let response = ask(&node, &PersistJobRequest::new("job-42")).await;
        assert_eq!(response.node_failures().len(), 1);
        assert!(response.task_failures().is_empty());
    }

    #[tokio::test]
    async fn request_filtered_to_other_node_is_a_node_failure() {
        let node = node_with_job();
        let request = PersistJobRequest::new("job-42").for_task(TaskId::new("n2", 4));
        let response = ask(&node, &request).await;
        assert!(!response.is_persisted());
        assert_eq!(response.node_failures().len(), 1);
        assert!(response.node_failures()[0].reason.contains("not addressed to node n1"));
    }

    #[tokio::test]
    async fn request_for_other_action_is_a_node_failure() {
        let node = node_with_job();
        let target = TaskTarget::new("job-42")
            .with_task(TaskId::new("n1", 4))
            .with_actions(vec!["cluster:admin/jobwire/job/close".to_string()]);
        let response = ask(&node, &PersistJobRequest::from_target(target)).await;
        assert!(!response.is_persisted());
        assert_eq!(response.node_failures().len(), 1);

        let target = TaskTarget::new("job-42")
            .with_task(TaskId::new("n1", 4))
            .with_actions(vec![PersistJobAction::NAME.to_string()]);
        assert!(ask(&node, &PersistJobRequest::from_target(target)).await.is_persisted());
    }

    #[tokio::test]
    async fn unknown_action_is_a_transport_error() {
        let node = node_with_job();
        let err = node.handle("cluster:admin/missing", &[]).await.unwrap_err();
        assert!(matches!(err, TransportError::UnknownAction { .. }));
    }

    #[tokio::test]
    async fn malformed_payload_is_a_bad_request() {
        let node = node_with_job();
        let err = node.handle(PersistJobAction::NAME, &[0x07]).await.unwrap_err();
        assert!(matches!(err, TransportError::BadRequest { .. }));
    }
}
