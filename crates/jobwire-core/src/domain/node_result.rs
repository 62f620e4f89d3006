use serde::{Deserialize, Serialize};

use super::ids::{NodeId, TaskId};

/// Outcome of one node's attempt to persist its local task.
///
/// No retries happen at this layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeResult {
    pub persisted: bool,
}

impl NodeResult {
    pub fn new(persisted: bool) -> Self {
        Self { persisted }
    }
}

/// A `NodeResult` together with the task that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeReport {
    pub task: TaskId,
    pub result: NodeResult,
}

impl NodeReport {
    pub fn node(&self) -> &NodeId {
        self.task.node()
    }
}
