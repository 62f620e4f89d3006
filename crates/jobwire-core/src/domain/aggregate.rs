//! AggregatedResponse - the frozen value a caller receives.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use super::node_result::NodeReport;
use super::response::{NodeFailure, PersistJobResponse, TaskFailure};

/// Per-node outcomes merged into one response.
///
/// `persisted()` is `None` when no node answered successfully; in that case
/// the failure lists are never both empty. Equality and hashing look at
/// `is_persisted()` only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedResponse {
    response: PersistJobResponse,
    node_results: Vec<NodeReport>,
}

impl AggregatedResponse {
    pub(crate) fn new(response: PersistJobResponse, node_results: Vec<NodeReport>) -> Self {
        Self {
            response,
            node_results,
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.response.is_persisted()
    }

    /// The deciding node's outcome, if any node answered successfully.
    pub fn persisted(&self) -> Option<bool> {
        self.node_results.first().map(|r| r.result.persisted)
    }

    /// Successful node results in arrival order.
    pub fn node_results(&self) -> &[NodeReport] {
        &self.node_results
    }

    pub fn task_failures(&self) -> &[TaskFailure] {
        self.response.task_failures()
    }

    pub fn node_failures(&self) -> &[NodeFailure] {
        self.response.node_failures()
    }

    pub fn has_failures(&self) -> bool {
        self.response.tasks().has_failures()
    }

    pub fn failure_count(&self) -> usize {
        self.task_failures().len() + self.node_failures().len()
    }

    pub fn response(&self) -> &PersistJobResponse {
        &self.response
    }

    pub fn into_response(self) -> PersistJobResponse {
        self.response
    }
}

impl PartialEq for AggregatedResponse {
    fn eq(&self, other: &Self) -> bool {
        self.response == other.response
    }
}

impl Eq for AggregatedResponse {}

impl Hash for AggregatedResponse {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.response.hash(state);
    }
}
