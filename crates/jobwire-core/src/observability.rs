use serde::{Deserialize, Serialize};

use crate::domain::AggregatedResponse;

/// Counters of one finalized dispatch, for logs and reports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationSummary {
    pub persisted: bool,
    pub responded: usize,
    pub task_failures: usize,
    pub node_failures: usize,
}

impl From<&AggregatedResponse> for AggregationSummary {
    fn from(response: &AggregatedResponse) -> Self {
        Self {
            persisted: response.is_persisted(),
            responded: response.node_results().len(),
            task_failures: response.task_failures().len(),
            node_failures: response.node_failures().len(),
        }
    }
}
