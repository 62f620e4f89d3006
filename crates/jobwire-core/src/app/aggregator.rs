//! ResponseAggregator - merges per-node outcomes into one response
//!
//! State transitions:
//! - Empty -> Collecting (first result or failure)
//! - Empty | Collecting -> Finalized (`finalize`, exactly once)
//!
//! Every recording path takes the same lock, so concurrent node paths update
//! one at a time. Reads before finalization may see partial state.
//!
//! Each expected task answers once. A second answer for the same task is
//! rejected with `AlreadyAnswered`, and a rejected update leaves the phase as it was.
//!
//! # Aggregation policy
//! One task owns a job at a time, so the first successful `NodeResult` to
//! arrive decides `persisted`. Later successes are kept in `node_results` and
//! logged, since a second owner means membership is inconsistent.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::{
    AggregatedResponse, AggregatorError, NodeFailure, NodeId, NodeReport, NodeResult,
    PersistJobResponse, TaskFailure, TaskId, TasksResponse,
};

/// Reason recorded for nodes still silent when the aggregator is finalized.
pub const NO_RESPONSE_REASON: &str = "no response before finalize";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggregatorPhase {
    Empty,
    Collecting,
    Finalized,
}

struct AggregatorState {
    phase: AggregatorPhase,
    /// Expected tasks and whether they have answered (success or failure).
    expected: BTreeMap<TaskId, bool>,
    node_results: Vec<NodeReport>,
    task_failures: Vec<TaskFailure>,
    node_failures: Vec<NodeFailure>,
}

impl AggregatorState {
    fn ensure_open(&self) -> Result<(), AggregatorError> {
        match self.phase {
            AggregatorPhase::Finalized => Err(AggregatorError::AlreadyFinalized),
            _ => Ok(()),
        }
    }

    /// Marks one task answered. Nothing changes if the update is rejected.
    fn mark_task(&mut self, task: &TaskId) -> Result<(), AggregatorError> {
        self.ensure_open()?;
        match self.expected.get_mut(task) {
            Some(answered) if *answered => Err(AggregatorError::AlreadyAnswered(task.clone())),
            Some(answered) => {
                *answered = true;
                self.phase = AggregatorPhase::Collecting;
                Ok(())
            }
            None => Err(AggregatorError::UnexpectedNode(task.node().clone())),
        }
    }

    /// Marks every still-pending task on `node` answered.
    fn mark_node(&mut self, node: &NodeId) -> Result<(), AggregatorError> {
        self.ensure_open()?;
        let mut first = None;
        let mut marked = false;
        for (task, answered) in self.expected.iter_mut() {
            if task.node() != node {
                continue;
            }
            first.get_or_insert_with(|| task.clone());
            if !*answered {
                *answered = true;
                marked = true;
            }
        }
        match (first, marked) {
            (None, _) => Err(AggregatorError::UnexpectedNode(node.clone())),
            (Some(task), false) => Err(AggregatorError::AlreadyAnswered(task)),
            (Some(_), true) => {
                self.phase = AggregatorPhase::Collecting;
                Ok(())
            }
        }
    }

    fn pending_nodes(&self) -> Vec<NodeId> {
        let mut nodes: Vec<NodeId> = self
            .expected
            .iter()
            .filter(|(_, answered)| !**answered)
            .map(|(task, _)| task.node().clone())
            .collect();
        nodes.dedup();
        nodes
    }
}

pub struct ResponseAggregator {
    state: Mutex<AggregatorState>,
    frozen: OnceLock<AggregatedResponse>,
}

impl ResponseAggregator {
    /// Aggregator for a request sent to `expected` tasks.
    pub fn new(expected: impl IntoIterator<Item = TaskId>) -> Result<Self, AggregatorError> {
        let expected: BTreeMap<TaskId, bool> = expected.into_iter().map(|t| (t, false)).collect();
        if expected.is_empty() {
            return Err(AggregatorError::NoExpectedNodes);
        }
        Ok(Self {
            state: Mutex::new(AggregatorState {
                phase: AggregatorPhase::Empty,
                expected,
                node_results: Vec::new(),
                task_failures: Vec::new(),
                node_failures: Vec::new(),
            }),
            frozen: OnceLock::new(),
        })
    }

    // A panic while holding the lock cannot leave the state half-written:
    // every mutation is a push or a flag flip.
    fn lock(&self) -> MutexGuard<'_, AggregatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn phase(&self) -> AggregatorPhase {
        self.lock().phase
    }

    /// Nodes hosting at least one expected task that has not answered yet.
    pub fn pending_nodes(&self) -> Vec<NodeId> {
        self.lock().pending_nodes()
    }

    pub fn record_result(&self, task: TaskId, result: NodeResult) -> Result<(), AggregatorError> {
        let mut state = self.lock();
        state.mark_task(&task)?;
        if let Some(first) = state.node_results.first() {
            warn!(
                deciding = %first.task,
                extra = %task,
                persisted = result.persisted,
                "more than one task answered for the same job; keeping the first result"
            );
        }
        state.node_results.push(NodeReport { task, result });
        Ok(())
    }

    pub fn record_task_failure(&self, failure: TaskFailure) -> Result<(), AggregatorError> {
        let mut state = self.lock();
        state.mark_task(&failure.task)?;
        state.task_failures.push(failure);
        Ok(())
    }

    /// Records a failure for a whole node; its pending tasks count as answered.
    ///
    /// Rejected with `AlreadyAnswered` when no task on the node is pending.
    pub fn record_node_failure(&self, failure: NodeFailure) -> Result<(), AggregatorError> {
        let mut state = self.lock();
        state.mark_node(&failure.node)?;
        state.node_failures.push(failure);
        Ok(())
    }

    /// Freezes the response. Nodes that never answered become node failures.
    pub fn finalize(&self) -> Result<AggregatedResponse, AggregatorError> {
        self.finalize_with_reason(NO_RESPONSE_REASON)
    }

    /// Like `finalize`, recording silent nodes with `reason`.
    ///
    /// Marking the silent nodes and freezing happen under one lock, so no
    /// answer can land in between.
    pub fn finalize_with_reason(&self, reason: &str) -> Result<AggregatedResponse, AggregatorError> {
        let mut state = self.lock();
        state.ensure_open()?;
        for node in state.pending_nodes() {
            warn!(%node, reason, "node did not answer");
            state.node_failures.push(NodeFailure::new(node, reason));
        }
        for answered in state.expected.values_mut() {
            *answered = true;
        }
        state.phase = AggregatorPhase::Finalized;

        let persisted = state
            .node_results
            .first()
            .is_some_and(|report| report.result.persisted);
        let tasks = TasksResponse::new(
            std::mem::take(&mut state.task_failures),
            std::mem::take(&mut state.node_failures),
        );
        let response = AggregatedResponse::new(
            PersistJobResponse::with_failures(tasks, persisted),
            std::mem::take(&mut state.node_results),
        );
        // only reachable once: the phase check above runs under the same lock
        let _ = self.frozen.set(response.clone());
        Ok(response)
    }

    /// The frozen response, once finalized.
    pub fn response(&self) -> Option<&AggregatedResponse> {
        self.frozen.get()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn task(node: &str) -> TaskId {
        TaskId::new(node, 1)
    }

    #[test]
    fn needs_at_least_one_expected_task() {
        assert_eq!(
            ResponseAggregator::new(Vec::new()).err(),
            Some(AggregatorError::NoExpectedNodes)
        );
    }

    #[test]
    fn phases_move_forward() {
        let agg = ResponseAggregator::new([task("n1"), task("n2")]).unwrap();
        assert_eq!(agg.phase(), AggregatorPhase::Empty);

        agg.record_result(task("n1"), NodeResult::new(true)).unwrap();
        assert_eq!(agg.phase(), AggregatorPhase::Collecting);

        agg.finalize().unwrap();
        assert_eq!(agg.phase(), AggregatorPhase::Finalized);
    }

    #[test]
    fn single_success_is_persisted_without_failures() {
        let agg = ResponseAggregator::new([task("n1")]).unwrap();
        agg.record_result(task("n1"), NodeResult::new(true)).unwrap();

        let response = agg.finalize().unwrap();
        assert!(response.is_persisted());
        assert_eq!(response.persisted(), Some(true));
        assert!(!response.has_failures());
        assert_eq!(response.node_results().len(), 1);
    }

    #[test]
    fn single_success_reporting_not_persisted() {
        let agg = ResponseAggregator::new([task("n1")]).unwrap();
        agg.record_result(task("n1"), NodeResult::new(false)).unwrap();

        let response = agg.finalize().unwrap();
        assert!(!response.is_persisted());
        assert_eq!(response.persisted(), Some(false));
    }

    #[test]
    fn zero_successes_surface_failures() {
        let agg = ResponseAggregator::new([task("n1"), task("n2")]).unwrap();
        agg.record_task_failure(TaskFailure::new(task("n1"), "disk full"))
            .unwrap();
        agg.record_node_failure(NodeFailure::new(NodeId::from("n2"), "unreachable"))
            .unwrap();

        let response = agg.finalize().unwrap();
        assert!(!response.is_persisted());
        assert_eq!(response.persisted(), None);
        assert_eq!(response.task_failures().len(), 1);
        assert_eq!(response.node_failures().len(), 1);
    }

    #[test]
    fn silent_nodes_become_failures_on_finalize() {
        let agg = ResponseAggregator::new([task("n1"), task("n2")]).unwrap();
        agg.record_result(task("n1"), NodeResult::new(true)).unwrap();
        assert_eq!(agg.pending_nodes(), vec![NodeId::from("n2")]);

        let response = agg.finalize().unwrap();
        assert!(response.is_persisted());
        assert_eq!(
            response.node_failures(),
            &[NodeFailure::new(NodeId::from("n2"), NO_RESPONSE_REASON)]
        );
        assert!(agg.pending_nodes().is_empty());
    }

    #[test]
    fn finalizing_empty_aggregator_never_yields_silent_success() {
        let agg = ResponseAggregator::new([task("n1")]).unwrap();
        let response = agg.finalize().unwrap();
        assert!(!response.is_persisted());
        assert!(response.has_failures());
    }

    #[test]
    fn first_success_decides() {
        let agg = ResponseAggregator::new([task("n1"), task("n2")]).unwrap();
        agg.record_result(task("n2"), NodeResult::new(false)).unwrap();
        agg.record_result(task("n1"), NodeResult::new(true)).unwrap();

        let response = agg.finalize().unwrap();
        assert!(!response.is_persisted());
        assert_eq!(response.node_results()[0].node(), &NodeId::from("n2"));
        assert_eq!(response.node_results().len(), 2);
    }

    #[test]
    fn finalize_twice_is_misuse() {
        let agg = ResponseAggregator::new([task("n1")]).unwrap();
        agg.record_result(task("n1"), NodeResult::new(true)).unwrap();
        agg.finalize().unwrap();
        assert_eq!(agg.finalize().err(), Some(AggregatorError::AlreadyFinalized));
    }

    #[test]
    fn updates_after_finalize_are_rejected() {
        let agg = ResponseAggregator::new([task("n1")]).unwrap();
        agg.finalize().unwrap();
        assert_eq!(
            agg.record_result(task("n1"), NodeResult::new(true)),
            Err(AggregatorError::AlreadyFinalized)
        );
        assert_eq!(
            agg.record_node_failure(NodeFailure::new(NodeId::from("n1"), "late")),
            Err(AggregatorError::AlreadyFinalized)
        );
    }

    #[test]
    fn reads_after_finalize_are_stable() {
        let agg = ResponseAggregator::new([task("n1")]).unwrap();
        assert!(agg.response().is_none());
        agg.record_task_failure(TaskFailure::new(task("n1"), "boom"))
            .unwrap();
        let returned = agg.finalize().unwrap();

        let first = agg.response().unwrap();
        let second = agg.response().unwrap();
        assert!(std::ptr::eq(first, second));
        assert_eq!(first.task_failures(), returned.task_failures());
    }

    #[test]
    fn unknown_task_is_rejected() {
        let agg = ResponseAggregator::new([task("n1")]).unwrap();
        assert_eq!(
            agg.record_result(task("n9"), NodeResult::new(true)),
            Err(AggregatorError::UnexpectedNode(NodeId::from("n9")))
        );
    }

    #[test]
    fn second_answer_for_a_task_is_rejected() {
        let agg = ResponseAggregator::new([task("n1"), task("n2")]).unwrap();
        agg.record_task_failure(TaskFailure::new(task("n1"), "disk full"))
            .unwrap();
        assert_eq!(
            agg.record_result(task("n1"), NodeResult::new(true)),
            Err(AggregatorError::AlreadyAnswered(task("n1")))
        );
        agg.record_result(task("n2"), NodeResult::new(true)).unwrap();
        assert_eq!(
            agg.record_result(task("n2"), NodeResult::new(true)),
            Err(AggregatorError::AlreadyAnswered(task("n2")))
        );

        let response = agg.finalize().unwrap();
        assert_eq!(response.node_results().len(), 1);
        assert_eq!(response.task_failures().len(), 1);
        assert_eq!(response.node_results()[0].node(), &NodeId::from("n2"));
    }

    #[test]
    fn node_failure_after_every_task_answered_is_rejected() {
        let agg = ResponseAggregator::new([task("n1")]).unwrap();
        agg.record_result(task("n1"), NodeResult::new(true)).unwrap();
        assert_eq!(
            agg.record_node_failure(NodeFailure::new(NodeId::from("n1"), "timed out")),
            Err(AggregatorError::AlreadyAnswered(task("n1")))
        );
        assert!(!agg.finalize().unwrap().has_failures());
    }

    #[test]
    fn node_failure_only_marks_pending_tasks() {
        let agg = ResponseAggregator::new([TaskId::new("n1", 1), TaskId::new("n1", 2)]).unwrap();
        agg.record_result(TaskId::new("n1", 1), NodeResult::new(true)).unwrap();
        agg.record_node_failure(NodeFailure::new(NodeId::from("n1"), "unreachable"))
            .unwrap();
        assert!(agg.pending_nodes().is_empty());
        assert_eq!(
            agg.record_task_failure(TaskFailure::new(TaskId::new("n1", 2), "late")),
            Err(AggregatorError::AlreadyAnswered(TaskId::new("n1", 2)))
        );
    }

    #[test]
    fn rejected_update_keeps_phase() {
        let agg = ResponseAggregator::new([task("n1")]).unwrap();
        assert!(agg.record_result(task("n9"), NodeResult::new(true)).is_err());
        assert!(agg
            .record_node_failure(NodeFailure::new(NodeId::from("n9"), "unreachable"))
            .is_err());
        assert_eq!(agg.phase(), AggregatorPhase::Empty);
    }

    #[test]
    fn finalize_with_reason_labels_silent_nodes() {
        let agg = ResponseAggregator::new([task("n1"), task("n2")]).unwrap();
        agg.record_result(task("n1"), NodeResult::new(true)).unwrap();

        let response = agg.finalize_with_reason("timed out").unwrap();
        assert!(response.is_persisted());
        assert_eq!(
            response.node_failures(),
            &[NodeFailure::new(NodeId::from("n2"), "timed out")]
        );
        assert_eq!(
            agg.finalize_with_reason("cancelled").err(),
            Some(AggregatorError::AlreadyFinalized)
        );
    }

    #[test]
    fn answers_racing_finalize_land_on_one_side_only() {
        for _ in 0..50 {
            let tasks: Vec<TaskId> = (0..8).map(|i| TaskId::new(format!("n{i}"), 1)).collect();
            let agg = ResponseAggregator::new(tasks.clone()).unwrap();

            std::thread::scope(|scope| {
                for task in &tasks {
                    let agg = &agg;
                    scope.spawn(move || {
                        let _ = agg.record_result(task.clone(), NodeResult::new(true));
                    });
                }
                scope.spawn(|| agg.finalize_with_reason("timed out").unwrap());
            });

            let response = agg.response().unwrap();
            for task in &tasks {
                let answered = response.node_results().iter().any(|r| &r.task == task);
                let failed = response.node_failures().iter().any(|f| &f.node == task.node());
                assert!(answered != failed, "{task} answered={answered} failed={failed}");
            }
        }
    }

    #[test]
    fn concurrent_updates_are_all_kept() {
        let tasks: Vec<TaskId> = (0..16).map(|i| TaskId::new(format!("n{i}"), 1)).collect();
        let agg = Arc::new(ResponseAggregator::new(tasks.clone()).unwrap());

        std::thread::scope(|scope| {
            for (i, task) in tasks.iter().enumerate() {
                let agg = Arc::clone(&agg);
                scope.spawn(move || {
                    if i % 2 == 0 {
                        agg.record_result(task.clone(), NodeResult::new(true)).unwrap();
                    } else {
                        agg.record_task_failure(TaskFailure::new(task.clone(), "boom"))
                            .unwrap();
                    }
                });
            }
        });

        let response = agg.finalize().unwrap();
        assert_eq!(response.node_results().len(), 8);
        assert_eq!(response.task_failures().len(), 8);
        assert!(response.node_failures().is_empty());
    }
}
