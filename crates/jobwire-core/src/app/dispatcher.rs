//! TaskActionDispatcher - caller-facing entry point
//!
//! persist_job の流れ:
//! 1. resolve: job → 実行中の task 一覧（空なら ResolutionError）
//! 2. fan out: task ごとに request を stamp して encode、並行に送信
//! 3. collect: 各 node の結果・失敗を aggregator に記録
//! 4. finalize: 全 node が答えるか、timeout / cancel で一度だけ確定

use std::future;
use std::sync::Arc;

use tokio::sync::{Semaphore, watch};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::aggregator::{NO_RESPONSE_REASON, ResponseAggregator};
use super::config::DispatchConfig;
use crate::action::{PersistJobAction, TaskAction};
use crate::domain::{
    AggregatedResponse, AggregatorError, DispatchError, DispatchId, ExecutionError, JobId,
    NodeFailure, NodeResult, PersistJobRequest, PersistJobResponse, ResolutionError, TaskFailure,
    TaskId, TaskTarget,
};
use crate::observability::AggregationSummary;
use crate::ports::{IdGenerator, NodeTransport, TaskResolver};
use crate::wire;

pub const TIMED_OUT_REASON: &str = "timed out";
pub const CANCELLED_REASON: &str = "cancelled";

/// How the wait for node answers ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Completion {
    AllAnswered,
    TimedOut,
    Cancelled,
}

pub struct TaskActionDispatcher {
    resolver: Arc<dyn TaskResolver>,
    transport: Arc<dyn NodeTransport>,
    ids: Arc<dyn IdGenerator>,
    config: DispatchConfig,
}

impl TaskActionDispatcher {
    pub(crate) fn new(
        resolver: Arc<dyn TaskResolver>,
        transport: Arc<dyn NodeTransport>,
        ids: Arc<dyn IdGenerator>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            resolver,
            transport,
            ids,
            config,
        }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub async fn persist_job(
        &self,
        job_id: impl Into<JobId>,
    ) -> Result<AggregatedResponse, DispatchError> {
        let (_never, cancel) = watch::channel(false);
        self.persist_job_with_cancel(job_id, cancel).await
    }

    /// Like `persist_job`, but stops waiting once `cancel` turns `true`.
    ///
    /// Whatever was collected by then is still returned; silent nodes are
    /// recorded as cancelled.
    pub async fn persist_job_with_cancel(
        &self,
        job_id: impl Into<JobId>,
        mut cancel: watch::Receiver<bool>,
    ) -> Result<AggregatedResponse, DispatchError> {
        let job_id = job_id.into();
        let dispatch_id = self.ids.generate_dispatch_id();

        let tasks = self.resolver.resolve(&job_id).await?;
        if tasks.is_empty() {
            return Err(ResolutionError::JobNotRunning(job_id).into());
        }
        info!(%dispatch_id, %job_id, tasks = tasks.len(), action = PersistJobAction::NAME, "dispatching");

        let request = PersistJobRequest::from_target(
            TaskTarget::new(job_id.clone()).with_timeout(self.config.timeout()),
        );
        let aggregator = Arc::new(ResponseAggregator::new(tasks.iter().cloned())?);
        let permits = Arc::new(Semaphore::new(self.config.max_in_flight));

        let mut in_flight = JoinSet::new();
        for task in tasks {
            in_flight.spawn(ask_task(
                Arc::clone(&self.transport),
                Arc::clone(&aggregator),
                Arc::clone(&permits),
                request.for_task(task.clone()),
                task,
                dispatch_id,
            ));
        }

        let deadline = tokio::time::sleep(self.config.timeout());
        tokio::pin!(deadline);
        let completion = loop {
            tokio::select! {
                joined = in_flight.join_next() => match joined {
                    None => break Completion::AllAnswered,
                    Some(Err(err)) if err.is_panic() => {
                        warn!(%dispatch_id, "node path panicked; its node will count as silent");
                    }
                    Some(_) => {}
                },
                _ = &mut deadline => break Completion::TimedOut,
                _ = cancelled(&mut cancel) => break Completion::Cancelled,
            }
        };
        in_flight.abort_all();

        // aborted paths may still be mid-record; finalizing under the
        // aggregator's lock decides which side of the cut they land on
        let reason = match completion {
            Completion::AllAnswered => NO_RESPONSE_REASON,
            Completion::TimedOut => TIMED_OUT_REASON,
            Completion::Cancelled => CANCELLED_REASON,
        };
        let response = aggregator.finalize_with_reason(reason)?;
        let summary = AggregationSummary::from(&response);
        info!(
            %dispatch_id,
            %job_id,
            persisted = response.is_persisted(),
            responded = summary.responded,
            task_failures = summary.task_failures,
            node_failures = summary.node_failures,
            "dispatch finished"
        );
        Ok(response)
    }
}

/// Resolves when `cancel` becomes `true`; never resolves if the sender is gone.
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    loop {
        if *cancel.borrow_and_update() {
            return;
        }
        if cancel.changed().await.is_err() {
            future::pending::<()>().await;
        }
    }
}

/// One node path: send, decode, record. Failures are recorded, never returned.
async fn ask_task(
    transport: Arc<dyn NodeTransport>,
    aggregator: Arc<ResponseAggregator>,
    permits: Arc<Semaphore>,
    request: PersistJobRequest,
    task: TaskId,
    dispatch_id: DispatchId,
) {
    // the semaphore is never closed
    let Ok(_permit) = permits.acquire_owned().await else {
        return;
    };
    let node = task.node().clone();
    let payload = match wire::encode(&request) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(%dispatch_id, %task, error = %err, "request could not be encoded");
            let recorded = aggregator.record_task_failure(TaskFailure::new(task, err.to_string()));
            if let Err(err) = recorded {
                debug!(%dispatch_id, error = %err, "answer not recorded");
            }
            return;
        }
    };

    let recorded = match transport.send(&node, PersistJobAction::NAME, payload).await {
        Err(err) => {
            warn!(%dispatch_id, %node, error = %err, "send failed");
            aggregator.record_node_failure(NodeFailure::new(node, err.to_string()))
        }
        Ok(bytes) => match wire::decode::<PersistJobResponse>(&bytes) {
            Err(err) => {
                let err = ExecutionError::from(err);
                warn!(%dispatch_id, %task, error = %err, "undecodable response");
                aggregator.record_task_failure(TaskFailure::new(task, err.to_string()))
            }
            Ok(response) => record_response(&aggregator, task, response, dispatch_id),
        },
    };

    if let Err(err) = recorded {
        debug!(%dispatch_id, error = %err, "answer not recorded");
    }
}

fn record_response(
    aggregator: &ResponseAggregator,
    task: TaskId,
    response: PersistJobResponse,
    dispatch_id: DispatchId,
) -> Result<(), AggregatorError> {
    if !response.tasks().has_failures() {
        debug!(%dispatch_id, %task, persisted = response.is_persisted(), "node answered");
        return aggregator.record_result(task, NodeResult::new(response.is_persisted()));
    }
    for failure in response.task_failures() {
        warn!(%dispatch_id, task = %failure.task, reason = %failure.reason, "task failed");
        aggregator.record_task_failure(failure.clone())?;
    }
    for failure in response.node_failures() {
        warn!(%dispatch_id, node = %failure.node, reason = %failure.reason, "node failed");
        aggregator.record_node_failure(failure.clone())?;
    }
    Ok(())
}
