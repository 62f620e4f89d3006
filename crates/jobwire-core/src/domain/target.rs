//! Task-targeting fields shared by every request aimed at a job task.
//!
//! A request carries these fields as an embedded `TaskTarget` rather than
//! redefining them, so every task action encodes its base section the same way.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::errors::CodecError;
use super::ids::{JobId, NodeId, TaskId};
use crate::wire::{Readable, StreamInput, StreamOutput, Writeable};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskTarget {
    /// Task on the sending side that spawned this request, if any.
    parent_task: Option<TaskId>,
    /// Resolved task the receiving node should act on.
    task: Option<TaskId>,
    /// Only nodes in this list act on the request. Empty means no filter.
    nodes: Vec<NodeId>,
    /// Only tasks running one of these actions match. Empty means no filter.
    actions: Vec<String>,
    timeout: Option<Duration>,
    job_id: JobId,
}

impl TaskTarget {
    pub fn new(job_id: impl Into<JobId>) -> Self {
        Self {
            parent_task: None,
            task: None,
            nodes: Vec::new(),
            actions: Vec::new(),
            timeout: None,
            job_id: job_id.into(),
        }
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    pub fn parent_task(&self) -> Option<&TaskId> {
        self.parent_task.as_ref()
    }

    pub fn task(&self) -> Option<&TaskId> {
        self.task.as_ref()
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn actions(&self) -> &[String] {
        &self.actions
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn with_parent_task(mut self, parent: TaskId) -> Self {
        self.parent_task = Some(parent);
        self
    }

    /// Points the request at one resolved task and restricts it to that task's node.
    pub fn with_task(mut self, task: TaskId) -> Self {
        self.nodes = vec![task.node().clone()];
        self.task = Some(task);
        self
    }

    /// Replaces the node filter.
    pub fn with_nodes(mut self, nodes: Vec<NodeId>) -> Self {
        self.nodes = nodes;
        self
    }

    pub fn with_actions(mut self, actions: Vec<String>) -> Self {
        self.actions = actions;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Does `node` pass the node filter?
    pub fn targets_node(&self, node: &NodeId) -> bool {
        self.nodes.is_empty() || self.nodes.contains(node)
    }

    /// Does `action` pass the action filter?
    pub fn targets_action(&self, action: &str) -> bool {
        self.actions.is_empty() || self.actions.iter().any(|a| a == action)
    }
}

/// Presence marker, then `[string node][long id]`.
fn write_task_id(out: &mut StreamOutput, task: Option<&TaskId>) -> Result<(), CodecError> {
    out.write_optional(task, |out, task| {
        out.write_string(task.node().as_str())?;
        out.write_long(task.id());
        Ok(())
    })
}

fn read_task_id(input: &mut StreamInput<'_>) -> Result<Option<TaskId>, CodecError> {
    input.read_optional(|input| {
        let node = input.read_string()?;
        let id = input.read_long()?;
        Ok(TaskId::new(node, id))
    })
}

impl Writeable for TaskTarget {
    fn write_to(&self, out: &mut StreamOutput) -> Result<(), CodecError> {
        write_task_id(out, self.parent_task.as_ref())?;
        write_task_id(out, self.task.as_ref())?;
        let nodes: Vec<&str> = self.nodes.iter().map(NodeId::as_str).collect();
        out.write_string_list(nodes.as_slice())?;
        out.write_string_list(self.actions.as_slice())?;
        // millis are enough resolution for a dispatch timeout
        out.write_optional(self.timeout.as_ref(), |out, t| {
            out.write_vlong(u64::try_from(t.as_millis()).unwrap_or(u64::MAX));
            Ok(())
        })?;
        out.write_string(self.job_id.as_str())
    }
}

impl Readable for TaskTarget {
    fn read_from(input: &mut StreamInput<'_>) -> Result<Self, CodecError> {
        let parent_task = read_task_id(input)?;
        let task = read_task_id(input)?;
        let nodes = input
            .read_string_list()?
            .into_iter()
            .map(NodeId::from)
            .collect();
        let actions = input.read_string_list()?;
        let timeout = input.read_optional(|i| i.read_vlong().map(Duration::from_millis))?;
        let job_id = JobId::from(input.read_string()?);
        Ok(Self {
            parent_task,
            task,
            nodes,
            actions,
            timeout,
            job_id,
        })
    }
}
