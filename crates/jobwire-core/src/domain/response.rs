//! Aggregated-task response fields and the persist response built on them.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use super::errors::CodecError;
use super::ids::{NodeId, TaskId};
use super::node_result::NodeResult;
use crate::wire::{Readable, StreamInput, StreamOutput, Writeable};

/// A node ran the operation against its task and the operation failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFailure {
    pub task: TaskId,
    pub reason: String,
}

impl TaskFailure {
    pub fn new(task: TaskId, reason: impl Into<String>) -> Self {
        Self {
            task,
            reason: reason.into(),
        }
    }

    pub fn node(&self) -> &NodeId {
        self.task.node()
    }
}

impl Writeable for TaskFailure {
    fn write_to(&self, out: &mut StreamOutput) -> Result<(), CodecError> {
        out.write_string(self.task.node().as_str())?;
        out.write_long(self.task.id());
        out.write_string(&self.reason)
    }
}

impl Readable for TaskFailure {
    fn read_from(input: &mut StreamInput<'_>) -> Result<Self, CodecError> {
        let node = input.read_string()?;
        let id = input.read_long()?;
        let reason = input.read_string()?;
        Ok(Self::new(TaskId::new(node, id), reason))
    }
}

/// A node could not be asked at all, or never answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeFailure {
    pub node: NodeId,
    pub reason: String,
}

impl NodeFailure {
    pub fn new(node: NodeId, reason: impl Into<String>) -> Self {
        Self {
            node,
            reason: reason.into(),
        }
    }
}

impl Writeable for NodeFailure {
    fn write_to(&self, out: &mut StreamOutput) -> Result<(), CodecError> {
        out.write_string(self.node.as_str())?;
        out.write_string(&self.reason)
    }
}

impl Readable for NodeFailure {
    fn read_from(input: &mut StreamInput<'_>) -> Result<Self, CodecError> {
        let node = NodeId::from(input.read_string()?);
        let reason = input.read_string()?;
        Ok(Self::new(node, reason))
    }
}

/// Failure bookkeeping every task-action response carries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TasksResponse {
    task_failures: Vec<TaskFailure>,
    node_failures: Vec<NodeFailure>,
}

impl TasksResponse {
    pub fn new(task_failures: Vec<TaskFailure>, node_failures: Vec<NodeFailure>) -> Self {
        Self {
            task_failures,
            node_failures,
        }
    }

    pub fn task_failures(&self) -> &[TaskFailure] {
        &self.task_failures
    }

    pub fn node_failures(&self) -> &[NodeFailure] {
        &self.node_failures
    }

    pub fn has_failures(&self) -> bool {
        !self.task_failures.is_empty() || !self.node_failures.is_empty()
    }
}

impl Writeable for TasksResponse {
    fn write_to(&self, out: &mut StreamOutput) -> Result<(), CodecError> {
        out.write_list(self.task_failures.as_slice())?;
        out.write_list(self.node_failures.as_slice())
    }
}

impl Readable for TasksResponse {
    fn read_from(input: &mut StreamInput<'_>) -> Result<Self, CodecError> {
        let task_failures: Vec<TaskFailure> = input.read_list()?;
        let node_failures: Vec<NodeFailure> = input.read_list()?;
        Ok(Self::new(task_failures, node_failures))
    }
}

/// Response of the persist action, both per node and as handed to the caller.
///
/// Equality and hashing look at `persisted` only. Failures must be asserted
/// separately.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistJobResponse {
    #[serde(flatten)]
    tasks: TasksResponse,
    persisted: bool,
}

impl PersistJobResponse {
    pub fn new(persisted: bool) -> Self {
        Self {
            tasks: TasksResponse::default(),
            persisted,
        }
    }

    pub fn with_failures(tasks: TasksResponse, persisted: bool) -> Self {
        Self { tasks, persisted }
    }

    /// Response a node sends when its task failed.
    pub fn task_failed(failure: TaskFailure) -> Self {
        Self::with_failures(TasksResponse::new(vec![failure], Vec::new()), false)
    }

    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    pub fn tasks(&self) -> &TasksResponse {
        &self.tasks
    }

    pub fn task_failures(&self) -> &[TaskFailure] {
        self.tasks.task_failures()
    }

    pub fn node_failures(&self) -> &[NodeFailure] {
        self.tasks.node_failures()
    }
}

impl From<NodeResult> for PersistJobResponse {
    fn from(result: NodeResult) -> Self {
        Self::new(result.persisted)
    }
}

impl PartialEq for PersistJobResponse {
    fn eq(&self, other: &Self) -> bool {
        self.persisted == other.persisted
    }
}

impl Eq for PersistJobResponse {}

impl Hash for PersistJobResponse {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.persisted.hash(state);
    }
}

impl Writeable for PersistJobResponse {
    fn write_to(&self, out: &mut StreamOutput) -> Result<(), CodecError> {
        self.tasks.write_to(out)?;
        out.write_bool(self.persisted);
        Ok(())
    }
}

impl Readable for PersistJobResponse {
    fn read_from(input: &mut StreamInput<'_>) -> Result<Self, CodecError> {
        let tasks = TasksResponse::read_from(input)?;
        let persisted = input.read_bool()?;
        Ok(Self { tasks, persisted })
    }
}
