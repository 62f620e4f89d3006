//! Errors - エラー型と分類
//!
//! Node-level failures (`ExecutionError`, `CodecError` on a response,
//! `TransportError`) are recorded by the aggregator as data. Only
//! `ResolutionError` and `AggregatorError` reach the caller as `DispatchError`.

use thiserror::Error;

use super::ids::{JobId, NodeId, TaskId};

/// Malformed bytes on decode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("unexpected end of stream: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof { needed: usize, remaining: usize },

    #[error("invalid boolean byte 0x{0:02x}")]
    InvalidBool(u8),

    #[error("variable-length integer exceeds {max_bytes} bytes")]
    VarIntOverflow { max_bytes: usize },

    #[error("string is not valid UTF-8")]
    InvalidUtf8,

    #[error("{0} trailing bytes after message")]
    TrailingBytes(usize),

    #[error("length {0} is out of range")]
    LengthOverflow(u64),
}

/// A node failed to perform the operation against its local task.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    #[error("request carries no target task")]
    MissingTarget,

    #[error("request is not addressed to node {node}")]
    NotTargeted { node: NodeId },

    #[error("request action filter excludes {action}")]
    ActionFiltered { action: String },

    #[error("task {task} is not hosted on node {node}")]
    WrongNode { task: TaskId, node: NodeId },

    #[error("task {0} is not running")]
    TaskNotFound(TaskId),

    #[error("task {task} runs job {actual}, not {expected}")]
    JobMismatch {
        task: TaskId,
        expected: JobId,
        actual: JobId,
    },

    #[error("persist failed: {0}")]
    Failed(String),

    #[error("malformed response: {0}")]
    Codec(#[from] CodecError),
}

/// The job does not map to any running task.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("no running task for job {0}")]
    JobNotRunning(JobId),

    #[error("task resolution failed: {0}")]
    Unavailable(String),
}

/// Bytes could not be carried to or handled by a node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("node {0} is unreachable")]
    NodeUnreachable(NodeId),

    #[error("node {node} has no handler for action {action}")]
    UnknownAction { node: NodeId, action: String },

    #[error("node {node} rejected request: {source}")]
    BadRequest {
        node: NodeId,
        #[source]
        source: CodecError,
    },
}

/// Misuse of a `ResponseAggregator`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregatorError {
    #[error("aggregator is already finalized")]
    AlreadyFinalized,

    #[error("aggregator needs at least one expected node")]
    NoExpectedNodes,

    #[error("node {0} was not addressed by this request")]
    UnexpectedNode(NodeId),

    #[error("task {0} has already answered")]
    AlreadyAnswered(TaskId),
}

/// Hard failure of a caller-facing dispatch.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Aggregator(#[from] AggregatorError),
}
