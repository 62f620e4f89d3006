//! Domain model (ids, request envelope, per-node results, responses, errors).

pub mod aggregate;
pub mod errors;
pub mod ids;
pub mod node_result;
pub mod request;
pub mod response;
pub mod target;

pub use aggregate::AggregatedResponse;
pub use errors::{
    AggregatorError, CodecError, DispatchError, ExecutionError, ResolutionError, TransportError,
};
pub use ids::{DispatchId, JobId, NodeId, TaskId};
pub use node_result::{NodeReport, NodeResult};
pub use request::{LEGACY_BACKGROUND_FLAG, PersistJobRequest};
pub use response::{NodeFailure, PersistJobResponse, TaskFailure, TasksResponse};
pub use target::TaskTarget;
