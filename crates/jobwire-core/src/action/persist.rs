use super::TaskAction;
use crate::domain::{PersistJobRequest, PersistJobResponse};

/// Persist the state of a running job on the node that hosts it.
#[derive(Debug, Clone, Copy, Default)]
pub struct PersistJobAction;

impl TaskAction for PersistJobAction {
    const NAME: &'static str = "cluster:admin/jobwire/job/persist";

    type Request = PersistJobRequest;
    type Response = PersistJobResponse;
}
