//! PersistJobRequest - ask the node hosting a job's task to persist its state.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use super::errors::CodecError;
use super::ids::{JobId, TaskId};
use super::target::TaskTarget;
use crate::wire::{Readable, StreamInput, StreamOutput, Writeable};

/// Value written in the reserved background slot.
///
/// Peers on older protocol versions still read a "run in background" toggle
/// right after the task-targeting fields. Persisting always runs in the
/// background now, so the slot is written as `true` and ignored on read.
pub const LEGACY_BACKGROUND_FLAG: bool = true;

/// Equality and hashing cover the job id and the background flag only, so two
/// requests for the same job compare equal no matter which task they were
/// stamped with during dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistJobRequest {
    target: TaskTarget,
}

impl PersistJobRequest {
    pub fn new(job_id: impl Into<JobId>) -> Self {
        Self {
            target: TaskTarget::new(job_id),
        }
    }

    pub fn from_target(target: TaskTarget) -> Self {
        Self { target }
    }

    pub fn target(&self) -> &TaskTarget {
        &self.target
    }

    pub fn job_id(&self) -> &JobId {
        self.target.job_id()
    }

    pub fn is_background(&self) -> bool {
        LEGACY_BACKGROUND_FLAG
    }

    pub fn is_foreground(&self) -> bool {
        !self.is_background()
    }

    /// Copy of this request aimed at one resolved task.
    pub fn for_task(&self, task: TaskId) -> Self {
        Self {
            target: self.target.clone().with_task(task),
        }
    }
}

impl PartialEq for PersistJobRequest {
    fn eq(&self, other: &Self) -> bool {
        self.job_id() == other.job_id() && self.is_background() == other.is_background()
    }
}

impl Eq for PersistJobRequest {}

impl Hash for PersistJobRequest {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.job_id().hash(state);
        self.is_background().hash(state);
    }
}

impl Writeable for PersistJobRequest {
    fn write_to(&self, out: &mut StreamOutput) -> Result<(), CodecError> {
        self.target.write_to(out)?;
        out.write_bool(LEGACY_BACKGROUND_FLAG);
        Ok(())
    }
}

impl Readable for PersistJobRequest {
    fn read_from(input: &mut StreamInput<'_>) -> Result<Self, CodecError> {
        let target = TaskTarget::read_from(input)?;
        // reserved background slot; any valid bool is accepted
        let _background = input.read_bool()?;
        Ok(Self { target })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::hash::DefaultHasher;

    use super::*;
    use crate::wire::{decode, encode};
    use rstest::rstest;

    fn hash_of(request: &PersistJobRequest) -> u64 {
        let mut hasher = DefaultHasher::new();
        request.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn persist_is_always_background() {
        let request = PersistJobRequest::new("job-42");
        assert!(request.is_background());
        assert!(!request.is_foreground());
    }

    #[test]
    fn encodes_base_fields_then_reserved_true() {
        let bytes = encode(&PersistJobRequest::new("job-42")).unwrap();
        let base = encode(&TaskTarget::new("job-42")).unwrap();
        assert_eq!(&bytes[..base.len()], &base[..]);
        assert_eq!(&bytes[base.len()..], &[0x01]);
    }

    #[test]
    fn encoding_is_deterministic() {
        let a = encode(&PersistJobRequest::new("job-42")).unwrap();
        let b = encode(&PersistJobRequest::new("job-42")).unwrap();
        assert_eq!(a, b);
    }

    #[rstest]
    #[case(PersistJobRequest::new("job-42"))]
    #[case(PersistJobRequest::new(""))]
    #[case(PersistJobRequest::new("ジョブ-7"))]
    #[case(PersistJobRequest::new("job-42").for_task(TaskId::new("node-3", 11)))]
    #[case(PersistJobRequest::new("job-42").for_task(TaskId::new("", 7)))]
    fn decode_inverts_encode(#[case] request: PersistJobRequest) {
        let back: PersistJobRequest = decode(&encode(&request).unwrap()).unwrap();
        assert_eq!(back, request);
        assert_eq!(back.target(), request.target());
    }

    #[test]
    fn reserved_flag_value_is_ignored_on_read() {
        let mut bytes = encode(&PersistJobRequest::new("job-42")).unwrap().to_vec();
        *bytes.last_mut().unwrap() = 0x00;
        let back: PersistJobRequest = decode(&bytes).unwrap();
        assert_eq!(back, PersistJobRequest::new("job-42"));
        assert!(back.is_background());
    }

    #[test]
    fn missing_reserved_flag_is_malformed() {
        let bytes = encode(&TaskTarget::new("job-42")).unwrap();
        let err = decode::<PersistJobRequest>(&bytes).unwrap_err();
        assert!(matches!(err, CodecError::UnexpectedEof { needed: 1, remaining: 0 }));
    }

    #[test]
    fn same_job_is_equal_and_hashes_identically() {
        let a = PersistJobRequest::new("job-42");
        let b = PersistJobRequest::new("job-42");
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn task_stamping_does_not_change_identity() {
        let a = PersistJobRequest::new("job-42");
        let stamped = a.for_task(TaskId::new("node-1", 3));
        assert_eq!(a, stamped);
        assert_eq!(hash_of(&a), hash_of(&stamped));
    }

    #[test]
    fn different_jobs_are_unequal() {
        let mut set = HashSet::new();
        set.insert(PersistJobRequest::new("job-42"));
        set.insert(PersistJobRequest::new("job-42"));
        set.insert(PersistJobRequest::new("job-43"));
        assert_eq!(set.len(), 2);
        assert_ne!(PersistJobRequest::new("job-42"), PersistJobRequest::new("job-43"));
    }
}
