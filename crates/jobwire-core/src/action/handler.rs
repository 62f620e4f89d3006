//! Handler trait - node-side execution of a typed action
//!
//! # Type erasure
//! `TypedActionHandler<A, H>` wraps an `ActionHandler<A>` and exposes it as a
//! `DynActionHandler`, so handlers for different actions can share one map.

use std::marker::PhantomData;

use async_trait::async_trait;
use bytes::Bytes;

use super::TaskAction;
use crate::domain::errors::CodecError;
use crate::wire;

/// Runs action `A` on the local node.
///
/// Operation failures belong inside `A::Response`; a handler always answers.
#[async_trait]
pub trait ActionHandler<A: TaskAction>: Send + Sync {
    async fn handle(&self, request: A::Request) -> A::Response;
}

/// Object-safe form of `ActionHandler`.
#[async_trait]
pub trait DynActionHandler: Send + Sync {
    /// Decodes a request, runs the handler, encodes its response.
    async fn handle_bytes(&self, payload: &[u8]) -> Result<Bytes, CodecError>;

    fn action_name(&self) -> &'static str;
}

pub struct TypedActionHandler<A: TaskAction, H: ActionHandler<A>> {
    handler: H,
    _marker: PhantomData<A>,
}

impl<A: TaskAction, H: ActionHandler<A>> TypedActionHandler<A, H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<A: TaskAction, H: ActionHandler<A>> DynActionHandler for TypedActionHandler<A, H> {
    async fn handle_bytes(&self, payload: &[u8]) -> Result<Bytes, CodecError> {
        let request: A::Request = wire::decode(payload)?;
        let response = self.handler.handle(request).await;
        wire::encode(&response)
    }

    fn action_name(&self) -> &'static str {
        A::NAME
    }
}
