use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::{NodeId, TransportError};

/// Carries one encoded request to a node and brings its encoded response back.
#[async_trait]
pub trait NodeTransport: Send + Sync {
    async fn send(&self, node: &NodeId, action: &str, payload: Bytes)
    -> Result<Bytes, TransportError>;
}
