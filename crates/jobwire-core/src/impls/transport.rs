//! InMemoryTransport - node 間配送の in-memory 版
//!
//! Nodes can be marked down or slowed down to exercise the failure paths.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use crate::app::NodeService;
use crate::domain::{NodeId, TransportError};
use crate::ports::NodeTransport;

#[derive(Default)]
struct TransportState {
    nodes: HashMap<NodeId, Arc<NodeService>>,
    down: HashSet<NodeId>,
    delays: HashMap<NodeId, Duration>,
}

#[derive(Default)]
pub struct InMemoryTransport {
    state: RwLock<TransportState>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn join(&self, service: NodeService) {
        let node = service.node().clone();
        self.state.write().await.nodes.insert(node, Arc::new(service));
    }

    pub async fn set_down(&self, node: &NodeId, down: bool) {
        let mut state = self.state.write().await;
        if down {
            state.down.insert(node.clone());
        } else {
            state.down.remove(node);
        }
    }

    /// Every send to `node` waits `delay` before it is delivered.
    pub async fn set_delay(&self, node: &NodeId, delay: Duration) {
        self.state.write().await.delays.insert(node.clone(), delay);
    }
}

#[async_trait]
impl NodeTransport for InMemoryTransport {
    async fn send(
        &self,
        node: &NodeId,
        action: &str,
        payload: Bytes,
    ) -> Result<Bytes, TransportError> {
        let (service, delay) = {
            let state = self.state.read().await;
            if state.down.contains(node) {
                return Err(TransportError::NodeUnreachable(node.clone()));
            }
            let Some(service) = state.nodes.get(node).cloned() else {
                return Err(TransportError::NodeUnreachable(node.clone()));
            };
            (service, state.delays.get(node).copied())
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        service.handle(action, &payload).await
    }
}
