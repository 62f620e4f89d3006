//! DispatcherBuilder - dispatcher のワイヤリング
//!
//! # Fail-fast 設計
//! `build()` は必須のコラボレーター（resolver, transport）が揃っているか、
//! config が妥当かを起動時に検証する。

use std::sync::Arc;

use super::config::{ConfigError, DispatchConfig};
use super::dispatcher::TaskActionDispatcher;
use crate::ports::{IdGenerator, NodeTransport, SystemClock, TaskResolver, UlidGenerator};

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("missing collaborator: {0}")]
    Missing(&'static str),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// # 使用例
/// ```ignore
/// let dispatcher = DispatcherBuilder::new()
///     .resolver(Arc::new(resolver))
///     .transport(Arc::new(transport))
///     .config(DispatchConfig::from_path("jobwire.json")?)
///     .build()?;
/// ```
#[derive(Default)]
pub struct DispatcherBuilder {
    resolver: Option<Arc<dyn TaskResolver>>,
    transport: Option<Arc<dyn NodeTransport>>,
    ids: Option<Arc<dyn IdGenerator>>,
    config: DispatchConfig,
}

impl DispatcherBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolver(mut self, resolver: Arc<dyn TaskResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn NodeTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Defaults to a ULID generator on the system clock.
    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn config(mut self, config: DispatchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<TaskActionDispatcher, BuildError> {
        let resolver = self.resolver.ok_or(BuildError::Missing("resolver"))?;
        let transport = self.transport.ok_or(BuildError::Missing("transport"))?;
        self.config.validate()?;
        let ids = self
            .ids
            .unwrap_or_else(|| Arc::new(UlidGenerator::new(SystemClock)));
        Ok(TaskActionDispatcher::new(resolver, transport, ids, self.config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::{InMemoryTaskResolver, InMemoryTransport};

    #[test]
    fn builds_with_required_collaborators() {
        let dispatcher = DispatcherBuilder::new()
            .resolver(Arc::new(InMemoryTaskResolver::new()))
            .transport(Arc::new(InMemoryTransport::new()))
            .build();
        assert!(dispatcher.is_ok());
    }

    #[test]
    fn missing_resolver_fails_fast() {
        let result = DispatcherBuilder::new()
            .transport(Arc::new(InMemoryTransport::new()))
            .build();
        assert!(matches!(result, Err(BuildError::Missing("resolver"))));
    }

    #[test]
    fn missing_transport_fails_fast() {
        let result = DispatcherBuilder::new()
            .resolver(Arc::new(InMemoryTaskResolver::new()))
            .build();
        assert!(matches!(result, Err(BuildError::Missing("transport"))));
    }

    #[test]
    fn invalid_config_fails_fast() {
        let result = DispatcherBuilder::new()
            .resolver(Arc::new(InMemoryTaskResolver::new()))
            .transport(Arc::new(InMemoryTransport::new()))
            .config(DispatchConfig {
                timeout_ms: 0,
                ..DispatchConfig::default()
            })
            .build();
        assert!(matches!(result, Err(BuildError::Config(ConfigError::Invalid(_)))));
    }
}
