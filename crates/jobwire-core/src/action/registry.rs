//! ActionRegistry - action name から handler への対応表

use std::collections::HashMap;
use std::sync::Arc;

use super::TaskAction;
use super::handler::{ActionHandler, DynActionHandler, TypedActionHandler};

/// Built during node start-up, read-only afterwards.
#[derive(Default)]
pub struct ActionRegistry {
    handlers: HashMap<&'static str, Arc<dyn DynActionHandler>>,
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("handler for action '{0}' is already registered")]
    AlreadyRegistered(&'static str),
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn register<A: TaskAction, H: ActionHandler<A> + 'static>(
        &mut self,
        handler: H,
    ) -> Result<(), RegistryError> {
        if self.handlers.contains_key(A::NAME) {
            return Err(RegistryError::AlreadyRegistered(A::NAME));
        }
        self.handlers
            .insert(A::NAME, Arc::new(TypedActionHandler::<A, H>::new(handler)));
        Ok(())
    }

    pub fn get(&self, action: &str) -> Option<Arc<dyn DynActionHandler>> {
        self.handlers.get(action).cloned()
    }

    pub fn registered_actions(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.handlers.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
