//! Action - 型付き task action API
//!
//! # 二層構造
//! - **表層（Typed）**: `TaskAction` trait, `ActionHandler<A>` trait
//! - **内部（Dyn）**: `DynActionHandler` trait - bytes in, bytes out
//!
//! A node registers one handler per action name. The name travels next to the
//! encoded request, so the receiving node knows which codec to use.

pub mod handler;
pub mod persist;
pub mod registry;

pub use self::handler::{ActionHandler, DynActionHandler, TypedActionHandler};
pub use self::persist::PersistJobAction;
pub use self::registry::{ActionRegistry, RegistryError};

use crate::wire::{Readable, Writeable};

/// Constant descriptor of an action: its wire name and its codec types.
///
/// Implementors are zero-sized; there is no shared action instance.
pub trait TaskAction: Send + Sync + 'static {
    /// 命名規約: `{scope}:{area}/{component}/{object}/{verb}`
    const NAME: &'static str;

    type Request: Writeable + Readable + Send + Sync + 'static;
    type Response: Writeable + Readable + Send + Sync + 'static;
}
