//! Ports - 外部コラボレーターの抽象化
//!
//! Cluster membership, job persistence and the byte transport live outside
//! this crate. Each is a trait here; `impls` has in-memory versions.

pub mod clock;
pub mod executor;
pub mod id_generator;
pub mod resolver;
pub mod transport;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::executor::JobExecutor;
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::resolver::TaskResolver;
pub use self::transport::NodeTransport;
