//! Impls - ports の in-memory 実装（開発用・テスト用）
//!
//! - **InMemoryTaskResolver**: job → task の対応表
//! - **InMemoryJobExecutor**: 各 node 上で動いている job task
//! - **InMemoryTransport**: node 間の配送（故障・遅延の注入つき）

pub mod executor;
pub mod resolver;
pub mod transport;

pub use self::executor::InMemoryJobExecutor;
pub use self::resolver::InMemoryTaskResolver;
pub use self::transport::InMemoryTransport;
