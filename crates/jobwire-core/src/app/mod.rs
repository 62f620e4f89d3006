//! App - ports を組み合わせたアプリケーション層
//!
//! # 主要コンポーネント
//! - **ResponseAggregator**: node ごとの結果・失敗を一つの応答にまとめる
//! - **NodeService**: 受信側。decode → handler → encode
//! - **TaskActionDispatcher**: 呼び出し側の入口（persist_job）
//! - **DispatcherBuilder**: 起動時検証つきのワイヤリング

pub mod aggregator;
pub mod builder;
pub mod config;
pub mod dispatcher;
pub mod node;

pub use self::aggregator::{AggregatorPhase, ResponseAggregator};
pub use self::builder::{BuildError, DispatcherBuilder};
pub use self::config::{ConfigError, DispatchConfig};
pub use self::dispatcher::TaskActionDispatcher;
pub use self::node::{NodeService, PersistJobHandler};
