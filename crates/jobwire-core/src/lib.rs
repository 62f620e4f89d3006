//! jobwire-core
//!
//! Task-scoped cluster actions: address an operation at whichever node hosts
//! a job's task, carry it over a versioned byte format, and merge the per-node
//! outcomes into one response.
//!
//! # モジュール構成
//! - **domain**: ids, task target, request/response envelopes, errors
//! - **wire**: byte codec (`StreamOutput` / `StreamInput`, `Writeable` / `Readable`)
//! - **action**: 型付き action API（`TaskAction`, `ActionHandler`, `ActionRegistry`）
//! - **ports**: 外部コラボレーター（resolver, executor, transport, clock, ids）
//! - **impls**: ports の in-memory 実装
//! - **app**: aggregator, node service, dispatcher, builder, config

pub mod action;
pub mod app;
pub mod domain;
pub mod impls;
pub mod observability;
pub mod ports;
pub mod wire;
