//! 领域核心：实体、端口 (trait) 与错误类型。
//!
//! 具体实现分布在 `tenkan-market`、`tenkan-indicator`、`tenkan-engine`、
//! `tenkan-manager` 中，它们在编译期只依赖这里的定义。

pub mod common;
pub mod config;
pub mod indicator;
pub mod market;
pub mod signal;
pub mod strategy;

#[cfg(feature = "test-utils")]
pub mod testing;
