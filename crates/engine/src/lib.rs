//! 策略引擎：内置策略目录、注册表、并发执行器与信号归约。

pub mod reducer;
pub mod registry;
pub mod runtime;
pub mod strategies;

pub use reducer::{Reduction, reduce};
pub use registry::StrategyRegistry;
pub use runtime::{Evaluation, EvaluationRequest, StrategyEngine};
