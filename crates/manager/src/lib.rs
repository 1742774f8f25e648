//! 管线协调：按键分派行情事件，驱动聚合、评估与发布。

pub mod pipeline;
mod worker;

pub use pipeline::{PipelineCoordinator, PipelineError};
pub use worker::WorkerStats;
