//! 行情状态：一分钟滚动缓冲区与多周期时间桶聚合。

pub mod aggregator;
pub mod buffer;
pub mod series;
