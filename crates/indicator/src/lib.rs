//! 技术指标库。
//!
//! 每个函数都是纯函数：输入有序的 K 线序列与参数，输出与输入按时间对齐的结果序列，
//! 从回溯窗口首次满足的位置开始。数据不足时返回 `IndicatorError::InsufficientData`，
//! 绝不返回部分或补零的结果。

pub mod atr;
pub mod bollinger;
pub mod macd;
pub mod moving_average;
pub mod rsi;
pub mod set;
pub mod volume;
pub mod vwap;

mod util;

pub use set::{compute, compute_set};
