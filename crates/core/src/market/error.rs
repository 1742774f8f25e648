use chrono::{DateTime, Utc};
use thiserror::Error;

/// # Summary
/// 行情域错误枚举，覆盖非法 K 线、乱序事件及外部协作方故障。
///
/// # Invariants
/// - 必须通过 `thiserror` 派生 `Error` trait。
/// - 这里的任何错误都不会终止进程，只会降级对应键的处理结果。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarketError {
    // K 线违反 OHLC 不变量，该条被拒绝，缓冲区保持上一个合法状态
    #[error("Invalid candle at {open_time}: {reason}")]
    InvalidCandle {
        open_time: DateTime<Utc>,
        reason: String,
    },
    // 收到比缓冲区尾部更早的 K 线
    #[error("Out-of-order candle: received {received}, buffer tail is {tail}")]
    OutOfOrder {
        tail: DateTime<Utc>,
        received: DateTime<Utc>,
    },
    // K 线仓库访问失败
    #[error("Repository error: {0}")]
    Repository(String),
    // 行情源连接或解析失败
    #[error("Feed error: {0}")]
    Feed(String),
}
