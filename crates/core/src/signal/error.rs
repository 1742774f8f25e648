use thiserror::Error;

/// # Summary
/// 下游投递错误枚举。
///
/// # Invariants
/// - 必须通过 `thiserror` 派生 `Error` trait。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// 下游通道已关闭
    #[error("Sink closed")]
    Closed,

    /// 投递失败 (序列化、传输等)
    #[error("Delivery error: {0}")]
    Delivery(String),
}
