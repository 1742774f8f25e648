use crate::signal::entity::ErrorReport;
use crate::signal::error::SinkError;
use crate::strategy::entity::MultiStrategyResult;
use async_trait::async_trait;

/// # Summary
/// 综合信号的下游接收方接口。
///
/// # Invariants
/// - 投递语义为至少一次，接收方需按 `(instrument, timeframe, timestamp)` 去重。
/// - 同一键的结果按触发顺序投递。
#[async_trait]
pub trait SignalSink: Send + Sync {
    /// # Summary
    /// 发布一次触发的综合结果。
    ///
    /// # Arguments
    /// * `result`: 综合结果。
    ///
    /// # Returns
    /// * 成功返回 `Ok(())`。
    /// * 失败返回 `Err(SinkError)`。
    async fn publish(&self, result: &MultiStrategyResult) -> Result<(), SinkError>;
}

/// # Summary
/// 错误通道接口，接收无法产出有意义结果的触发记录。
#[async_trait]
pub trait ErrorSink: Send + Sync {
    async fn report(&self, report: &ErrorReport) -> Result<(), SinkError>;
}
