use crate::indicator::error::IndicatorError;
use thiserror::Error;

/// # Summary
/// 单个策略执行错误枚举。
///
/// # Invariants
/// - 策略错误只影响该策略自身：批次继续执行，该策略以零权重 `NEUTRAL` 参与聚合。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StrategyError {
    // 指标回溯不足，预热阶段的常态
    #[error("Insufficient data: {0}")]
    InsufficientData(#[from] IndicatorError),
    // 策略内部执行失败 (包括捕获到的 panic)
    #[error("Strategy execution error: {0}")]
    Execution(String),
}
