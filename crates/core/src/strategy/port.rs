use crate::common::{InstrumentKey, TimeFrame};
use crate::indicator::entity::{IndicatorSet, IndicatorSpec};
use crate::indicator::error::IndicatorError;
use crate::market::entity::Candle;
use crate::strategy::entity::{Evidence, SignalLevel, StrategyResult};
use crate::strategy::error::StrategyError;
use chrono::{DateTime, Utc};

/// # Summary
/// 一次触发的策略评估上下文，由执行器构造后只读共享给全部策略。
///
/// # Invariants
/// - `candles` 只包含已收盘的 K 线，按时间升序。
/// - `indicators` 由同一份 `candles` 计算得出，最后一个点对应最后一根 K 线。
#[derive(Debug, Clone)]
pub struct StrategyContext {
    pub key: InstrumentKey,
    pub timeframe: TimeFrame,
    pub candles: Vec<Candle>,
    pub indicators: IndicatorSet,
}

impl StrategyContext {
    /// 本次评估的时间戳，即触发 K 线的开盘时间
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.candles.last().map(|c| c.open_time)
    }

    /// # Summary
    /// 取最近两根 K 线 (前一根, 当前)。
    ///
    /// # Returns
    /// K 线少于两根时返回 `StrategyError::InsufficientData`。
    pub fn last_two_candles(&self) -> Result<(&Candle, &Candle), StrategyError> {
        match self.candles.as_slice() {
            [.., prev, cur] => Ok((prev, cur)),
            _ => Err(StrategyError::InsufficientData(
                IndicatorError::InsufficientData {
                    indicator: "candles".to_string(),
                    required: 2,
                    available: self.candles.len(),
                },
            )),
        }
    }

    /// # Summary
    /// 用上下文中的标的、周期和时间戳构造策略结果。
    pub fn result(
        &self,
        strategy_id: &str,
        signal: SignalLevel,
        evidence: Evidence,
    ) -> StrategyResult {
        StrategyResult {
            strategy_id: strategy_id.to_string(),
            instrument: self.key.clone(),
            timeframe: self.timeframe,
            signal,
            timestamp: self.timestamp().unwrap_or(DateTime::<Utc>::MIN_UTC),
            evidence,
        }
    }
}

/// # Summary
/// 策略接口。每个策略是一个纯函数 `(K 线序列, 指标) -> StrategyResult`。
///
/// # Invariants
/// - 实现必须无副作用且线程安全 (`Send` + `Sync`)，以便在工作池中并发执行。
/// - 策略应检测前后两个值之间的状态迁移 (突破、交叉、阈值穿越、背离)，
///   而不是静态条件，避免条件持续期间反复触发。
pub trait Strategy: Send + Sync {
    /// 注册表内唯一的策略标识
    fn id(&self) -> &str;

    /// # Summary
    /// 策略依赖的指标参数化列表，执行器据此计算指标集。
    fn requirements(&self) -> Vec<IndicatorSpec>;

    /// # Summary
    /// 对当前上下文做一次评估。
    ///
    /// # Arguments
    /// * `ctx`: 只读评估上下文。
    ///
    /// # Returns
    /// 成功返回策略结果；数据不足或内部失败返回 `StrategyError`，由执行器降级为零权重 `NEUTRAL`。
    fn evaluate(&self, ctx: &StrategyContext) -> Result<StrategyResult, StrategyError>;
}
