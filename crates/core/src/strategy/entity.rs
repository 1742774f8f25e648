use crate::common::{InstrumentKey, TimeFrame};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// # Summary
/// 方向性信号等级。
///
/// # Invariants
/// - 每个等级对应固定的整数权重，`STRONG_BUY = +3` 到 `STRONG_SELL = -3`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalLevel {
    StrongBuy,
    Buy,
    WeakBuy,
    Neutral,
    WeakSell,
    Sell,
    StrongSell,
}

impl SignalLevel {
    /// 聚合时使用的整数权重
    pub const fn weight(self) -> i64 {
        match self {
            SignalLevel::StrongBuy => 3,
            SignalLevel::Buy => 2,
            SignalLevel::WeakBuy => 1,
            SignalLevel::Neutral => 0,
            SignalLevel::WeakSell => -1,
            SignalLevel::Sell => -2,
            SignalLevel::StrongSell => -3,
        }
    }

    /// # Summary
    /// 将权重和映射回信号等级，使用整数比较避免浮点误差。
    ///
    /// # Logic
    /// 均值 `mean = sum / count`，分档均为闭区间，恰好落在边界上时取绝对值更大的档位：
    /// `>=2 STRONG_BUY`，`>=1 BUY`，`>=0.5 WEAK_BUY`，`<=-2 STRONG_SELL`，
    /// `<=-1 SELL`，`<=-0.5 WEAK_SELL`，其余 `NEUTRAL`。
    ///
    /// # Arguments
    /// * `sum`: 权重之和。
    /// * `count`: 参与计数的结果数量，为 0 时返回 `NEUTRAL`。
    pub fn from_weight_sum(sum: i64, count: i64) -> Self {
        if count <= 0 {
            return SignalLevel::Neutral;
        }
        if sum >= 2 * count {
            SignalLevel::StrongBuy
        } else if sum >= count {
            SignalLevel::Buy
        } else if 2 * sum >= count {
            SignalLevel::WeakBuy
        } else if sum <= -2 * count {
            SignalLevel::StrongSell
        } else if sum <= -count {
            SignalLevel::Sell
        } else if 2 * sum <= -count {
            SignalLevel::WeakSell
        } else {
            SignalLevel::Neutral
        }
    }

    pub fn is_bullish(self) -> bool {
        self.weight() > 0
    }

    pub fn is_bearish(self) -> bool {
        self.weight() < 0
    }
}

impl std::fmt::Display for SignalLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SignalLevel::StrongBuy => "STRONG_BUY",
            SignalLevel::Buy => "BUY",
            SignalLevel::WeakBuy => "WEAK_BUY",
            SignalLevel::Neutral => "NEUTRAL",
            SignalLevel::WeakSell => "WEAK_SELL",
            SignalLevel::Sell => "SELL",
            SignalLevel::StrongSell => "STRONG_SELL",
        };
        f.write_str(s)
    }
}

/// # Summary
/// 策略给出信号时附带的证据。
///
/// # Invariants
/// - `indicator_snapshot` 使用有序 Map，保证序列化结果确定。
/// - `error` 非空表示该策略本次执行失败，在聚合中权重为零。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evidence {
    // 判定时使用的指标数值快照
    pub indicator_snapshot: BTreeMap<String, f64>,
    // 按判定顺序记录满足的条件
    pub conditions: Vec<String>,
    // 补充说明
    pub notes: Option<String>,
    // 执行失败原因
    pub error: Option<String>,
}

impl Evidence {
    pub fn with_value(mut self, name: impl Into<String>, value: f64) -> Self {
        self.indicator_snapshot.insert(name.into(), value);
        self
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.conditions.push(condition.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes = Some(note.into());
        self
    }
}

/// # Summary
/// 单个策略单次评估的结果。每次评估新建，从不修改，由下一次评估取代。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyResult {
    pub strategy_id: String,
    pub instrument: InstrumentKey,
    pub timeframe: TimeFrame,
    pub signal: SignalLevel,
    pub timestamp: DateTime<Utc>,
    pub evidence: Evidence,
}

impl StrategyResult {
    /// 执行失败的结果不参与加权
    pub fn is_skipped(&self) -> bool {
        self.evidence.error.is_some()
    }
}

/// # Summary
/// 单个周期上的信号汇总。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeframeSummary {
    pub signal: SignalLevel,
    pub strategy_count: usize,
}

/// # Summary
/// 一次触发的综合结果，按 `(instrument, timeframe, timestamp)` 唯一标识。
///
/// # Invariants
/// - `consensus` 位于 `[0, 1]`。
/// - 每次触发恰好产生一个结果，即使评估失败也会发布 `NEUTRAL` 结果并在 `notes` 中写明原因。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiStrategyResult {
    pub instrument: InstrumentKey,
    pub timeframe: TimeFrame,
    pub timestamp: DateTime<Utc>,
    pub strategy_results: Vec<StrategyResult>,
    pub overall_signal: SignalLevel,
    pub consensus: f64,
    pub per_timeframe_summary: BTreeMap<TimeFrame, TimeframeSummary>,
    // 评估级别的证据 (缺口标记、失败原因等)
    pub notes: Vec<String>,
}

impl MultiStrategyResult {
    /// 下游去重使用的幂等键
    pub fn dedup_key(&self) -> (InstrumentKey, TimeFrame, DateTime<Utc>) {
        (self.instrument.clone(), self.timeframe, self.timestamp)
    }
}

/// # Summary
/// 单个 (标的, 周期) 评估的状态机。
///
/// `IDLE -> EVALUATING -> (PUBLISHED | FAILED)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EvaluationState {
    #[default]
    Idle,
    Evaluating,
    Published,
    Failed,
}

impl EvaluationState {
    /// 合法迁移：`Idle -> Evaluating`，`Evaluating -> Published | Failed`，终态回到 `Evaluating`
    pub fn can_transition(self, next: EvaluationState) -> bool {
        matches!(
            (self, next),
            (EvaluationState::Idle, EvaluationState::Evaluating)
                | (EvaluationState::Evaluating, EvaluationState::Published)
                | (EvaluationState::Evaluating, EvaluationState::Failed)
                | (EvaluationState::Published, EvaluationState::Evaluating)
                | (EvaluationState::Failed, EvaluationState::Evaluating)
        )
    }
}
