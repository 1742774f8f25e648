use tenkan_core::common::num::{count_to_i64, ratio};
use tenkan_core::strategy::entity::{SignalLevel, StrategyResult, TimeframeSummary};

/// # Summary
/// 一组策略结果的聚合输出。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reduction {
    pub signal: SignalLevel,
    // 主导方向占比，位于 [0, 1]
    pub consensus: f64,
    // 参与加权 (未被跳过) 的结果数量
    pub counted: usize,
}

impl Reduction {
    pub fn summary(&self) -> TimeframeSummary {
        TimeframeSummary {
            signal: self.signal,
            strategy_count: self.counted,
        }
    }
}

/// # Summary
/// 将多个策略结果归约为一个综合信号。
///
/// # Logic
/// 1. 排除执行失败 (被跳过) 的结果。
/// 2. 权重之和按整数分档映射回信号等级，边界取绝对值更大的档位。
/// 3. `consensus = max(看多数量, 看空数量) / 参与数量`。
/// 4. 没有可参与的结果时返回 `NEUTRAL`，`consensus = 0`。
///
/// # Arguments
/// * `results`: 同一标的同一周期的策略结果。
///
/// # Returns
/// 聚合结果。
pub fn reduce(results: &[StrategyResult]) -> Reduction {
    let counted: Vec<&StrategyResult> = results.iter().filter(|r| !r.is_skipped()).collect();
    let n = counted.len();
    let sum: i64 = counted.iter().map(|r| r.signal.weight()).sum();
    let positive = counted.iter().filter(|r| r.signal.is_bullish()).count();
    let negative = counted.iter().filter(|r| r.signal.is_bearish()).count();

    Reduction {
        signal: SignalLevel::from_weight_sum(sum, count_to_i64(n)),
        consensus: ratio(positive.max(negative), n),
        counted: n,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tenkan_core::common::{InstrumentKey, TimeFrame};
    use tenkan_core::strategy::entity::Evidence;

    fn result(signal: SignalLevel) -> StrategyResult {
        StrategyResult {
            strategy_id: format!("{:?}", signal),
            instrument: InstrumentKey::new("BTCUSDT", "spot"),
            timeframe: TimeFrame::Minute15,
            signal,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            evidence: Evidence::default(),
        }
    }

    fn skipped() -> StrategyResult {
        let mut r = result(SignalLevel::Neutral);
        r.evidence.error = Some("boom".to_string());
        r
    }

    #[test]
    fn test_mixed_signals_resolve_neutral() {
        let results = [
            result(SignalLevel::StrongBuy),
            result(SignalLevel::Sell),
            result(SignalLevel::Neutral),
        ];
        let reduction = reduce(&results);
        assert_eq!(reduction.signal, SignalLevel::Neutral);
        assert!((reduction.consensus - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(reduction.counted, 3);
    }

    #[test]
    fn test_boundaries_take_higher_band() {
        // 均值恰为 0.5
        let r = reduce(&[result(SignalLevel::WeakBuy), result(SignalLevel::Neutral)]);
        assert_eq!(r.signal, SignalLevel::WeakBuy);
        // 均值恰为 -1
        let r = reduce(&[result(SignalLevel::StrongSell), result(SignalLevel::WeakBuy)]);
        assert_eq!(r.signal, SignalLevel::Sell);
        // 均值恰为 2
        let r = reduce(&[result(SignalLevel::StrongBuy), result(SignalLevel::WeakBuy)]);
        assert_eq!(r.signal, SignalLevel::StrongBuy);
        assert_eq!(r.consensus, 1.0);
    }

    #[test]
    fn test_skipped_results_carry_no_weight() {
        let r = reduce(&[result(SignalLevel::Buy), skipped(), skipped()]);
        assert_eq!(r.signal, SignalLevel::Buy);
        assert_eq!(r.counted, 1);
        assert_eq!(r.consensus, 1.0);

        let empty = reduce(&[skipped()]);
        assert_eq!(empty.signal, SignalLevel::Neutral);
        assert_eq!(empty.consensus, 0.0);
        assert_eq!(empty.summary().strategy_count, 0);
    }
}
