use crate::{atr, bollinger, macd, moving_average, rsi, volume, vwap};
use tenkan_core::indicator::entity::{IndicatorResult, IndicatorSet, IndicatorSpec};
use tenkan_core::indicator::error::IndicatorError;
use tenkan_core::market::entity::Candle;
use tracing::debug;

/// # Summary
/// 按参数描述分派到具体指标函数。
pub fn compute(
    spec: &IndicatorSpec,
    candles: &[Candle],
) -> Result<IndicatorResult, IndicatorError> {
    match *spec {
        IndicatorSpec::Sma { period } => {
            moving_average::sma(candles, period).map(IndicatorResult::Sma)
        }
        IndicatorSpec::Ema { period } => {
            moving_average::ema(candles, period).map(IndicatorResult::Ema)
        }
        IndicatorSpec::Rsi(params) => rsi::rsi(candles, params).map(IndicatorResult::Rsi),
        IndicatorSpec::Macd(params) => macd::macd(candles, params).map(IndicatorResult::Macd),
        IndicatorSpec::Bollinger(params) => {
            bollinger::bollinger(candles, params).map(IndicatorResult::Bollinger)
        }
        IndicatorSpec::Atr { period } => atr::atr(candles, period).map(IndicatorResult::Atr),
        IndicatorSpec::Volume(params) => {
            volume::volume(candles, params).map(IndicatorResult::Volume)
        }
        IndicatorSpec::Vwap { session } => {
            vwap::vwap(candles, session).map(IndicatorResult::Vwap)
        }
    }
}

/// # Summary
/// 一次性计算一组指标，结果只读共享给本次触发的所有策略。
///
/// # Logic
/// 重复的参数描述只计算一次；每个条目独立保存其 `Result`，预热期的数据不足只记 debug 日志。
pub fn compute_set(specs: &[IndicatorSpec], candles: &[Candle]) -> IndicatorSet {
    let mut entries: Vec<(IndicatorSpec, Result<IndicatorResult, IndicatorError>)> =
        Vec::with_capacity(specs.len());
    for spec in specs {
        if entries.iter().any(|(s, _)| s == spec) {
            continue;
        }
        let result = compute(spec, candles);
        if let Err(e) = &result {
            debug!("Indicator {} unavailable: {}", spec, e);
        }
        entries.push((*spec, result));
    }
    IndicatorSet::new(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tenkan_core::indicator::entity::{MacdParams, RsiParams};
    use tenkan_core::testing::linear_candles;

    #[test]
    fn test_partial_failures_are_isolated() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let candles = linear_candles(start, 30, 1.0, 30.0);
        let specs = [
            IndicatorSpec::Sma { period: 20 },
            IndicatorSpec::Sma { period: 50 },
            IndicatorSpec::Rsi(RsiParams::default()),
            IndicatorSpec::Macd(MacdParams::default()),
            IndicatorSpec::Sma { period: 20 },
        ];
        let set = compute_set(&specs, &candles);
        assert_eq!(set.entries().len(), 4);
        assert_eq!(set.sma(20).map(|s| s.len()), Ok(11));
        assert!(matches!(
            set.sma(50),
            Err(IndicatorError::InsufficientData { required: 50, available: 30, .. })
        ));
        assert!(set.rsi(RsiParams::default()).is_ok());
        assert!(set.macd(MacdParams::default()).is_err());
        assert!(!set.all_failed());
    }

    #[test]
    fn test_empty_series_fails_everything() {
        let specs = [IndicatorSpec::Sma { period: 1 }, IndicatorSpec::Atr { period: 1 }];
        let set = compute_set(&specs, &[]);
        assert!(set.all_failed());
    }
}
