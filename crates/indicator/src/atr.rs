use crate::util::{align, check_period, mean, require};
use tenkan_core::indicator::entity::{IndicatorSpec, Series};
use tenkan_core::indicator::error::IndicatorError;
use tenkan_core::market::entity::Candle;

/// # Summary
/// 平均真实波幅。
///
/// # Logic
/// 1. `TR = max(high - low, |high - prevClose|, |low - prevClose|)`，从第二根 K 线开始。
/// 2. 取最近 `period` 个 TR 的简单平均 (非 Wilder 平滑)，首点对齐到下标 `period`。
pub fn atr(candles: &[Candle], period: usize) -> Result<Series<f64>, IndicatorError> {
    let spec = IndicatorSpec::Atr { period };
    check_period(&spec, "period", period)?;
    require(&spec, period + 1, candles.len())?;

    let ranges: Vec<f64> = candles.windows(2).map(|w| true_range(&w[1], &w[0])).collect();
    let values = ranges.windows(period).map(mean).collect();
    Ok(align(candles, period, values))
}

pub fn true_range(candle: &Candle, prev: &Candle) -> f64 {
    (candle.high - candle.low)
        .max((candle.high - prev.close).abs())
        .max((candle.low - prev.close).abs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use tenkan_core::testing::minute_candle;

    #[test]
    fn test_true_range_uses_gap() {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let prev = minute_candle(t, 10.0, 11.0, 9.0, 10.0, 1.0);
        // 向上跳空
        let gap = minute_candle(t + Duration::minutes(1), 14.0, 15.0, 13.0, 14.0, 1.0);
        assert_eq!(true_range(&gap, &prev), 5.0);

        let candles = vec![
            prev,
            gap,
            minute_candle(t + Duration::minutes(2), 14.0, 15.0, 14.0, 14.5, 1.0),
        ];
        let result = atr(&candles, 2).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].value, (5.0 + 1.0) / 2.0);
        assert_eq!(result[0].time, candles[2].open_time);
    }

    #[test]
    fn test_needs_period_plus_one() {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let candles: Vec<Candle> = (0..14)
            .map(|i| minute_candle(t + Duration::minutes(i), 1.0, 2.0, 0.5, 1.5, 1.0))
            .collect();
        assert!(matches!(
            atr(&candles, 14),
            Err(IndicatorError::InsufficientData {
                required: 15,
                available: 14,
                ..
            })
        ));
    }
}
