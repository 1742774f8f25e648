use crate::util::require;
use tenkan_core::indicator::entity::{IndicatorSpec, Point, Series, VwapSession};
use tenkan_core::indicator::error::IndicatorError;
use tenkan_core::market::entity::Candle;

/// # Summary
/// 按会话模式计算 VWAP。
///
/// # Logic
/// `Continuous` 从不重置；`UtcDay` 在 UTC 日期变化的第一根 K 线处重置。
pub fn vwap(candles: &[Candle], session: VwapSession) -> Result<Series<f64>, IndicatorError> {
    let spec = IndicatorSpec::Vwap { session };
    require(&spec, 1, candles.len())?;
    let series = match session {
        VwapSession::Continuous => vwap_with_sessions(candles, |_, _| false),
        VwapSession::UtcDay => vwap_with_sessions(candles, |prev, cur| {
            prev.open_time.date_naive() != cur.open_time.date_naive()
        }),
    };
    Ok(series)
}

/// # Summary
/// 成交量加权平均价，会话边界由调用方判定。
///
/// # Logic
/// 1. 累计 `typical_price * volume` 与 `volume`，`typical_price = (high + low + close) / 3`。
/// 2. `is_boundary(prev, cur)` 为真时在 `cur` 之前清零累计量。
/// 3. 会话内累计成交量为零时，取当前 K 线的典型价格。
///
/// # Arguments
/// * `candles`: 按时间升序的 K 线序列。
/// * `is_boundary`: 会话边界判定函数，参数为相邻的前后两根 K 线。
///
/// # Returns
/// 与输入等长的序列，空输入返回空序列。
pub fn vwap_with_sessions<F>(candles: &[Candle], is_boundary: F) -> Series<f64>
where
    F: Fn(&Candle, &Candle) -> bool,
{
    let mut cum_pv = 0.0;
    let mut cum_volume = 0.0;
    let mut prev: Option<&Candle> = None;
    let mut series = Vec::with_capacity(candles.len());

    for candle in candles {
        if prev.is_some_and(|p| is_boundary(p, candle)) {
            cum_pv = 0.0;
            cum_volume = 0.0;
        }
        let typical = candle.typical_price();
        cum_pv += typical * candle.volume;
        cum_volume += candle.volume;
        let value = if cum_volume > 0.0 {
            cum_pv / cum_volume
        } else {
            typical
        };
        series.push(Point {
            time: candle.open_time,
            value,
        });
        prev = Some(candle);
    }
    series
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use tenkan_core::testing::minute_candle;

    #[test]
    fn test_cumulative_weighting() {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let candles = vec![
            minute_candle(t, 10.0, 10.0, 10.0, 10.0, 1.0),
            minute_candle(t + Duration::minutes(1), 20.0, 20.0, 20.0, 20.0, 3.0),
        ];
        let result = vwap(&candles, VwapSession::Continuous).unwrap();
        assert_eq!(result[0].value, 10.0);
        assert_eq!(result[1].value, (10.0 + 60.0) / 4.0);
    }

    #[test]
    fn test_utc_day_session_resets() {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 23, 59, 0).unwrap();
        let candles = vec![
            minute_candle(t, 10.0, 10.0, 10.0, 10.0, 5.0),
            minute_candle(t + Duration::minutes(1), 20.0, 20.0, 20.0, 20.0, 1.0),
        ];
        let continuous = vwap(&candles, VwapSession::Continuous).unwrap();
        let daily = vwap(&candles, VwapSession::UtcDay).unwrap();
        assert!(continuous[1].value < 20.0);
        assert_eq!(daily[1].value, 20.0);
    }

    #[test]
    fn test_zero_volume_falls_back_to_typical_price() {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let candles = vec![minute_candle(t, 9.0, 12.0, 9.0, 12.0, 0.0)];
        let result = vwap_with_sessions(&candles, |_, _| true);
        assert_eq!(result[0].value, 11.0);
        assert!(matches!(
            vwap(&[], VwapSession::Continuous),
            Err(IndicatorError::InsufficientData { required: 1, .. })
        ));
    }
}
