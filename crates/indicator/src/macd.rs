use crate::moving_average::ema_values;
use crate::util::{align, check_period, closes, invalid, require};
use tenkan_core::indicator::entity::{IndicatorSpec, MacdParams, MacdValue, Series};
use tenkan_core::indicator::error::IndicatorError;
use tenkan_core::market::entity::Candle;

/// # Summary
/// MACD 指标。
///
/// # Logic
/// 1. 快慢两条 EMA 在重叠区间上相减得到 MACD 线，首点对齐到下标 `slow - 1`。
/// 2. MACD 线的 `signal` 周期 EMA 为信号线，首点对齐到下标 `slow + signal - 2`。
/// 3. `histogram = macd - signal`，`is_golden_cross = macd > signal`。
///
/// # Returns
/// 至少需要 `slow + signal - 1` 根 K 线；快线周期必须小于慢线周期。
pub fn macd(candles: &[Candle], params: MacdParams) -> Result<Series<MacdValue>, IndicatorError> {
    let spec = IndicatorSpec::Macd(params);
    check_period(&spec, "fast", params.fast)?;
    check_period(&spec, "slow", params.slow)?;
    check_period(&spec, "signal", params.signal)?;
    if params.fast >= params.slow {
        return Err(invalid(&spec, "fast period must be shorter than slow period"));
    }
    let lookback = params.slow + params.signal - 1;
    require(&spec, lookback, candles.len())?;

    let prices = closes(candles);
    let fast = ema_values(&prices, params.fast);
    let slow = ema_values(&prices, params.slow);

    // 快线比慢线早 slow - fast 个点开始
    let offset = params.slow - params.fast;
    let line: Vec<f64> = fast
        .iter()
        .skip(offset)
        .zip(&slow)
        .map(|(f, s)| f - s)
        .collect();
    let signal = ema_values(&line, params.signal);

    let values = line
        .iter()
        .skip(params.signal - 1)
        .zip(signal)
        .map(|(&macd, signal)| MacdValue {
            macd,
            signal,
            histogram: macd - signal,
            is_golden_cross: macd > signal,
        })
        .collect();

    Ok(align(candles, lookback - 1, values))
}
