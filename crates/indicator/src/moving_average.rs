use crate::util::{align, check_period, closes, mean, require};
use tenkan_core::common::num::count_to_f64;
use tenkan_core::indicator::entity::{IndicatorSpec, Series};
use tenkan_core::indicator::error::IndicatorError;
use tenkan_core::market::entity::Candle;

/// # Summary
/// 简单移动平均。
///
/// # Logic
/// 第 i 个结果为 `candles[i-period+1..=i]` 收盘价的算术平均，首个结果对齐到下标 `period - 1`。
///
/// # Arguments
/// * `candles`: 按时间升序的 K 线序列。
/// * `period`: 窗口长度。
///
/// # Returns
/// 长度为 `len - period + 1` 的对齐序列；长度不足返回 `InsufficientData`。
pub fn sma(candles: &[Candle], period: usize) -> Result<Series<f64>, IndicatorError> {
    let spec = IndicatorSpec::Sma { period };
    check_period(&spec, "period", period)?;
    require(&spec, period, candles.len())?;
    Ok(align(candles, period - 1, sma_values(&closes(candles), period)))
}

/// # Summary
/// 指数移动平均，以前 `period` 个收盘价的 SMA 作为种子。
///
/// # Logic
/// `ema[i] = close[i] * α + ema[i-1] * (1 - α)`，`α = 2 / (period + 1)`。
pub fn ema(candles: &[Candle], period: usize) -> Result<Series<f64>, IndicatorError> {
    let spec = IndicatorSpec::Ema { period };
    check_period(&spec, "period", period)?;
    require(&spec, period, candles.len())?;
    Ok(align(candles, period - 1, ema_values(&closes(candles), period)))
}

/// 原始数值上的滚动平均，调用方保证 `0 < period <= values.len()`
pub(crate) fn sma_values(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 {
        return Vec::new();
    }
    values.windows(period).map(mean).collect()
}

/// 原始数值上的 EMA，调用方保证 `0 < period <= values.len()`
pub(crate) fn ema_values(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }
    let alpha = 2.0 / (count_to_f64(period) + 1.0);
    let (seed_window, rest) = values.split_at(period);

    let mut result = Vec::with_capacity(values.len() - period + 1);
    let mut prev = mean(seed_window);
    result.push(prev);
    for &value in rest {
        prev = value * alpha + prev * (1.0 - alpha);
        result.push(prev);
    }
    result
}
