use crate::util::{align, check_period, closes, invalid, mean, require};
use tenkan_core::common::num::count_to_f64;
use tenkan_core::indicator::entity::{BollingerParams, BollingerValue, IndicatorSpec, Series};
use tenkan_core::indicator::error::IndicatorError;
use tenkan_core::market::entity::Candle;

/// # Summary
/// 布林带。
///
/// # Logic
/// 1. `middle` 为窗口内收盘价的 SMA，`std_dev` 为同一窗口的总体标准差。
/// 2. `upper/lower = middle ± multiplier * std_dev`。
/// 3. `percent_b = (close - lower) / (upper - lower)`，带宽为零时取 0.5。
/// 4. `bandwidth = (upper - lower) / middle`，中轨为零时取 0。
pub fn bollinger(
    candles: &[Candle],
    params: BollingerParams,
) -> Result<Series<BollingerValue>, IndicatorError> {
    let spec = IndicatorSpec::Bollinger(params);
    check_period(&spec, "period", params.period)?;
    if !params.multiplier.is_finite() || params.multiplier < 0.0 {
        return Err(invalid(&spec, "multiplier must be a non-negative number"));
    }
    require(&spec, params.period, candles.len())?;

    let prices = closes(candles);
    let n = count_to_f64(params.period);
    let values = prices
        .windows(params.period)
        .map(|window| {
            let middle = mean(window);
            let variance = window.iter().map(|p| (p - middle).powi(2)).sum::<f64>() / n;
            let std_dev = variance.sqrt();
            let upper = middle + params.multiplier * std_dev;
            let lower = middle - params.multiplier * std_dev;
            let close = window.last().copied().unwrap_or(middle);
            let width = upper - lower;
            BollingerValue {
                upper,
                middle,
                lower,
                std_dev,
                percent_b: if width > 0.0 {
                    (close - lower) / width
                } else {
                    0.5
                },
                bandwidth: if middle != 0.0 { width / middle } else { 0.0 },
            }
        })
        .collect();

    Ok(align(candles, params.period - 1, values))
}
