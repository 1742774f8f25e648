use crate::util::{align, check_period, invalid, mean, require};
use tenkan_core::indicator::entity::{IndicatorSpec, Series, VolumeParams, VolumeValue};
use tenkan_core::indicator::error::IndicatorError;
use tenkan_core::market::entity::Candle;

/// # Summary
/// 成交量分析：滚动均量、量比、放量标记与能量潮 (OBV)。
///
/// # Logic
/// 1. OBV 从序列第一根 K 线的 0 开始累计：收盘上涨加量，下跌减量，持平不变。
/// 2. 均量为包含当前 K 线在内最近 `period` 根的成交量平均，首点对齐到下标 `period - 1`。
/// 3. `ratio = volume / average`，均量为零时取 0；`ratio >= surge_ratio` 视为放量。
pub fn volume(
    candles: &[Candle],
    params: VolumeParams,
) -> Result<Series<VolumeValue>, IndicatorError> {
    let spec = IndicatorSpec::Volume(params);
    check_period(&spec, "period", params.period)?;
    if !params.surge_ratio.is_finite() || params.surge_ratio <= 0.0 {
        return Err(invalid(&spec, "surge ratio must be positive"));
    }
    require(&spec, params.period, candles.len())?;

    let obv = on_balance_volume(candles);
    let volumes: Vec<f64> = candles.iter().map(|c| c.volume).collect();
    let values = volumes
        .windows(params.period)
        .zip(obv.iter().skip(params.period - 1))
        .map(|(window, &obv)| {
            let volume = window.last().copied().unwrap_or_default();
            let average = mean(window);
            let ratio = if average > 0.0 { volume / average } else { 0.0 };
            VolumeValue {
                volume,
                average,
                ratio,
                is_surge: ratio >= params.surge_ratio,
                obv,
            }
        })
        .collect();

    Ok(align(candles, params.period - 1, values))
}

/// 与输入等长的 OBV 累计序列
pub fn on_balance_volume(candles: &[Candle]) -> Vec<f64> {
    let mut obv = Vec::with_capacity(candles.len());
    let mut acc = 0.0;
    let mut prev_close: Option<f64> = None;
    for candle in candles {
        if let Some(prev) = prev_close {
            if candle.close > prev {
                acc += candle.volume;
            } else if candle.close < prev {
                acc -= candle.volume;
            }
        }
        prev_close = Some(candle.close);
        obv.push(acc);
    }
    obv
}
