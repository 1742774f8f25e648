use crate::util::{align, check_period, closes, invalid, require};
use tenkan_core::common::num::count_to_f64;
use tenkan_core::indicator::entity::{IndicatorSpec, RsiParams, RsiValue, Series};
use tenkan_core::indicator::error::IndicatorError;
use tenkan_core::market::entity::Candle;

/// # Summary
/// 相对强弱指数 (Wilder 平滑)。
///
/// # Logic
/// 1. 以前 `period` 个涨跌幅的平均涨幅/跌幅作为种子，首个结果对齐到下标 `period`。
/// 2. 之后 `avg = (avg * (period - 1) + x) / period`。
/// 3. `RS = avgGain / avgLoss`，`avgLoss == 0` 时取 `RS = 100`。
/// 4. `RSI = 100 - 100 / (1 + RS)`，按配置阈值标记超买超卖 (含边界)。
///
/// # Arguments
/// * `candles`: 按时间升序的 K 线序列，至少 `period + 1` 根。
/// * `params`: 周期与超买超卖阈值。
pub fn rsi(candles: &[Candle], params: RsiParams) -> Result<Series<RsiValue>, IndicatorError> {
    let spec = IndicatorSpec::Rsi(params);
    check_period(&spec, "period", params.period)?;
    if !(0.0..=100.0).contains(&params.oversold)
        || !(0.0..=100.0).contains(&params.overbought)
        || params.oversold >= params.overbought
    {
        return Err(invalid(
            &spec,
            "thresholds must satisfy 0 <= oversold < overbought <= 100",
        ));
    }
    require(&spec, params.period + 1, candles.len())?;

    let prices = closes(candles);
    let deltas: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();
    let (seed, rest) = deltas.split_at(params.period);

    let period = count_to_f64(params.period);
    let mut avg_gain = seed.iter().map(|d| d.max(0.0)).sum::<f64>() / period;
    let mut avg_loss = seed.iter().map(|d| (-d).max(0.0)).sum::<f64>() / period;

    let mut values = Vec::with_capacity(rest.len() + 1);
    values.push(to_value(avg_gain, avg_loss, &params));
    for &delta in rest {
        avg_gain = (avg_gain * (period - 1.0) + delta.max(0.0)) / period;
        avg_loss = (avg_loss * (period - 1.0) + (-delta).max(0.0)) / period;
        values.push(to_value(avg_gain, avg_loss, &params));
    }

    Ok(align(candles, params.period, values))
}

fn to_value(avg_gain: f64, avg_loss: f64, params: &RsiParams) -> RsiValue {
    let rs = if avg_loss == 0.0 {
        100.0
    } else {
        avg_gain / avg_loss
    };
    let value = (100.0 - 100.0 / (1.0 + rs)).clamp(0.0, 100.0);
    RsiValue {
        value,
        is_overbought: value >= params.overbought,
        is_oversold: value <= params.oversold,
    }
}
