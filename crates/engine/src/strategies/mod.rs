//! 内置策略目录。
//!
//! 每个策略比较前后两个指标值，只在状态迁移的那一根 K 线上给出方向性信号，
//! 条件持续期间返回 `NEUTRAL`。

pub mod moving_average;
pub mod oscillator;
pub mod volatility;
pub mod volume;

use tenkan_core::indicator::entity::Series;
use tenkan_core::indicator::error::IndicatorError;
use tenkan_core::strategy::error::StrategyError;

pub use moving_average::{EmaTrend, MaBreakout, MaCross};
pub use oscillator::{MacdCross, RsiReversal};
pub use volatility::{AtrBreakout, BollingerReversion, BollingerSqueeze};
pub use volume::{ObvDivergence, VolumeSurge, VwapCross};

/// # Summary
/// 取序列最后一个点，以及 (若存在) 它前面的一个点。
///
/// # Returns
/// 序列为空时返回 `InsufficientData`；只有一个点时前值为 `None` (预热边界)。
pub(crate) fn latest<T: Copy>(
    name: &str,
    series: &Series<T>,
) -> Result<(Option<T>, T), StrategyError> {
    match series.as_slice() {
        [.., prev, cur] => Ok((Some(prev.value), cur.value)),
        [cur] => Ok((None, cur.value)),
        [] => Err(insufficient(name, 1, 0)),
    }
}

/// 取序列最后两个点，不足两个点时返回 `InsufficientData`
pub(crate) fn last_two<T: Copy>(name: &str, series: &Series<T>) -> Result<(T, T), StrategyError> {
    match series.as_slice() {
        [.., prev, cur] => Ok((prev.value, cur.value)),
        _ => Err(insufficient(name, 2, series.len())),
    }
}

pub(crate) fn insufficient(name: &str, required: usize, available: usize) -> StrategyError {
    StrategyError::InsufficientData(IndicatorError::InsufficientData {
        indicator: name.to_string(),
        required,
        available,
    })
}

/// 两条线的交叉方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Cross {
    Golden,
    Dead,
    None,
}

/// # Summary
/// 判定快线相对慢线在前后两点之间是否发生交叉。
///
/// # Logic
/// 前一点 `fast <= slow` 且当前 `fast > slow` 为金叉；前一点 `fast >= slow` 且当前 `fast < slow` 为死叉。
pub(crate) fn cross(prev_fast: f64, prev_slow: f64, fast: f64, slow: f64) -> Cross {
    if prev_fast <= prev_slow && fast > slow {
        Cross::Golden
    } else if prev_fast >= prev_slow && fast < slow {
        Cross::Dead
    } else {
        Cross::None
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{TimeZone, Utc};
    use tenkan_core::common::{InstrumentKey, TimeFrame};
    use tenkan_core::indicator::entity::IndicatorSpec;
    use tenkan_core::market::entity::Candle;
    use tenkan_core::strategy::port::StrategyContext;
    use tenkan_core::testing::candles_from_closes;

    pub fn candles(closes: &[f64]) -> Vec<Candle> {
        candles_from_closes(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(), closes, 10.0)
    }

    pub fn context(candles: Vec<Candle>, specs: &[IndicatorSpec]) -> StrategyContext {
        let indicators = tenkan_indicator::compute_set(specs, &candles);
        StrategyContext {
            key: InstrumentKey::new("BTCUSDT", "spot"),
            timeframe: TimeFrame::Minute1,
            candles,
            indicators,
        }
    }
}
