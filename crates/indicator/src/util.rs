use tenkan_core::indicator::entity::{IndicatorSpec, Point, Series};
use tenkan_core::indicator::error::IndicatorError;
use tenkan_core::market::entity::Candle;

/// 校验周期参数非零
pub(crate) fn check_period(
    spec: &IndicatorSpec,
    name: &str,
    period: usize,
) -> Result<(), IndicatorError> {
    if period == 0 {
        return Err(IndicatorError::InvalidParameter {
            indicator: spec.to_string(),
            reason: format!("{} must be greater than zero", name),
        });
    }
    Ok(())
}

/// 校验序列长度满足回溯窗口
pub(crate) fn require(
    spec: &IndicatorSpec,
    required: usize,
    available: usize,
) -> Result<(), IndicatorError> {
    if available < required {
        return Err(IndicatorError::InsufficientData {
            indicator: spec.to_string(),
            required,
            available,
        });
    }
    Ok(())
}

pub(crate) fn invalid(spec: &IndicatorSpec, reason: impl Into<String>) -> IndicatorError {
    IndicatorError::InvalidParameter {
        indicator: spec.to_string(),
        reason: reason.into(),
    }
}

pub(crate) fn closes(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.close).collect()
}

/// # Summary
/// 将从 `offset` 位置开始的数值序列与 K 线开盘时间对齐。
///
/// # Invariants
/// - `values.len() == candles.len() - offset`，多余部分被 zip 截断。
pub(crate) fn align<T>(candles: &[Candle], offset: usize, values: Vec<T>) -> Series<T> {
    candles
        .iter()
        .skip(offset)
        .zip(values)
        .map(|(c, value)| Point {
            time: c.open_time,
            value,
        })
        .collect()
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / tenkan_core::common::num::count_to_f64(values.len())
}
