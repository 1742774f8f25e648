use crate::indicator::error::IndicatorError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// # Summary
/// 指标序列中的单个点，按 K 线开盘时间与源序列对齐。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point<T> {
    // 对应 K 线的开盘时间
    pub time: DateTime<Utc>,
    // 指标值
    pub value: T,
}

/// 指标结果序列，从回溯窗口满足的位置开始，每根 K 线一个点。
pub type Series<T> = Vec<Point<T>>;

/// # Summary
/// RSI 参数。超买/超卖阈值属于配置而非常量。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RsiParams {
    pub period: usize,
    pub overbought: f64,
    pub oversold: f64,
}

impl Default for RsiParams {
    fn default() -> Self {
        Self {
            period: 14,
            overbought: 70.0,
            oversold: 30.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MacdParams {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
}

impl Default for MacdParams {
    fn default() -> Self {
        Self {
            fast: 12,
            slow: 26,
            signal: 9,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BollingerParams {
    pub period: usize,
    pub multiplier: f64,
}

impl Default for BollingerParams {
    fn default() -> Self {
        Self {
            period: 20,
            multiplier: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeParams {
    pub period: usize,
    pub surge_ratio: f64,
}

impl Default for VolumeParams {
    fn default() -> Self {
        Self {
            period: 20,
            surge_ratio: 2.0,
        }
    }
}

/// # Summary
/// VWAP 会话边界模式，由调用方提供；VWAP 自身从不自动重置。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VwapSession {
    // 整条序列累计，不重置
    #[default]
    Continuous,
    // 每个 UTC 自然日的第一根 K 线处重置
    UtcDay,
}

/// # Summary
/// 指标种类标签。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IndicatorKind {
    Sma,
    Ema,
    Rsi,
    Macd,
    Bollinger,
    Volume,
    Atr,
    Vwap,
}

/// # Summary
/// 一组具体参数化的指标描述，作为指标集中的查找键。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IndicatorSpec {
    Sma { period: usize },
    Ema { period: usize },
    Rsi(RsiParams),
    Macd(MacdParams),
    Bollinger(BollingerParams),
    Atr { period: usize },
    Volume(VolumeParams),
    Vwap { session: VwapSession },
}

impl IndicatorSpec {
    pub fn kind(&self) -> IndicatorKind {
        match self {
            IndicatorSpec::Sma { .. } => IndicatorKind::Sma,
            IndicatorSpec::Ema { .. } => IndicatorKind::Ema,
            IndicatorSpec::Rsi(_) => IndicatorKind::Rsi,
            IndicatorSpec::Macd(_) => IndicatorKind::Macd,
            IndicatorSpec::Bollinger(_) => IndicatorKind::Bollinger,
            IndicatorSpec::Atr { .. } => IndicatorKind::Atr,
            IndicatorSpec::Volume(_) => IndicatorKind::Volume,
            IndicatorSpec::Vwap { .. } => IndicatorKind::Vwap,
        }
    }
}

impl std::fmt::Display for IndicatorSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndicatorSpec::Sma { period } => write!(f, "sma({})", period),
            IndicatorSpec::Ema { period } => write!(f, "ema({})", period),
            IndicatorSpec::Rsi(p) => write!(f, "rsi({})", p.period),
            IndicatorSpec::Macd(p) => write!(f, "macd({},{},{})", p.fast, p.slow, p.signal),
            IndicatorSpec::Bollinger(p) => write!(f, "bollinger({},{})", p.period, p.multiplier),
            IndicatorSpec::Atr { period } => write!(f, "atr({})", period),
            IndicatorSpec::Volume(p) => write!(f, "volume({})", p.period),
            IndicatorSpec::Vwap { session } => write!(f, "vwap({:?})", session),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RsiValue {
    pub value: f64,
    pub is_overbought: bool,
    pub is_oversold: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdValue {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
    // macd > signal
    pub is_golden_cross: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BollingerValue {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
    pub std_dev: f64,
    pub percent_b: f64,
    pub bandwidth: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeValue {
    pub volume: f64,
    pub average: f64,
    pub ratio: f64,
    pub is_surge: bool,
    // 能量潮累计值
    pub obv: f64,
}

/// # Summary
/// 按指标种类打标签的计算结果。
///
/// # Invariants
/// - 序列与源 K 线序列按时间一一对齐。
#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorResult {
    Sma(Series<f64>),
    Ema(Series<f64>),
    Rsi(Series<RsiValue>),
    Macd(Series<MacdValue>),
    Bollinger(Series<BollingerValue>),
    Atr(Series<f64>),
    Volume(Series<VolumeValue>),
    Vwap(Series<f64>),
}

impl IndicatorResult {
    pub fn kind(&self) -> IndicatorKind {
        match self {
            IndicatorResult::Sma(_) => IndicatorKind::Sma,
            IndicatorResult::Ema(_) => IndicatorKind::Ema,
            IndicatorResult::Rsi(_) => IndicatorKind::Rsi,
            IndicatorResult::Macd(_) => IndicatorKind::Macd,
            IndicatorResult::Bollinger(_) => IndicatorKind::Bollinger,
            IndicatorResult::Atr(_) => IndicatorKind::Atr,
            IndicatorResult::Volume(_) => IndicatorKind::Volume,
            IndicatorResult::Vwap(_) => IndicatorKind::Vwap,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            IndicatorResult::Sma(s)
            | IndicatorResult::Ema(s)
            | IndicatorResult::Atr(s)
            | IndicatorResult::Vwap(s) => s.len(),
            IndicatorResult::Rsi(s) => s.len(),
            IndicatorResult::Macd(s) => s.len(),
            IndicatorResult::Bollinger(s) => s.len(),
            IndicatorResult::Volume(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// # Summary
/// 一次触发中计算出的全部指标，只读共享给所有策略。
///
/// # Invariants
/// - 每个条目独立持有 `Result`，单个指标数据不足不影响其他指标。
/// - 条目顺序即计算顺序，查找按参数完全相等匹配。
#[derive(Debug, Clone, Default)]
pub struct IndicatorSet {
    entries: Vec<(IndicatorSpec, Result<IndicatorResult, IndicatorError>)>,
}

impl IndicatorSet {
    pub fn new(entries: Vec<(IndicatorSpec, Result<IndicatorResult, IndicatorError>)>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[(IndicatorSpec, Result<IndicatorResult, IndicatorError>)] {
        &self.entries
    }

    /// 所有条目均计算失败 (或指标集为空)
    pub fn all_failed(&self) -> bool {
        self.entries.iter().all(|(_, r)| r.is_err())
    }

    /// # Summary
    /// 按参数查找指标结果。
    ///
    /// # Returns
    /// 找到则返回计算结果 (可能本身就是 `InsufficientData`)，
    /// 未配置该参数化时返回 `IndicatorError::InvalidParameter`。
    pub fn get(&self, spec: &IndicatorSpec) -> Result<&IndicatorResult, IndicatorError> {
        match self.entries.iter().find(|(s, _)| s == spec) {
            Some((_, Ok(result))) => Ok(result),
            Some((_, Err(e))) => Err(e.clone()),
            None => Err(IndicatorError::InvalidParameter {
                indicator: spec.to_string(),
                reason: "not computed for this evaluation".to_string(),
            }),
        }
    }

    pub fn sma(&self, period: usize) -> Result<&Series<f64>, IndicatorError> {
        let spec = IndicatorSpec::Sma { period };
        match self.get(&spec)? {
            IndicatorResult::Sma(s) => Ok(s),
            other => Err(mismatch(&spec, other)),
        }
    }

    pub fn ema(&self, period: usize) -> Result<&Series<f64>, IndicatorError> {
        let spec = IndicatorSpec::Ema { period };
        match self.get(&spec)? {
            IndicatorResult::Ema(s) => Ok(s),
            other => Err(mismatch(&spec, other)),
        }
    }

    pub fn rsi(&self, params: RsiParams) -> Result<&Series<RsiValue>, IndicatorError> {
        let spec = IndicatorSpec::Rsi(params);
        match self.get(&spec)? {
            IndicatorResult::Rsi(s) => Ok(s),
            other => Err(mismatch(&spec, other)),
        }
    }

    pub fn macd(&self, params: MacdParams) -> Result<&Series<MacdValue>, IndicatorError> {
        let spec = IndicatorSpec::Macd(params);
        match self.get(&spec)? {
            IndicatorResult::Macd(s) => Ok(s),
            other => Err(mismatch(&spec, other)),
        }
    }

    pub fn bollinger(
        &self,
        params: BollingerParams,
    ) -> Result<&Series<BollingerValue>, IndicatorError> {
        let spec = IndicatorSpec::Bollinger(params);
        match self.get(&spec)? {
            IndicatorResult::Bollinger(s) => Ok(s),
            other => Err(mismatch(&spec, other)),
        }
    }

    pub fn atr(&self, period: usize) -> Result<&Series<f64>, IndicatorError> {
        let spec = IndicatorSpec::Atr { period };
        match self.get(&spec)? {
            IndicatorResult::Atr(s) => Ok(s),
            other => Err(mismatch(&spec, other)),
        }
    }

    pub fn volume(&self, params: VolumeParams) -> Result<&Series<VolumeValue>, IndicatorError> {
        let spec = IndicatorSpec::Volume(params);
        match self.get(&spec)? {
            IndicatorResult::Volume(s) => Ok(s),
            other => Err(mismatch(&spec, other)),
        }
    }

    pub fn vwap(&self, session: VwapSession) -> Result<&Series<f64>, IndicatorError> {
        let spec = IndicatorSpec::Vwap { session };
        match self.get(&spec)? {
            IndicatorResult::Vwap(s) => Ok(s),
            other => Err(mismatch(&spec, other)),
        }
    }
}

fn mismatch(spec: &IndicatorSpec, found: &IndicatorResult) -> IndicatorError {
    IndicatorError::InvalidParameter {
        indicator: spec.to_string(),
        reason: format!("stored result has kind {:?}", found.kind()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn point(v: f64) -> Point<f64> {
        Point {
            time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            value: v,
        }
    }

    #[test]
    fn test_indicator_set_lookup() {
        let set = IndicatorSet::new(vec![
            (
                IndicatorSpec::Sma { period: 20 },
                Ok(IndicatorResult::Sma(vec![point(1.0)])),
            ),
            (
                IndicatorSpec::Sma { period: 50 },
                Err(IndicatorError::InsufficientData {
                    indicator: "sma(50)".to_string(),
                    required: 50,
                    available: 20,
                }),
            ),
        ]);

        assert_eq!(set.sma(20).unwrap().len(), 1);
        assert!(matches!(
            set.sma(50),
            Err(IndicatorError::InsufficientData { required: 50, .. })
        ));
        assert!(matches!(
            set.ema(20),
            Err(IndicatorError::InvalidParameter { .. })
        ));
        assert!(!set.all_failed());
        assert!(IndicatorSet::default().all_failed());
    }

    #[test]
    fn test_spec_display() {
        assert_eq!(IndicatorSpec::Sma { period: 20 }.to_string(), "sma(20)");
        assert_eq!(
            IndicatorSpec::Macd(MacdParams::default()).to_string(),
            "macd(12,26,9)"
        );
        assert_eq!(
            IndicatorSpec::Rsi(RsiParams::default()).kind(),
            IndicatorKind::Rsi
        );
    }
}
