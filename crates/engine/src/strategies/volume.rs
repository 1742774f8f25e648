use super::{insufficient, last_two};
use tenkan_core::indicator::entity::{IndicatorSpec, VolumeParams, VwapSession};
use tenkan_core::strategy::entity::{Evidence, SignalLevel, StrategyResult};
use tenkan_core::strategy::error::StrategyError;
use tenkan_core::strategy::port::{Strategy, StrategyContext};

/// # Summary
/// 放量启动：量比首次达到放量阈值，方向取当前 K 线实体。
pub struct VolumeSurge {
    params: VolumeParams,
}

impl VolumeSurge {
    pub const ID: &'static str = "volume_surge";

    pub fn new(params: VolumeParams) -> Self {
        Self { params }
    }
}

impl Strategy for VolumeSurge {
    fn id(&self) -> &str {
        Self::ID
    }

    fn requirements(&self) -> Vec<IndicatorSpec> {
        vec![IndicatorSpec::Volume(self.params)]
    }

    fn evaluate(&self, ctx: &StrategyContext) -> Result<StrategyResult, StrategyError> {
        let (prev, vol) = last_two("volume", ctx.indicators.volume(self.params)?)?;
        let (_, cur) = ctx.last_two_candles()?;

        let evidence = Evidence::default()
            .with_value("volume", vol.volume)
            .with_value("volume_average", vol.average)
            .with_value("volume_ratio", vol.ratio);
        if prev.is_surge || !vol.is_surge {
            return Ok(ctx.result(Self::ID, SignalLevel::Neutral, evidence));
        }

        let evidence = evidence.with_condition(format!(
            "volume ratio {:.2} reached {}",
            vol.ratio, self.params.surge_ratio
        ));
        let (signal, evidence) = if cur.is_bullish() {
            (SignalLevel::Buy, evidence.with_condition("bullish candle body"))
        } else if cur.is_bearish() {
            (SignalLevel::Sell, evidence.with_condition("bearish candle body"))
        } else {
            (SignalLevel::Neutral, evidence.with_note("surge without direction"))
        };
        Ok(ctx.result(Self::ID, signal, evidence))
    }
}

/// # Summary
/// 收盘价穿越 VWAP，信号强度为弱。
pub struct VwapCross {
    session: VwapSession,
}

impl VwapCross {
    pub const ID: &'static str = "vwap_cross";

    pub fn new(session: VwapSession) -> Self {
        Self { session }
    }
}

impl Strategy for VwapCross {
    fn id(&self) -> &str {
        Self::ID
    }

    fn requirements(&self) -> Vec<IndicatorSpec> {
        vec![IndicatorSpec::Vwap {
            session: self.session,
        }]
    }

    fn evaluate(&self, ctx: &StrategyContext) -> Result<StrategyResult, StrategyError> {
        let (prev_vwap, vwap) = last_two("vwap", ctx.indicators.vwap(self.session)?)?;
        let (prev, cur) = ctx.last_two_candles()?;

        let evidence = Evidence::default()
            .with_value("vwap", vwap)
            .with_value("close", cur.close);
        let (signal, evidence) = if prev.close <= prev_vwap && cur.close > vwap {
            (
                SignalLevel::WeakBuy,
                evidence.with_condition("close crossed above VWAP"),
            )
        } else if prev.close >= prev_vwap && cur.close < vwap {
            (
                SignalLevel::WeakSell,
                evidence.with_condition("close crossed below VWAP"),
            )
        } else {
            (SignalLevel::Neutral, evidence)
        };
        Ok(ctx.result(Self::ID, signal, evidence))
    }
}

/// # Summary
/// 量价背离：价格创 `lookback` 周期新低/新高，而 OBV 没有确认。
///
/// # Logic
/// 1. 当前收盘价低于此前 `lookback` 根的最低收盘价，而 OBV 高于同窗口最低 OBV：底背离 `BUY`。
/// 2. 当前收盘价高于此前最高收盘价，而 OBV 低于同窗口最高 OBV：顶背离 `SELL`。
pub struct ObvDivergence {
    params: VolumeParams,
    lookback: usize,
}

impl ObvDivergence {
    pub const ID: &'static str = "obv_divergence";

    pub fn new(params: VolumeParams, lookback: usize) -> Self {
        Self {
            params,
            lookback: lookback.max(1),
        }
    }
}

impl Strategy for ObvDivergence {
    fn id(&self) -> &str {
        Self::ID
    }

    fn requirements(&self) -> Vec<IndicatorSpec> {
        vec![IndicatorSpec::Volume(self.params)]
    }

    fn evaluate(&self, ctx: &StrategyContext) -> Result<StrategyResult, StrategyError> {
        let series = ctx.indicators.volume(self.params)?;
        let required = self.lookback + 1;
        if series.len() < required || ctx.candles.len() < required {
            return Err(insufficient("obv_divergence", required, series.len()));
        }

        // 指标序列与 K 线序列尾部对齐
        let points = &series[series.len() - required..];
        let candles = &ctx.candles[ctx.candles.len() - required..];
        let (window_points, current_point) = points.split_at(self.lookback);
        let (window_candles, current_candle) = candles.split_at(self.lookback);
        let (Some(point), Some(candle)) = (current_point.first(), current_candle.first()) else {
            return Err(insufficient("obv_divergence", required, series.len()));
        };
        let obv = point.value.obv;
        let close = candle.close;

        let low = window_candles.iter().map(|c| c.close).fold(f64::INFINITY, f64::min);
        let high = window_candles
            .iter()
            .map(|c| c.close)
            .fold(f64::NEG_INFINITY, f64::max);
        let obv_low = window_points
            .iter()
            .map(|p| p.value.obv)
            .fold(f64::INFINITY, f64::min);
        let obv_high = window_points
            .iter()
            .map(|p| p.value.obv)
            .fold(f64::NEG_INFINITY, f64::max);

        let evidence = Evidence::default()
            .with_value("close", close)
            .with_value("obv", obv)
            .with_value("window_low", low)
            .with_value("window_high", high);
        let (signal, evidence) = if close < low && obv > obv_low {
            (
                SignalLevel::Buy,
                evidence.with_condition(format!(
                    "price made {}-bar low, OBV did not",
                    self.lookback
                )),
            )
        } else if close > high && obv < obv_high {
            (
                SignalLevel::Sell,
                evidence.with_condition(format!(
                    "price made {}-bar high, OBV did not",
                    self.lookback
                )),
            )
        } else {
            (SignalLevel::Neutral, evidence)
        };
        Ok(ctx.result(Self::ID, signal, evidence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::fixtures::context;
    use chrono::{Duration, TimeZone, Utc};
    use tenkan_core::market::entity::Candle;
    use tenkan_core::testing::minute_candle;

    /// (open, close, volume)
    fn bars(spec: &[(f64, f64, f64)]) -> Vec<Candle> {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        spec.iter()
            .zip(0i64..)
            .map(|(&(open, close, volume), i)| {
                let (high, low) = (open.max(close), open.min(close));
                minute_candle(t + Duration::minutes(i), open, high, low, close, volume)
            })
            .collect()
    }

    fn volume_params() -> VolumeParams {
        VolumeParams {
            period: 3,
            surge_ratio: 2.0,
        }
    }

    #[test]
    fn test_surge_onset_direction() {
        let strategy = VolumeSurge::new(volume_params());
        let quiet = [(10.0, 10.0, 1.0); 3];
        let mut spec = quiet.to_vec();
        spec.push((10.0, 11.0, 10.0));
        let ctx = context(bars(&spec), &strategy.requirements());
        assert_eq!(strategy.evaluate(&ctx).unwrap().signal, SignalLevel::Buy);

        let mut spec = quiet.to_vec();
        spec.push((11.0, 9.0, 10.0));
        let ctx = context(bars(&spec), &strategy.requirements());
        assert_eq!(strategy.evaluate(&ctx).unwrap().signal, SignalLevel::Sell);
    }

    #[test]
    fn test_vwap_cross_is_weak() {
        let strategy = VwapCross::new(VwapSession::Continuous);
        let candles = bars(&[(10.0, 10.0, 5.0), (10.0, 9.0, 5.0), (9.0, 12.0, 1.0)]);
        let ctx = context(candles, &strategy.requirements());
        assert_eq!(strategy.evaluate(&ctx).unwrap().signal, SignalLevel::WeakBuy);
    }

    #[test]
    fn test_bullish_obv_divergence() {
        let strategy = ObvDivergence::new(volume_params(), 3);
        // 价格小幅新低但量能萎缩，OBV 高于窗口低点
        let candles = bars(&[
            (10.0, 10.0, 1.0),
            (10.0, 9.0, 10.0),
            (9.0, 10.0, 8.0),
            (10.0, 9.5, 1.0),
            (9.5, 9.8, 2.0),
            (9.8, 8.9, 1.0),
        ]);
        let ctx = context(candles, &strategy.requirements());
        let result = strategy.evaluate(&ctx).unwrap();
        assert_eq!(result.signal, SignalLevel::Buy);
    }
}
