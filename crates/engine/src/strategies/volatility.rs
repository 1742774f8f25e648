use super::{insufficient, last_two};
use tenkan_core::indicator::entity::{BollingerParams, IndicatorSpec};
use tenkan_core::strategy::entity::{Evidence, SignalLevel, StrategyResult};
use tenkan_core::strategy::error::StrategyError;
use tenkan_core::strategy::port::{Strategy, StrategyContext};

/// # Summary
/// 布林带均值回归：收盘价从带外回到带内。
///
/// # Logic
/// 前一根收于下轨之下、当前收回下轨之上时 `BUY`；上轨方向对称 `SELL`。
pub struct BollingerReversion {
    params: BollingerParams,
}

impl BollingerReversion {
    pub const ID: &'static str = "bollinger_reversion";

    pub fn new(params: BollingerParams) -> Self {
        Self { params }
    }
}

impl Strategy for BollingerReversion {
    fn id(&self) -> &str {
        Self::ID
    }

    fn requirements(&self) -> Vec<IndicatorSpec> {
        vec![IndicatorSpec::Bollinger(self.params)]
    }

    fn evaluate(&self, ctx: &StrategyContext) -> Result<StrategyResult, StrategyError> {
        let (prev_band, band) = last_two("bollinger", ctx.indicators.bollinger(self.params)?)?;
        let (prev, cur) = ctx.last_two_candles()?;

        let evidence = Evidence::default()
            .with_value("close", cur.close)
            .with_value("upper", band.upper)
            .with_value("lower", band.lower)
            .with_value("percent_b", band.percent_b);
        let (signal, evidence) = if prev.close < prev_band.lower && cur.close >= band.lower {
            (
                SignalLevel::Buy,
                evidence.with_condition("close re-entered above lower band"),
            )
        } else if prev.close > prev_band.upper && cur.close <= band.upper {
            (
                SignalLevel::Sell,
                evidence.with_condition("close re-entered below upper band"),
            )
        } else {
            (SignalLevel::Neutral, evidence)
        };
        Ok(ctx.result(Self::ID, signal, evidence))
    }
}

/// # Summary
/// 布林带收口突破。
///
/// # Logic
/// 1. 前一根 K 线的带宽是最近 `lookback` 个带宽中的最小值 (收口)。
/// 2. 当前带宽扩张，且收盘价突破上轨时 `STRONG_BUY`，跌破下轨时 `STRONG_SELL`。
pub struct BollingerSqueeze {
    params: BollingerParams,
    lookback: usize,
}

impl BollingerSqueeze {
    pub const ID: &'static str = "bollinger_squeeze";

    pub fn new(params: BollingerParams, lookback: usize) -> Self {
        Self {
            params,
            lookback: lookback.max(1),
        }
    }
}

impl Strategy for BollingerSqueeze {
    fn id(&self) -> &str {
        Self::ID
    }

    fn requirements(&self) -> Vec<IndicatorSpec> {
        vec![IndicatorSpec::Bollinger(self.params)]
    }

    fn evaluate(&self, ctx: &StrategyContext) -> Result<StrategyResult, StrategyError> {
        let bands = ctx.indicators.bollinger(self.params)?;
        let required = self.lookback + 1;
        if bands.len() < required {
            return Err(insufficient("bollinger_squeeze", required, bands.len()));
        }
        let (history, _) = bands.split_at(bands.len() - 1);
        let window = &history[history.len() - self.lookback..];
        let (prev, band) = last_two("bollinger", bands)?;
        let (_, cur) = ctx.last_two_candles()?;

        let narrowest = window
            .iter()
            .map(|p| p.value.bandwidth)
            .fold(f64::INFINITY, f64::min);
        let squeezed = prev.bandwidth <= narrowest;
        let expanding = band.bandwidth > prev.bandwidth;

        let evidence = Evidence::default()
            .with_value("bandwidth", band.bandwidth)
            .with_value("bandwidth_prev", prev.bandwidth)
            .with_value("close", cur.close);
        let (signal, evidence) = match (squeezed && expanding, cur.close) {
            (true, close) if close > band.upper => (
                SignalLevel::StrongBuy,
                evidence
                    .with_condition(format!("bandwidth at {}-bar low", self.lookback))
                    .with_condition("close broke above upper band"),
            ),
            (true, close) if close < band.lower => (
                SignalLevel::StrongSell,
                evidence
                    .with_condition(format!("bandwidth at {}-bar low", self.lookback))
                    .with_condition("close broke below lower band"),
            ),
            _ => (SignalLevel::Neutral, evidence),
        };
        Ok(ctx.result(Self::ID, signal, evidence))
    }
}

/// # Summary
/// ATR 波动突破：单根 K 线的收盘变动超过前一根 ATR 的 `multiplier` 倍。
pub struct AtrBreakout {
    period: usize,
    multiplier: f64,
}

impl AtrBreakout {
    pub const ID: &'static str = "atr_breakout";

    pub fn new(period: usize, multiplier: f64) -> Self {
        Self { period, multiplier }
    }
}

impl Strategy for AtrBreakout {
    fn id(&self) -> &str {
        Self::ID
    }

    fn requirements(&self) -> Vec<IndicatorSpec> {
        vec![IndicatorSpec::Atr {
            period: self.period,
        }]
    }

    fn evaluate(&self, ctx: &StrategyContext) -> Result<StrategyResult, StrategyError> {
        let (prev_atr, atr) = last_two("atr", ctx.indicators.atr(self.period)?)?;
        let (prev, cur) = ctx.last_two_candles()?;
        let change = cur.close - prev.close;
        let threshold = self.multiplier * prev_atr;

        let evidence = Evidence::default()
            .with_value("atr", atr)
            .with_value("atr_prev", prev_atr)
            .with_value("change", change);
        let (signal, evidence) = if threshold <= 0.0 {
            (SignalLevel::Neutral, evidence.with_note("zero volatility"))
        } else if change > threshold {
            (
                SignalLevel::Buy,
                evidence.with_condition(format!("close rose more than {}x ATR", self.multiplier)),
            )
        } else if change < -threshold {
            (
                SignalLevel::Sell,
                evidence.with_condition(format!("close fell more than {}x ATR", self.multiplier)),
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
    use crate::strategies::fixtures::{candles, context};

    fn params(period: usize) -> BollingerParams {
        BollingerParams {
            period,
            multiplier: 1.0,
        }
    }

    #[test]
    fn test_reversion_from_below() {
        let strategy = BollingerReversion::new(params(4));
        let closes = [10.0, 11.0, 10.0, 11.0, 5.0, 9.5];
        let ctx = context(candles(&closes), &strategy.requirements());
        assert_eq!(strategy.evaluate(&ctx).unwrap().signal, SignalLevel::Buy);
    }

    #[test]
    fn test_squeeze_breakout() {
        let strategy = BollingerSqueeze::new(params(3), 3);
        // 先放大波动，再逐步收窄，最后向上突破
        let closes = [10.0, 14.0, 8.0, 12.0, 10.0, 11.0, 10.5, 10.5, 10.5, 13.0];
        let ctx = context(candles(&closes), &strategy.requirements());
        let result = strategy.evaluate(&ctx).unwrap();
        assert_eq!(result.signal, SignalLevel::StrongBuy);
        assert_eq!(result.evidence.conditions.len(), 2);
    }

    #[test]
    fn test_squeeze_needs_history() {
        let strategy = BollingerSqueeze::new(params(3), 5);
        let ctx = context(candles(&[1.0, 2.0, 3.0, 4.0]), &strategy.requirements());
        assert!(matches!(
            strategy.evaluate(&ctx),
            Err(StrategyError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_atr_breakout_down() {
        let strategy = AtrBreakout::new(3, 1.5);
        let closes = [100.0, 101.0, 100.0, 101.0, 100.0, 95.0];
        let ctx = context(candles(&closes), &strategy.requirements());
        assert_eq!(strategy.evaluate(&ctx).unwrap().signal, SignalLevel::Sell);
    }
}
