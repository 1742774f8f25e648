use super::{Cross, cross, last_two, latest};
use tenkan_core::indicator::entity::IndicatorSpec;
use tenkan_core::strategy::entity::{Evidence, SignalLevel, StrategyResult};
use tenkan_core::strategy::error::StrategyError;
use tenkan_core::strategy::port::{Strategy, StrategyContext};

/// # Summary
/// 均线突破：收盘价上穿/下穿 SMA(period)。
///
/// # Logic
/// 1. 当前收盘价在均线之上，而前一根 K 线不在均线之上时给出 `BUY`。
/// 2. 当前收盘价在均线之下，而前一根 K 线不在均线之下时给出 `SELL`。
/// 3. 均线的第一个点 (前一根 K 线尚无均线值) 视为 "不在之上/之下"。
pub struct MaBreakout {
    period: usize,
}

impl MaBreakout {
    pub const ID: &'static str = "ma_breakout";

    pub fn new(period: usize) -> Self {
        Self { period }
    }
}

impl Strategy for MaBreakout {
    fn id(&self) -> &str {
        Self::ID
    }

    fn requirements(&self) -> Vec<IndicatorSpec> {
        vec![IndicatorSpec::Sma {
            period: self.period,
        }]
    }

    fn evaluate(&self, ctx: &StrategyContext) -> Result<StrategyResult, StrategyError> {
        let sma = ctx.indicators.sma(self.period)?;
        let (prev_sma, cur_sma) = latest("sma", sma)?;
        let cur = ctx
            .candles
            .last()
            .ok_or_else(|| super::insufficient("candles", 1, 0))?;
        let prev_close = ctx.last_two_candles().ok().map(|(prev, _)| prev.close);

        let was_above = matches!((prev_close, prev_sma), (Some(c), Some(s)) if c > s);
        let was_below = matches!((prev_close, prev_sma), (Some(c), Some(s)) if c < s);

        let mut evidence = Evidence::default()
            .with_value("close", cur.close)
            .with_value(format!("sma{}", self.period), cur_sma);
        let signal = if cur.close > cur_sma && !was_above {
            evidence = evidence.with_condition(format!("close crossed above SMA({})", self.period));
            SignalLevel::Buy
        } else if cur.close < cur_sma && !was_below {
            evidence = evidence.with_condition(format!("close crossed below SMA({})", self.period));
            SignalLevel::Sell
        } else {
            SignalLevel::Neutral
        };
        Ok(ctx.result(Self::ID, signal, evidence))
    }
}

/// # Summary
/// SMA 快慢线金叉/死叉。
pub struct MaCross {
    fast: usize,
    slow: usize,
}

impl MaCross {
    pub const ID: &'static str = "ma_cross";

    pub fn new(fast: usize, slow: usize) -> Self {
        Self { fast, slow }
    }
}

impl Strategy for MaCross {
    fn id(&self) -> &str {
        Self::ID
    }

    fn requirements(&self) -> Vec<IndicatorSpec> {
        vec![
            IndicatorSpec::Sma { period: self.fast },
            IndicatorSpec::Sma { period: self.slow },
        ]
    }

    fn evaluate(&self, ctx: &StrategyContext) -> Result<StrategyResult, StrategyError> {
        let (prev_fast, fast) = last_two("sma_fast", ctx.indicators.sma(self.fast)?)?;
        let (prev_slow, slow) = last_two("sma_slow", ctx.indicators.sma(self.slow)?)?;

        let evidence = Evidence::default()
            .with_value(format!("sma{}", self.fast), fast)
            .with_value(format!("sma{}", self.slow), slow);
        let (signal, evidence) = match cross(prev_fast, prev_slow, fast, slow) {
            Cross::Golden => (
                SignalLevel::Buy,
                evidence.with_condition(format!("SMA({}) golden cross SMA({})", self.fast, self.slow)),
            ),
            Cross::Dead => (
                SignalLevel::Sell,
                evidence.with_condition(format!("SMA({}) dead cross SMA({})", self.fast, self.slow)),
            ),
            Cross::None => (SignalLevel::Neutral, evidence),
        };
        Ok(ctx.result(Self::ID, signal, evidence))
    }
}

/// # Summary
/// EMA 趋势：EMA 快慢线交叉，由收盘价相对 SMA(confirm) 确认。
///
/// # Logic
/// 交叉方向与趋势过滤一致时给出 `BUY`/`SELL`，否则降级为 `WEAK_BUY`/`WEAK_SELL`。
pub struct EmaTrend {
    fast: usize,
    slow: usize,
    confirm: usize,
}

impl EmaTrend {
    pub const ID: &'static str = "ema_trend";

    pub fn new(fast: usize, slow: usize, confirm: usize) -> Self {
        Self {
            fast,
            slow,
            confirm,
        }
    }
}

impl Strategy for EmaTrend {
    fn id(&self) -> &str {
        Self::ID
    }

    fn requirements(&self) -> Vec<IndicatorSpec> {
        vec![
            IndicatorSpec::Ema { period: self.fast },
            IndicatorSpec::Ema { period: self.slow },
            IndicatorSpec::Sma {
                period: self.confirm,
            },
        ]
    }

    fn evaluate(&self, ctx: &StrategyContext) -> Result<StrategyResult, StrategyError> {
        let (prev_fast, fast) = last_two("ema_fast", ctx.indicators.ema(self.fast)?)?;
        let (prev_slow, slow) = last_two("ema_slow", ctx.indicators.ema(self.slow)?)?;
        let (_, trend) = latest("sma_confirm", ctx.indicators.sma(self.confirm)?)?;
        let (_, cur) = ctx.last_two_candles()?;

        let evidence = Evidence::default()
            .with_value(format!("ema{}", self.fast), fast)
            .with_value(format!("ema{}", self.slow), slow)
            .with_value(format!("sma{}", self.confirm), trend)
            .with_value("close", cur.close);
        let (signal, evidence) = match cross(prev_fast, prev_slow, fast, slow) {
            Cross::Golden if cur.close > trend => (
                SignalLevel::Buy,
                evidence
                    .with_condition("EMA golden cross")
                    .with_condition(format!("close above SMA({})", self.confirm)),
            ),
            Cross::Golden => (
                SignalLevel::WeakBuy,
                evidence
                    .with_condition("EMA golden cross")
                    .with_note("against the longer trend"),
            ),
            Cross::Dead if cur.close < trend => (
                SignalLevel::Sell,
                evidence
                    .with_condition("EMA dead cross")
                    .with_condition(format!("close below SMA({})", self.confirm)),
            ),
            Cross::Dead => (
                SignalLevel::WeakSell,
                evidence
                    .with_condition("EMA dead cross")
                    .with_note("against the longer trend"),
            ),
            Cross::None => (SignalLevel::Neutral, evidence),
        };
        Ok(ctx.result(Self::ID, signal, evidence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::fixtures::{candles, context};

    fn run(strategy: &dyn Strategy, closes: &[f64]) -> Result<StrategyResult, StrategyError> {
        let ctx = context(candles(closes), &strategy.requirements());
        strategy.evaluate(&ctx)
    }

    #[test]
    fn test_breakout_fires_once_on_cross() {
        let strategy = MaBreakout::new(3);
        // SMA3 在 10，随后收盘价升到均线之上
        let below = [10.0, 10.0, 10.0, 9.0];
        assert_eq!(run(&strategy, &below).unwrap().signal, SignalLevel::Sell);
        let crossing = [10.0, 10.0, 10.0, 9.0, 12.0];
        let result = run(&strategy, &crossing).unwrap();
        assert_eq!(result.signal, SignalLevel::Buy);
        assert_eq!(result.evidence.conditions.len(), 1);
        let persisting = [10.0, 10.0, 10.0, 9.0, 12.0, 13.0];
        assert_eq!(run(&strategy, &persisting).unwrap().signal, SignalLevel::Neutral);
    }

    #[test]
    fn test_breakout_warm_up_boundary() {
        let strategy = MaBreakout::new(3);
        assert_eq!(run(&strategy, &[1.0, 2.0, 3.0]).unwrap().signal, SignalLevel::Buy);
        assert!(matches!(
            run(&strategy, &[1.0, 2.0]),
            Err(StrategyError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_ma_cross() {
        let strategy = MaCross::new(2, 4);
        // 下跌后急拉，快线上穿慢线
        let closes = [10.0, 9.0, 8.0, 7.0, 6.0, 12.0];
        assert_eq!(run(&strategy, &closes).unwrap().signal, SignalLevel::Buy);
        let closes = [5.0, 6.0, 7.0, 8.0, 9.0, 3.0];
        assert_eq!(run(&strategy, &closes).unwrap().signal, SignalLevel::Sell);
    }

    #[test]
    fn test_ema_trend_against_trend_is_weak() {
        let strategy = EmaTrend::new(2, 3, 8);
        // 长期下跌后的单根反弹：EMA 金叉但仍在 SMA(8) 之下
        let closes = [20.0, 19.0, 18.0, 17.0, 16.0, 15.0, 14.0, 13.0, 15.5];
        let result = run(&strategy, &closes).unwrap();
        assert_eq!(result.signal, SignalLevel::WeakBuy);
        assert!(result.evidence.notes.is_some());
    }
}
