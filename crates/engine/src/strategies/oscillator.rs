use super::last_two;
use tenkan_core::indicator::entity::{IndicatorSpec, MacdParams, RsiParams};
use tenkan_core::strategy::entity::{Evidence, SignalLevel, StrategyResult};
use tenkan_core::strategy::error::StrategyError;
use tenkan_core::strategy::port::{Strategy, StrategyContext};

/// # Summary
/// RSI 反转：离开超卖区买入，离开超买区卖出。
///
/// # Logic
/// 1. 前值超卖且当前值不再超卖时给出 `BUY`；前值不高于 `extreme_low` 时升级为 `STRONG_BUY`。
/// 2. 超买方向对称。
pub struct RsiReversal {
    params: RsiParams,
    extreme_low: f64,
    extreme_high: f64,
}

impl RsiReversal {
    pub const ID: &'static str = "rsi_reversal";

    pub fn new(params: RsiParams, extreme_low: f64, extreme_high: f64) -> Self {
        Self {
            params,
            extreme_low,
            extreme_high,
        }
    }
}

impl Strategy for RsiReversal {
    fn id(&self) -> &str {
        Self::ID
    }

    fn requirements(&self) -> Vec<IndicatorSpec> {
        vec![IndicatorSpec::Rsi(self.params)]
    }

    fn evaluate(&self, ctx: &StrategyContext) -> Result<StrategyResult, StrategyError> {
        let (prev, cur) = last_two("rsi", ctx.indicators.rsi(self.params)?)?;
        let evidence = Evidence::default()
            .with_value("rsi", cur.value)
            .with_value("rsi_prev", prev.value);

        let (signal, evidence) = if prev.is_oversold && !cur.is_oversold {
            let level = if prev.value <= self.extreme_low {
                SignalLevel::StrongBuy
            } else {
                SignalLevel::Buy
            };
            (
                level,
                evidence.with_condition(format!("RSI left oversold zone ({})", self.params.oversold)),
            )
        } else if prev.is_overbought && !cur.is_overbought {
            let level = if prev.value >= self.extreme_high {
                SignalLevel::StrongSell
            } else {
                SignalLevel::Sell
            };
            (
                level,
                evidence.with_condition(format!(
                    "RSI left overbought zone ({})",
                    self.params.overbought
                )),
            )
        } else {
            (SignalLevel::Neutral, evidence)
        };
        Ok(ctx.result(Self::ID, signal, evidence))
    }
}

/// # Summary
/// MACD 信号线交叉。
///
/// # Logic
/// 金叉给出 `BUY`，若发生在零轴下方 (反转更早) 升级为 `STRONG_BUY`；死叉对称。
pub struct MacdCross {
    params: MacdParams,
}

impl MacdCross {
    pub const ID: &'static str = "macd_cross";

    pub fn new(params: MacdParams) -> Self {
        Self { params }
    }
}

impl Strategy for MacdCross {
    fn id(&self) -> &str {
        Self::ID
    }

    fn requirements(&self) -> Vec<IndicatorSpec> {
        vec![IndicatorSpec::Macd(self.params)]
    }

    fn evaluate(&self, ctx: &StrategyContext) -> Result<StrategyResult, StrategyError> {
        let (prev, cur) = last_two("macd", ctx.indicators.macd(self.params)?)?;
        let evidence = Evidence::default()
            .with_value("macd", cur.macd)
            .with_value("signal", cur.signal)
            .with_value("histogram", cur.histogram);

        let (signal, evidence) = if !prev.is_golden_cross && cur.is_golden_cross {
            let level = if cur.macd < 0.0 {
                SignalLevel::StrongBuy
            } else {
                SignalLevel::Buy
            };
            (level, evidence.with_condition("MACD crossed above signal line"))
        } else if prev.is_golden_cross && !cur.is_golden_cross {
            let level = if cur.macd > 0.0 {
                SignalLevel::StrongSell
            } else {
                SignalLevel::Sell
            };
            (level, evidence.with_condition("MACD crossed below signal line"))
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

    #[test]
    fn test_rsi_leaving_oversold() {
        let params = RsiParams {
            period: 3,
            ..RsiParams::default()
        };
        let strategy = RsiReversal::new(params, 20.0, 80.0);
        // 连续下跌使 RSI 为 0，然后大幅反弹
        let closes = [20.0, 19.0, 18.0, 17.0, 16.0, 22.0];
        let ctx = context(candles(&closes), &strategy.requirements());
        let result = strategy.evaluate(&ctx).unwrap();
        assert_eq!(result.signal, SignalLevel::StrongBuy);
        assert!(result.evidence.indicator_snapshot.contains_key("rsi"));

        // 仍在超卖区内不触发
        let closes = [20.0, 19.0, 18.0, 17.0, 16.0, 15.0];
        let ctx = context(candles(&closes), &strategy.requirements());
        assert_eq!(strategy.evaluate(&ctx).unwrap().signal, SignalLevel::Neutral);
    }

    #[test]
    fn test_macd_needs_two_points() {
        let params = MacdParams {
            fast: 2,
            slow: 3,
            signal: 2,
        };
        let strategy = MacdCross::new(params);
        let ctx = context(candles(&[1.0, 2.0, 3.0, 4.0]), &strategy.requirements());
        assert!(matches!(
            strategy.evaluate(&ctx),
            Err(StrategyError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_macd_dead_cross_above_zero_is_strong() {
        let params = MacdParams {
            fast: 2,
            slow: 3,
            signal: 2,
        };
        let strategy = MacdCross::new(params);
        // 加速上涨后回落，MACD 仍在零轴上方
        let closes = [1.0, 4.0, 9.0, 16.0, 25.0, 36.0, 49.0, 30.0];
        let ctx = context(candles(&closes), &strategy.requirements());
        let result = strategy.evaluate(&ctx).unwrap();
        assert_eq!(result.signal, SignalLevel::StrongSell);
    }
}
