use crate::common::InstrumentKey;
use crate::market::error::MarketError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// # Summary
/// 单根 K 线数据实体，记录特定时段内的行情波动。
///
/// # Invariants
/// - `open_time < close_time`。
/// - `low <= open, close <= high`。
/// - `volume >= 0`。
/// - 所在周期窗口闭合后不可变；窗口未闭合时作为序列最后一个元素被原地替换。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candle {
    // K 线开始时间
    pub open_time: DateTime<Utc>,
    // K 线结束时间
    pub close_time: DateTime<Utc>,
    // 开盘价
    pub open: f64,
    // 最高价
    pub high: f64,
    // 最低价
    pub low: f64,
    // 收盘价
    pub close: f64,
    // 成交量 (基础币种)
    pub volume: f64,
    // 成交额 (计价币种)
    pub quote_volume: f64,
    // 成交笔数
    pub trades: u64,
    // 主动买入成交量 (基础币种)
    pub taker_buy_base_volume: f64,
    // 主动买入成交额 (计价币种)
    pub taker_buy_quote_volume: f64,
}

impl Candle {
    /// # Summary
    /// 校验 K 线的数值不变量。
    ///
    /// # Logic
    /// 1. 所有价格与成交量字段必须是有限值。
    /// 2. 开盘时间必须早于收盘时间。
    /// 3. 最低价不高于开盘/收盘价，最高价不低于开盘/收盘价。
    /// 4. 成交量类字段非负。
    ///
    /// # Returns
    /// 合法返回 Ok，否则返回带原因的 `MarketError::InvalidCandle`。
    pub fn validate(&self) -> Result<(), MarketError> {
        let fields = [
            self.open,
            self.high,
            self.low,
            self.close,
            self.volume,
            self.quote_volume,
            self.taker_buy_base_volume,
            self.taker_buy_quote_volume,
        ];
        if fields.iter().any(|v| !v.is_finite()) {
            return Err(self.invalid("non-finite field"));
        }
        if self.open_time >= self.close_time {
            return Err(self.invalid("open_time must precede close_time"));
        }
        if self.low > self.open.min(self.close) || self.high < self.open.max(self.close) {
            return Err(self.invalid("ohlc out of range"));
        }
        if self.volume < 0.0
            || self.quote_volume < 0.0
            || self.taker_buy_base_volume < 0.0
            || self.taker_buy_quote_volume < 0.0
        {
            return Err(self.invalid("negative volume"));
        }
        Ok(())
    }

    /// 典型价格 `(high + low + close) / 3`
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    fn invalid(&self, reason: &str) -> MarketError {
        MarketError::InvalidCandle {
            open_time: self.open_time,
            reason: reason.to_string(),
        }
    }
}

/// # Summary
/// 上游行情源推送的一分钟 K 线事件。
///
/// # Invariants
/// - `is_final = false` 表示盘中更新 (替换缓冲区尾部)。
/// - `is_final = true` 表示该分钟收盘 (追加并触发下游计算)。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandleEvent {
    // 标的与市场
    #[serde(flatten)]
    pub key: InstrumentKey,
    // 是否为收盘数据
    pub is_final: bool,
    // K 线内容
    pub candle: Candle,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Candle {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Candle {
            open_time: t,
            close_time: t + chrono::Duration::milliseconds(59_999),
            open: 100.0,
            high: 110.0,
            low: 95.0,
            close: 105.0,
            volume: 10.0,
            quote_volume: 1_000.0,
            trades: 12,
            taker_buy_base_volume: 4.0,
            taker_buy_quote_volume: 400.0,
        }
    }

    #[test]
    fn test_validate_accepts_well_formed_candle() {
        assert!(sample().validate().is_ok());
        assert!((sample().typical_price() - 103.333_333).abs() < 1e-5);
    }

    #[test]
    fn test_validate_rejects_broken_invariants() {
        let mut c = sample();
        c.low = 101.0;
        assert!(matches!(c.validate(), Err(MarketError::InvalidCandle { .. })));

        let mut c = sample();
        c.high = 104.0;
        assert!(c.validate().is_err());

        let mut c = sample();
        c.volume = -1.0;
        assert!(c.validate().is_err());

        let mut c = sample();
        c.close_time = c.open_time;
        assert!(c.validate().is_err());

        let mut c = sample();
        c.close = f64::NAN;
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_event_json_shape() {
        let event = CandleEvent {
            key: InstrumentKey::new("BTCUSDT", "spot"),
            is_final: true,
            candle: sample(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["instrument"], "BTCUSDT");
        assert_eq!(json["market"], "spot");
        assert_eq!(json["isFinal"], true);
        assert_eq!(json["candle"]["takerBuyBaseVolume"], 4.0);
        let back: CandleEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}
