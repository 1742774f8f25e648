pub mod num;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// # Summary
/// 交易标的键，唯一确定一条行情流 (标的 + 市场)。
///
/// # Invariants
/// - `instrument` 与 `market` 组合在整个管线内唯一。
/// - 每个键拥有独占的缓冲区与聚合状态，键之间不共享任何可变数据。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstrumentKey {
    // 交易标的代码 (例如: BTCUSDT)
    pub instrument: String,
    // 市场类型 (例如: spot, futures)
    pub market: String,
}

impl InstrumentKey {
    pub fn new(instrument: impl Into<String>, market: impl Into<String>) -> Self {
        Self {
            instrument: instrument.into(),
            market: market.into(),
        }
    }
}

impl std::fmt::Display for InstrumentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.instrument, self.market)
    }
}

/// # Summary
/// 交易时间周期枚举，定义 K 线的时间跨度。
///
/// # Invariants
/// - 所有周期均为一分钟的整数倍，且能整除一天。
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
pub enum TimeFrame {
    // 1分钟
    #[serde(rename = "1m", alias = "minute1")]
    Minute1,
    // 5分钟
    #[serde(rename = "5m", alias = "minute5")]
    Minute5,
    // 15分钟
    #[serde(rename = "15m", alias = "minute15")]
    Minute15,
    // 1小时
    #[serde(rename = "1h", alias = "hour1")]
    Hour1,
    // 1日
    #[serde(rename = "1d", alias = "day1")]
    Day1,
}

impl TimeFrame {
    /// 周期包含的分钟数
    pub const fn minutes(self) -> u32 {
        match self {
            TimeFrame::Minute1 => 1,
            TimeFrame::Minute5 => 5,
            TimeFrame::Minute15 => 15,
            TimeFrame::Hour1 => 60,
            TimeFrame::Day1 => 1_440,
        }
    }

    /// 周期宽度 (毫秒)
    pub fn interval_ms(self) -> i64 {
        i64::from(self.minutes()) * 60_000
    }

    /// # Summary
    /// 计算给定时间戳所属的时间桶起点。
    ///
    /// # Logic
    /// `floor(t / interval) * interval`，使用欧几里得除法保证纪元之前的时间同样向下取整。
    ///
    /// # Arguments
    /// * `open_time_ms`: 一分钟 K 线的开盘毫秒时间戳。
    ///
    /// # Returns
    /// 时间桶起点的毫秒时间戳。
    pub fn bucket_start_ms(self, open_time_ms: i64) -> i64 {
        let interval = self.interval_ms();
        open_time_ms.div_euclid(interval) * interval
    }

    /// # Summary
    /// 计算给定时间所属的时间桶起点。
    ///
    /// # Returns
    /// 时间桶起点；超出 chrono 表示范围时原样返回输入。
    pub fn bucket_start(self, open_time: DateTime<Utc>) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.bucket_start_ms(open_time.timestamp_millis()))
            .unwrap_or(open_time)
    }
}

impl FromStr for TimeFrame {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "1m" | "minute1" => Ok(TimeFrame::Minute1),
            "5m" | "minute5" => Ok(TimeFrame::Minute5),
            "15m" | "minute15" => Ok(TimeFrame::Minute15),
            "1h" | "hour1" => Ok(TimeFrame::Hour1),
            "1d" | "day1" => Ok(TimeFrame::Day1),
            _ => Err(format!("Unknown TimeFrame: {}", s)),
        }
    }
}

impl std::fmt::Display for TimeFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeFrame::Minute1 => write!(f, "1m"),
            TimeFrame::Minute5 => write!(f, "5m"),
            TimeFrame::Minute15 => write!(f, "15m"),
            TimeFrame::Hour1 => write!(f, "1h"),
            TimeFrame::Day1 => write!(f, "1d"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timeframe_round_trip_text() {
        for tf in [
            TimeFrame::Minute1,
            TimeFrame::Minute5,
            TimeFrame::Minute15,
            TimeFrame::Hour1,
            TimeFrame::Day1,
        ] {
            assert_eq!(tf.to_string().parse::<TimeFrame>(), Ok(tf));
        }
        assert!("2w".parse::<TimeFrame>().is_err());
    }

    #[test]
    fn test_bucket_start_fifteen_minutes() {
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 10, 29, 0).unwrap();
        let start = TimeFrame::Minute15.bucket_start(t);
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 3, 1, 10, 15, 0).unwrap());
        assert_eq!(
            TimeFrame::Minute15.bucket_start_ms(t.timestamp_millis()),
            (t.timestamp_millis() / 900_000) * 900_000
        );
    }

    #[test]
    fn test_bucket_start_day_boundary() {
        let before = Utc.with_ymd_and_hms(2023, 12, 31, 23, 59, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(
            TimeFrame::Day1.bucket_start(before),
            Utc.with_ymd_and_hms(2023, 12, 31, 0, 0, 0).unwrap()
        );
        assert_eq!(TimeFrame::Day1.bucket_start(after), after);
        assert_eq!(
            TimeFrame::Minute15.bucket_start(before),
            Utc.with_ymd_and_hms(2023, 12, 31, 23, 45, 0).unwrap()
        );
    }

    #[test]
    fn test_timeframe_serde_names() {
        let json = serde_json::to_string(&TimeFrame::Hour1).unwrap();
        assert_eq!(json, "\"1h\"");
        let tf: TimeFrame = serde_json::from_str("\"minute15\"").unwrap();
        assert_eq!(tf, TimeFrame::Minute15);
    }
}
