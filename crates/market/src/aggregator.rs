use crate::buffer::RollingBuffer;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tenkan_core::common::TimeFrame;
use tenkan_core::market::entity::Candle;
use tracing::warn;

/// # Summary
/// 由一分钟 K 线聚合出的高周期 K 线。
///
/// # Invariants
/// - `candle.open_time` 为时间桶起点，`candle.close_time` 为桶终点前 1 毫秒。
/// - `present <= expected`；`present < expected` 表示桶内存在缺失分钟，桶仍以已有数据收盘。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedCandle {
    pub timeframe: TimeFrame,
    pub candle: Candle,
    // 桶内应有的一分钟 K 线数量
    pub expected: u32,
    // 桶内实际收到的一分钟 K 线数量
    pub present: u32,
}

impl AggregatedCandle {
    pub fn is_complete(&self) -> bool {
        self.present >= self.expected
    }

    pub fn missing(&self) -> u32 {
        self.expected.saturating_sub(self.present)
    }
}

/// 正在形成中的时间桶
#[derive(Debug, Clone, PartialEq)]
struct Bucket {
    start_ms: i64,
    candle: Candle,
    present: u32,
    // 最后并入的一分钟 K 线开盘时间
    last_minute: DateTime<Utc>,
}

/// # Summary
/// 单个高周期的时间桶聚合器。
///
/// # Invariants
/// - 只接收已收盘的一分钟 K 线，按时间升序。
/// - 一个桶只有在出现更晚的桶的一分钟 K 线后才会收盘，与墙钟无关，
///   因此回放与实时运行结果一致。
/// - 已收盘序列独立限容，超出后淘汰最旧的聚合 K 线。
#[derive(Debug, Clone)]
pub struct TimeframeAggregator {
    timeframe: TimeFrame,
    series: RollingBuffer<AggregatedCandle>,
    current: Option<Bucket>,
}

impl TimeframeAggregator {
    pub fn new(timeframe: TimeFrame, capacity: usize) -> Self {
        Self {
            timeframe,
            series: RollingBuffer::new(capacity),
            current: None,
        }
    }

    pub fn timeframe(&self) -> TimeFrame {
        self.timeframe
    }

    /// # Summary
    /// 并入一根已收盘的一分钟 K 线。
    ///
    /// # Logic
    /// 1. 计算 `bucket_start = floor(open_time / interval) * interval`。
    /// 2. 与当前桶相同则折叠进当前桶。
    /// 3. 晚于当前桶则当前桶收盘并写入序列，新 K 线开启新桶。
    /// 4. 早于当前桶或不晚于桶内最后一分钟的 K 线被丢弃并告警。
    ///
    /// # Arguments
    /// * `minute`: 已收盘的一分钟 K 线。
    ///
    /// # Returns
    /// 若本次导致某个桶收盘，返回该聚合 K 线。
    pub fn push_closed(&mut self, minute: &Candle) -> Option<AggregatedCandle> {
        let start_ms = self
            .timeframe
            .bucket_start_ms(minute.open_time.timestamp_millis());

        if let Some(bucket) = self.current.as_mut() {
            if start_ms < bucket.start_ms || minute.open_time <= bucket.last_minute {
                warn!(
                    "Aggregator {} dropping stale minute {}",
                    self.timeframe, minute.open_time
                );
                return None;
            }
            if start_ms == bucket.start_ms {
                fold(bucket, minute);
                return None;
            }
        }

        let completed = self.current.take().map(|b| self.finish(b));
        self.current = Some(open_bucket(self.timeframe, start_ms, minute));
        if let Some(done) = &completed {
            self.series.push(done.clone());
        }
        completed
    }

    /// # Summary
    /// 当前正在形成的桶，用于实时展示；绝不触发策略评估。
    ///
    /// # Logic
    /// 若提供了尚未收盘的一分钟 K 线且它属于当前桶 (或开启了新桶)，一并折叠进去。
    ///
    /// # Arguments
    /// * `live`: 缓冲区尾部尚未收盘的一分钟 K 线。
    pub fn current(&self, live: Option<&Candle>) -> Option<Candle> {
        let mut bucket = self.current.clone();
        if let Some(minute) = live {
            let start_ms = self
                .timeframe
                .bucket_start_ms(minute.open_time.timestamp_millis());
            let opens_new = bucket.as_ref().is_none_or(|b| start_ms > b.start_ms);
            if opens_new {
                bucket = Some(open_bucket(self.timeframe, start_ms, minute));
            } else if let Some(b) = bucket.as_mut() {
                if b.start_ms == start_ms && minute.open_time > b.last_minute {
                    fold(b, minute);
                }
            }
        }
        bucket.map(|b| b.candle)
    }

    /// 已收盘的聚合 K 线，按时间升序
    pub fn closed(&self) -> Vec<AggregatedCandle> {
        self.series.to_vec()
    }

    pub fn closed_candles(&self) -> Vec<Candle> {
        self.series.iter().map(|a| a.candle.clone()).collect()
    }

    pub fn last_closed(&self) -> Option<&AggregatedCandle> {
        self.series.last()
    }

    fn finish(&self, bucket: Bucket) -> AggregatedCandle {
        let aggregated = AggregatedCandle {
            timeframe: self.timeframe,
            candle: bucket.candle,
            expected: self.timeframe.minutes(),
            present: bucket.present,
        };
        if !aggregated.is_complete() {
            warn!(
                "Aggregator {} closing incomplete bucket {} ({} of {} minutes)",
                self.timeframe, aggregated.candle.open_time, aggregated.present, aggregated.expected
            );
        }
        aggregated
    }
}

fn open_bucket(timeframe: TimeFrame, start_ms: i64, minute: &Candle) -> Bucket {
    let open_time = DateTime::from_timestamp_millis(start_ms).unwrap_or(minute.open_time);
    let close_time = DateTime::from_timestamp_millis(start_ms + timeframe.interval_ms() - 1)
        .unwrap_or(minute.close_time);
    Bucket {
        start_ms,
        candle: Candle {
            open_time,
            close_time,
            ..minute.clone()
        },
        present: 1,
        last_minute: minute.open_time,
    }
}

fn fold(bucket: &mut Bucket, minute: &Candle) {
    let c = &mut bucket.candle;
    c.high = c.high.max(minute.high);
    c.low = c.low.min(minute.low);
    c.close = minute.close;
    c.volume += minute.volume;
    c.quote_volume += minute.quote_volume;
    c.trades += minute.trades;
    c.taker_buy_base_volume += minute.taker_buy_base_volume;
    c.taker_buy_quote_volume += minute.taker_buy_quote_volume;
    bucket.present += 1;
    bucket.last_minute = minute.open_time;
}
