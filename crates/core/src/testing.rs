//! 测试辅助实现：内存仓库、收集型接收方、静态行情源与 K 线构造函数。

use crate::common::InstrumentKey;
use crate::market::entity::{Candle, CandleEvent};
use crate::market::error::MarketError;
use crate::market::port::{CandleEventStream, CandleRepository, MarketDataFeed};
use crate::signal::entity::ErrorReport;
use crate::signal::error::SinkError;
use crate::signal::port::{ErrorSink, SignalSink};
use crate::strategy::entity::MultiStrategyResult;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;

/// # Summary
/// 构造一根一分钟 K 线，成交额等字段按收盘价推算。
pub fn minute_candle(
    open_time: DateTime<Utc>,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
) -> Candle {
    Candle {
        open_time,
        close_time: open_time + Duration::milliseconds(59_999),
        open,
        high,
        low,
        close,
        volume,
        quote_volume: volume * close,
        trades: 1,
        taker_buy_base_volume: volume / 2.0,
        taker_buy_quote_volume: volume * close / 2.0,
    }
}

/// # Summary
/// 按收盘价序列构造连续的一分钟 K 线。
///
/// # Logic
/// 每根 K 线的开盘价为上一根的收盘价 (第一根等于自身收盘价)，高低价包住开收盘。
pub fn candles_from_closes(start: DateTime<Utc>, closes: &[f64], volume: f64) -> Vec<Candle> {
    let mut prev = closes.first().copied().unwrap_or_default();
    closes
        .iter()
        .zip(0i64..)
        .map(|(&close, i)| {
            let open = prev;
            prev = close;
            minute_candle(
                start + Duration::minutes(i),
                open,
                open.max(close),
                open.min(close),
                close,
                volume,
            )
        })
        .collect()
}

/// # Summary
/// 收盘价从 `from` 线性变化到 `to` 的 `n` 根一分钟 K 线。
pub fn linear_candles(start: DateTime<Utc>, n: usize, from: f64, to: f64) -> Vec<Candle> {
    let steps = crate::common::num::count_to_f64(n.saturating_sub(1).max(1));
    let closes: Vec<f64> = (0..n)
        .map(|i| from + (to - from) * crate::common::num::count_to_f64(i) / steps)
        .collect();
    candles_from_closes(start, &closes, 100.0)
}

/// 将 K 线包装为收盘事件
pub fn final_events(key: &InstrumentKey, candles: &[Candle]) -> Vec<CandleEvent> {
    candles
        .iter()
        .map(|c| CandleEvent {
            key: key.clone(),
            is_final: true,
            candle: c.clone(),
        })
        .collect()
}

/// # Summary
/// 基于 DashMap 的内存 K 线仓库。
#[derive(Default)]
pub struct InMemoryCandleRepository {
    db: DashMap<InstrumentKey, Vec<Candle>>,
}

impl InMemoryCandleRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: &InstrumentKey, candles: &[Candle]) {
        let mut entry = self.db.entry(key.clone()).or_default();
        entry.extend_from_slice(candles);
        entry.sort_by_key(|c| c.open_time);
    }
}

#[async_trait]
impl CandleRepository for InMemoryCandleRepository {
    async fn find_latest(
        &self,
        key: &InstrumentKey,
        limit: usize,
    ) -> Result<Vec<Candle>, MarketError> {
        let candles = self.db.get(key).map(|v| v.clone()).unwrap_or_default();
        let skip = candles.len().saturating_sub(limit);
        Ok(candles.into_iter().skip(skip).collect())
    }
}

/// # Summary
/// 收集所有发布结果与错误报告的接收方。
#[derive(Default)]
pub struct CollectingSink {
    results: Mutex<Vec<MultiStrategyResult>>,
    errors: Mutex<Vec<ErrorReport>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn results(&self) -> Vec<MultiStrategyResult> {
        self.results.lock().await.clone()
    }

    pub async fn errors(&self) -> Vec<ErrorReport> {
        self.errors.lock().await.clone()
    }
}

#[async_trait]
impl SignalSink for CollectingSink {
    async fn publish(&self, result: &MultiStrategyResult) -> Result<(), SinkError> {
        self.results.lock().await.push(result.clone());
        Ok(())
    }
}

#[async_trait]
impl ErrorSink for CollectingSink {
    async fn report(&self, report: &ErrorReport) -> Result<(), SinkError> {
        self.errors.lock().await.push(report.clone());
        Ok(())
    }
}

/// # Summary
/// 按顺序回放预设事件的行情源，流在事件耗尽后结束。
pub struct StaticFeed {
    events: Vec<CandleEvent>,
}

impl StaticFeed {
    pub fn new(events: Vec<CandleEvent>) -> Self {
        Self { events }
    }
}

#[async_trait]
impl MarketDataFeed for StaticFeed {
    async fn subscribe(&self) -> Result<CandleEventStream, MarketError> {
        let events = self.events.clone();
        let stream = async_stream::stream! {
            for event in events {
                yield event;
            }
        };
        Ok(Box::pin(stream))
    }
}
