use crate::common::InstrumentKey;
use crate::market::entity::{Candle, CandleEvent};
use crate::market::error::MarketError;
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

/// # Summary
/// 行情事件流别名，使用动态分发的异步流。
pub type CandleEventStream = Pin<Box<dyn Stream<Item = CandleEvent> + Send>>;

/// # Summary
/// 一分钟 K 线行情源接口 (外部协作方)。
///
/// # Invariants
/// - 同一键的事件必须按时间顺序产出；乱序事件会被管线拒绝。
/// - 同一分钟在收盘前可能被重复推送多次。
#[async_trait]
pub trait MarketDataFeed: Send + Sync {
    /// # Summary
    /// 订阅实时 K 线事件流。
    ///
    /// # Logic
    /// 1. 建立长连接或开启内部轮询。
    /// 2. 持续产出 `CandleEvent`，流结束代表行情源关闭。
    ///
    /// # Returns
    /// 成功返回异步事件流。
    async fn subscribe(&self) -> Result<CandleEventStream, MarketError>;
}

/// # Summary
/// K 线仓库接口，用于冷启动时回填缓冲区。
///
/// # Invariants
/// - 返回结果按 `open_time` 升序排列。
/// - 存储结构由实现方负责，核心不关心。
#[async_trait]
pub trait CandleRepository: Send + Sync {
    /// # Summary
    /// 读取指定键最近的若干根一分钟 K 线。
    ///
    /// # Arguments
    /// * `key`: 标的与市场。
    /// * `limit`: 数量上限。
    ///
    /// # Returns
    /// 升序排列的 K 线列表，失败返回 `MarketError::Repository`。
    async fn find_latest(
        &self,
        key: &InstrumentKey,
        limit: usize,
    ) -> Result<Vec<Candle>, MarketError>;
}
