use crate::aggregator::{AggregatedCandle, TimeframeAggregator};
use crate::buffer::{BufferAction, CandleBuffer};
use std::collections::BTreeMap;
use tenkan_core::common::{InstrumentKey, TimeFrame};
use tenkan_core::config::PipelineConfig;
use tenkan_core::market::entity::{Candle, CandleEvent};
use tenkan_core::market::error::MarketError;
use tracing::{debug, warn};

/// # Summary
/// 一次收盘通知：某个周期上有一根 K 线刚刚变为不可变。
#[derive(Debug, Clone, PartialEq)]
pub struct ClosedCandle {
    pub timeframe: TimeFrame,
    pub candle: Candle,
    // 桶内缺失的一分钟数量，一分钟周期恒为 0
    pub missing: u32,
}

impl ClosedCandle {
    pub fn is_complete(&self) -> bool {
        self.missing == 0
    }

    fn from_aggregated(aggregated: AggregatedCandle) -> Self {
        Self {
            timeframe: aggregated.timeframe,
            missing: aggregated.missing(),
            candle: aggregated.candle,
        }
    }
}

/// # Summary
/// 单个键的全部行情状态：一分钟缓冲区与各高周期聚合器。
///
/// # Invariants
/// - 由该键的工作协程独占持有，不与其他键共享。
/// - 高周期只从已收盘的一分钟 K 线派生。
#[derive(Debug, Clone)]
pub struct InstrumentSeries {
    key: InstrumentKey,
    minute: CandleBuffer,
    aggregators: BTreeMap<TimeFrame, TimeframeAggregator>,
    // 上一根已收盘一分钟 K 线的开盘时间，用于缺口检测
    last_closed_minute: Option<Candle>,
}

impl InstrumentSeries {
    /// # Summary
    /// 按管线配置创建键状态。
    ///
    /// # Arguments
    /// * `key`: 标的与市场。
    /// * `config`: 已规整的管线配置。
    pub fn new(key: InstrumentKey, config: &PipelineConfig) -> Self {
        let aggregators = config
            .aggregated_timeframes
            .iter()
            .filter(|tf| **tf != TimeFrame::Minute1)
            .map(|tf| (*tf, TimeframeAggregator::new(*tf, config.aggregated_capacity)))
            .collect();
        Self {
            key,
            minute: CandleBuffer::new(config.buffer_capacity),
            aggregators,
            last_closed_minute: None,
        }
    }

    pub fn key(&self) -> &InstrumentKey {
        &self.key
    }

    /// # Summary
    /// 应用一条行情事件。
    ///
    /// # Logic
    /// 1. 更新一分钟缓冲区 (非法/乱序事件被拒绝，状态不变)。
    /// 2. 对每根新收盘的一分钟 K 线，先产出一分钟收盘通知，
    ///    再依次推入各高周期聚合器，收集因此收盘的高周期 K 线。
    ///
    /// # Arguments
    /// * `event`: 行情事件，其键必须与本状态的键一致。
    ///
    /// # Returns
    /// 按周期从小到大排列的收盘通知列表；无收盘时为空。
    pub fn apply(&mut self, event: &CandleEvent) -> Result<Vec<ClosedCandle>, MarketError> {
        let update = self.minute.update(event.candle.clone(), event.is_final)?;
        if update.action == BufferAction::Ignored {
            return Ok(Vec::new());
        }

        let mut notifications = Vec::new();
        for minute in update.closed {
            self.check_gap(&minute);
            for aggregator in self.aggregators.values_mut() {
                if let Some(done) = aggregator.push_closed(&minute) {
                    notifications.push(ClosedCandle::from_aggregated(done));
                }
            }
            notifications.push(ClosedCandle {
                timeframe: TimeFrame::Minute1,
                candle: minute.clone(),
                missing: 0,
            });
            self.last_closed_minute = Some(minute);
        }
        notifications.sort_by_key(|n| (n.candle.open_time, n.timeframe));
        Ok(notifications)
    }

    /// # Summary
    /// 用仓库中的历史一分钟 K 线回填状态，不产生任何收盘通知。
    ///
    /// # Logic
    /// 逐根作为收盘事件应用；非法或与现有状态重叠的 K 线被跳过。
    ///
    /// # Returns
    /// 实际被接受的 K 线数量。
    pub fn seed(&mut self, history: &[Candle]) -> usize {
        let mut accepted = 0;
        for candle in history {
            let event = CandleEvent {
                key: self.key.clone(),
                is_final: true,
                candle: candle.clone(),
            };
            match self.apply(&event) {
                Ok(closed) if !closed.is_empty() => accepted += 1,
                Ok(_) => {}
                Err(e) => debug!("Skipping seed candle for {}: {}", self.key, e),
            }
        }
        accepted
    }

    /// # Summary
    /// 指定周期已收盘的 K 线序列 (按时间升序)，交给指标与策略只读使用。
    pub fn closed_series(&self, timeframe: TimeFrame) -> Vec<Candle> {
        match timeframe {
            TimeFrame::Minute1 => self.minute.closed_candles(),
            tf => self
                .aggregators
                .get(&tf)
                .map(|a| a.closed_candles())
                .unwrap_or_default(),
        }
    }

    /// # Summary
    /// 截至某根触发 K 线 (含) 的已收盘序列。
    ///
    /// # Invariants
    /// - 同一次更新中先后收盘的多根 K 线，各自只能看到自己及更早的数据。
    pub fn closed_series_until(
        &self,
        timeframe: TimeFrame,
        until: chrono::DateTime<chrono::Utc>,
    ) -> Vec<Candle> {
        let mut candles = self.closed_series(timeframe);
        candles.retain(|c| c.open_time <= until);
        candles
    }

    /// # Summary
    /// 指定周期当前正在形成的 K 线 (仅供展示)。
    pub fn current(&self, timeframe: TimeFrame) -> Option<Candle> {
        match timeframe {
            TimeFrame::Minute1 => self.minute.live().cloned(),
            tf => self
                .aggregators
                .get(&tf)
                .and_then(|a| a.current(self.minute.live())),
        }
    }

    /// 最后一根已收盘的一分钟 K 线开盘时间
    pub fn last_closed_time(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.last_closed_minute.as_ref().map(|c| c.open_time)
    }

    pub fn timeframes(&self) -> impl Iterator<Item = TimeFrame> + '_ {
        std::iter::once(TimeFrame::Minute1).chain(self.aggregators.keys().copied())
    }

    fn check_gap(&self, minute: &Candle) {
        if let Some(prev) = &self.last_closed_minute {
            let gap = minute.open_time - prev.open_time;
            if gap > chrono::Duration::minutes(1) {
                warn!(
                    "Gap in {} one-minute feed: {} -> {} ({} minutes)",
                    self.key,
                    prev.open_time,
                    minute.open_time,
                    gap.num_minutes()
                );
            }
        }
    }
}
