use std::collections::BTreeMap;
use std::sync::Arc;
use tenkan_core::common::{InstrumentKey, TimeFrame};
use tenkan_core::config::PipelineConfig;
use tenkan_core::market::entity::CandleEvent;
use tenkan_core::market::port::CandleRepository;
use tenkan_core::signal::entity::ErrorReport;
use tenkan_core::signal::port::{ErrorSink, SignalSink};
use tenkan_core::strategy::entity::{MultiStrategyResult, TimeframeSummary};
use tenkan_engine::{EvaluationRequest, StrategyEngine};
use tenkan_market::series::{ClosedCandle, InstrumentSeries};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// # Summary
/// 所有工作协程共享的只读依赖。
pub(crate) struct WorkerDeps {
    pub config: PipelineConfig,
    pub engine: Arc<StrategyEngine>,
    pub repository: Option<Arc<dyn CandleRepository>>,
    pub signals: Arc<dyn SignalSink>,
    pub errors: Arc<dyn ErrorSink>,
}

/// # Summary
/// 单个工作协程退出时的处理统计。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    // 回填接受的一分钟 K 线数量
    pub seeded: usize,
    // 处理的事件数量
    pub events: usize,
    // 被拒绝的事件数量 (非法或乱序)
    pub rejected: usize,
    // 发布的综合结果数量
    pub published: usize,
}

/// # Summary
/// 单个键的工作者，独占该键的行情状态。
///
/// # Invariants
/// - 事件严格按入队顺序逐条处理，同一键的评估不会并发 (单飞)。
/// - 结果按触发 K 线的收盘顺序发布。
pub(crate) struct Worker {
    series: InstrumentSeries,
    deps: Arc<WorkerDeps>,
    // 各评估周期最近一次的信号汇总
    summaries: BTreeMap<TimeFrame, TimeframeSummary>,
    stats: WorkerStats,
}

impl Worker {
    pub fn new(key: InstrumentKey, deps: Arc<WorkerDeps>) -> Self {
        Self {
            series: InstrumentSeries::new(key, &deps.config),
            deps,
            summaries: BTreeMap::new(),
            stats: WorkerStats::default(),
        }
    }

    /// # Summary
    /// 工作协程主循环。
    ///
    /// # Logic
    /// 1. 冷启动回填 (不触发评估)。
    /// 2. 逐条处理队列中的事件，直到发送端全部关闭且队列排空。
    pub async fn run(mut self, mut rx: mpsc::Receiver<CandleEvent>) -> WorkerStats {
        let key = self.series.key().clone();
        info!("Worker for {} started", key);
        self.warm_start().await;
        while let Some(event) = rx.recv().await {
            self.handle(&event).await;
        }
        info!(
            "Worker for {} drained: {} events, {} rejected, {} published",
            key, self.stats.events, self.stats.rejected, self.stats.published
        );
        self.stats
    }

    /// # Summary
    /// 从仓库回填最近的一分钟 K 线。
    ///
    /// # Logic
    /// 仓库未配置或 `warm_start_limit = 0` 时跳过；仓库失败只记录告警，以空状态继续。
    async fn warm_start(&mut self) {
        let limit = self.deps.config.warm_start_limit;
        let Some(repository) = self.deps.repository.as_ref() else {
            return;
        };
        if limit == 0 {
            return;
        }
        match repository.find_latest(self.series.key(), limit).await {
            Ok(history) => {
                let seeded = self.series.seed(&history);
                self.stats.seeded = seeded;
                info!(
                    "Warm start for {}: seeded {} of {} candles",
                    self.series.key(),
                    seeded,
                    history.len()
                );
            }
            Err(e) => warn!("Warm start for {} failed: {}", self.series.key(), e),
        }
    }

    /// # Summary
    /// 处理一条事件：更新行情状态，对每个收盘的评估周期执行一次评估。
    ///
    /// # Logic
    /// 1. 非法或乱序事件被拒绝并告警，状态保持不变。
    /// 2. 收盘通知按 (开盘时间, 周期) 升序逐个评估并发布。
    async fn handle(&mut self, event: &CandleEvent) {
        self.stats.events += 1;
        let closed = match self.series.apply(event) {
            Ok(closed) => closed,
            Err(e) => {
                self.stats.rejected += 1;
                warn!("Rejected event for {}: {}", event.key, e);
                return;
            }
        };

        for notification in closed {
            if self
                .deps
                .config
                .evaluated_timeframes
                .contains(&notification.timeframe)
            {
                self.evaluate(notification).await;
            }
        }
    }

    async fn evaluate(&mut self, closed: ClosedCandle) {
        let key = self.series.key().clone();
        let timeframe = closed.timeframe;
        let timestamp = closed.candle.open_time;

        let mut notes = Vec::new();
        if !closed.is_complete() {
            warn!(
                "Incomplete {} bucket for {} at {}: {} minutes missing",
                timeframe, key, timestamp, closed.missing
            );
            notes.push(format!(
                "incomplete {} bucket: {} minutes missing",
                timeframe, closed.missing
            ));
        }

        let evaluation = self
            .deps
            .engine
            .evaluate(EvaluationRequest {
                key: key.clone(),
                timeframe,
                timestamp,
                candles: self.series.closed_series_until(timeframe, timestamp),
                notes,
            })
            .await;

        let mut result = evaluation.result;
        self.remember(&mut result);
        self.publish(&result).await;

        if let Some(reason) = evaluation.error {
            let report = ErrorReport {
                instrument: key,
                timeframe,
                error: reason,
                timestamp,
            };
            if let Err(e) = self.deps.errors.report(&report).await {
                error!(
                    "Failed to report error for {} {}: {}",
                    report.instrument, timeframe, e
                );
            }
        }
    }

    /// 记录本周期的最新汇总，并把其它周期最近的汇总合并进结果
    fn remember(&mut self, result: &mut MultiStrategyResult) {
        if let Some(fresh) = result.per_timeframe_summary.get(&result.timeframe) {
            self.summaries.insert(result.timeframe, *fresh);
        }
        result.per_timeframe_summary = self.summaries.clone();
    }

    async fn publish(&mut self, result: &MultiStrategyResult) {
        match self.deps.signals.publish(result).await {
            Ok(()) => {
                self.stats.published += 1;
                debug!(
                    "Published {} {} at {}: {}",
                    result.instrument, result.timeframe, result.timestamp, result.overall_signal
                );
            }
            Err(e) => error!(
                "Failed to publish {} {} at {}: {}",
                result.instrument, result.timeframe, result.timestamp, e
            ),
        }
    }
}
