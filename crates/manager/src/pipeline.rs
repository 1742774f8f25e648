use crate::worker::{Worker, WorkerDeps, WorkerStats};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::StreamExt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tenkan_core::common::InstrumentKey;
use tenkan_core::config::PipelineConfig;
use tenkan_core::market::entity::CandleEvent;
use tenkan_core::market::error::MarketError;
use tenkan_core::market::port::{CandleRepository, MarketDataFeed};
use tenkan_core::signal::error::SinkError;
use tenkan_core::signal::port::{ErrorSink, SignalSink};
use tenkan_engine::StrategyEngine;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// # Summary
/// 管线层的统一错误类型。
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Market error: {0}")]
    Market(#[from] MarketError),
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),
    // 管线已关闭，不再接受新事件
    #[error("Pipeline is shutting down")]
    Shutdown,
}

/// 运行中的工作协程句柄
struct WorkerHandle {
    tx: mpsc::Sender<CandleEvent>,
    join: JoinHandle<WorkerStats>,
}

/// # Summary
/// 管线协调器：按键把行情事件路由给独占状态的工作协程。
/// 编译期仅依赖 `tenkan-core` 中的端口定义，接收方与仓库通过构造函数注入。
///
/// # Invariants
/// - 每个键恰好一个工作协程，首次见到该键时惰性创建。
/// - 同一键的事件按提交顺序处理；不同键之间完全并行。
/// - `shutdown` 之后的提交返回 `PipelineError::Shutdown`。
pub struct PipelineCoordinator {
    deps: Arc<WorkerDeps>,
    workers: DashMap<InstrumentKey, WorkerHandle>,
    closed: AtomicBool,
}

impl PipelineCoordinator {
    /// # Summary
    /// 创建协调器。
    ///
    /// # Arguments
    /// * `config`: 管线配置，内部会先做规整。
    /// * `engine`: 策略执行器。
    /// * `repository`: 可选的冷启动 K 线仓库。
    /// * `signals`: 综合结果接收方。
    /// * `errors`: 错误通道。
    ///
    /// # Returns
    /// 可共享的协调器实例。
    pub fn new(
        config: PipelineConfig,
        engine: Arc<StrategyEngine>,
        repository: Option<Arc<dyn CandleRepository>>,
        signals: Arc<dyn SignalSink>,
        errors: Arc<dyn ErrorSink>,
    ) -> Arc<Self> {
        Arc::new(Self {
            deps: Arc::new(WorkerDeps {
                config: config.normalized(),
                engine,
                repository,
                signals,
                errors,
            }),
            workers: DashMap::new(),
            closed: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.deps.config
    }

    /// 当前活跃的键数量
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// # Summary
    /// 提交一条行情事件。
    ///
    /// # Logic
    /// 1. 查找或创建该键的工作协程；创建前在分片锁内再次检查关闭标志，
    ///    保证 `shutdown` 开始后不会再出现未被等待的新工作协程。
    /// 2. 释放 Map 守卫后再等待队列空位，队列满时对上游形成背压。
    ///
    /// # Returns
    /// 管线已关闭时返回 `PipelineError::Shutdown`。
    pub async fn submit(&self, event: CandleEvent) -> Result<(), PipelineError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(PipelineError::Shutdown);
        }
        let tx = match self.workers.entry(event.key.clone()) {
            Entry::Occupied(entry) => entry.get().tx.clone(),
            Entry::Vacant(entry) => {
                if self.closed.load(Ordering::Acquire) {
                    return Err(PipelineError::Shutdown);
                }
                entry.insert(self.spawn_worker(event.key.clone())).tx.clone()
            }
        };
        tx.send(event).await.map_err(|_| PipelineError::Shutdown)
    }

    /// # Summary
    /// 订阅行情源并持续提交事件，直到流结束。
    ///
    /// # Returns
    /// 提交的事件数量。
    pub async fn run(&self, feed: &dyn MarketDataFeed) -> Result<usize, PipelineError> {
        let mut stream = feed.subscribe().await?;
        let mut submitted = 0;
        while let Some(event) = stream.next().await {
            self.submit(event).await?;
            submitted += 1;
        }
        info!("Feed ended after {} events", submitted);
        Ok(submitted)
    }

    /// # Summary
    /// 优雅关闭。
    ///
    /// # Logic
    /// 1. 拒绝后续提交。
    /// 2. 逐个摘下工作协程并关闭其队列，等待其处理完已入队的事件后退出，直到表为空。
    ///
    /// # Returns
    /// 所有工作协程的统计之和。
    pub async fn shutdown(&self) -> WorkerStats {
        self.closed.store(true, Ordering::Release);

        let mut total = WorkerStats::default();
        loop {
            // 守卫必须在 remove 之前释放
            let next = self.workers.iter().next().map(|e| e.key().clone());
            let Some(key) = next else {
                break;
            };
            let Some((_, handle)) = self.workers.remove(&key) else {
                continue;
            };
            drop(handle.tx);
            match handle.join.await {
                Ok(stats) => {
                    total.seeded += stats.seeded;
                    total.events += stats.events;
                    total.rejected += stats.rejected;
                    total.published += stats.published;
                }
                Err(e) => error!("Worker for {} terminated abnormally: {}", key, e),
            }
        }
        info!(
            "Pipeline shut down: {} events, {} published",
            total.events, total.published
        );
        total
    }

    fn spawn_worker(&self, key: InstrumentKey) -> WorkerHandle {
        let (tx, rx) = mpsc::channel(self.deps.config.queue_depth);
        let worker = Worker::new(key, Arc::clone(&self.deps));
        WorkerHandle {
            tx,
            join: tokio::spawn(worker.run(rx)),
        }
    }
}
