use crate::reducer::reduce;
use crate::registry::StrategyRegistry;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use tenkan_core::common::{InstrumentKey, TimeFrame};
use tenkan_core::indicator::entity::IndicatorSpec;
use tenkan_core::market::entity::Candle;
use tenkan_core::strategy::entity::{
    EvaluationState, Evidence, MultiStrategyResult, SignalLevel, StrategyResult, TimeframeSummary,
};
use tenkan_core::strategy::error::StrategyError;
use tenkan_core::strategy::port::StrategyContext;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// # Summary
/// 一次评估触发的输入。
#[derive(Debug, Clone)]
pub struct EvaluationRequest {
    pub key: InstrumentKey,
    pub timeframe: TimeFrame,
    // 触发 K 线的开盘时间，即结果时间戳
    pub timestamp: DateTime<Utc>,
    // 该周期已收盘的 K 线，最后一根为触发 K 线
    pub candles: Vec<Candle>,
    // 评估级别的附加说明 (如缺口标记)
    pub notes: Vec<String>,
}

/// # Summary
/// 评估输出：终态与必定存在的综合结果。
///
/// # Invariants
/// - `state` 只可能是 `Published` 或 `Failed`。
/// - `error` 非空时需要同时投递到错误通道。
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub state: EvaluationState,
    pub result: MultiStrategyResult,
    pub error: Option<String>,
}

/// # Summary
/// 策略执行器：计算指标集，并发运行全部策略，再归约为综合信号。
///
/// # Invariants
/// - 单个策略的错误或 panic 只会把该策略降级为被跳过的 `NEUTRAL`。
/// - 结果中的策略顺序与注册表顺序一致，与完成先后无关。
/// - 所有键共享同一个执行器时，同时运行的策略数不超过注册的策略数。
pub struct StrategyEngine {
    registry: StrategyRegistry,
    // 每次触发计算的指标参数化 (配置项与策略依赖的并集)
    specs: Vec<IndicatorSpec>,
    // 策略执行池的许可，容量等于策略数量
    pool: Arc<Semaphore>,
}

impl StrategyEngine {
    /// # Summary
    /// 创建执行器。
    ///
    /// # Arguments
    /// * `registry`: 策略注册表。
    /// * `configured`: 配置中要求的指标参数化。
    pub fn new(registry: StrategyRegistry, configured: &[IndicatorSpec]) -> Self {
        let specs = registry.indicator_specs(configured);
        let pool = Arc::new(Semaphore::new(registry.len().max(1)));
        Self {
            registry,
            specs,
            pool,
        }
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    pub fn indicator_specs(&self) -> &[IndicatorSpec] {
        &self.specs
    }

    /// 执行池容量
    pub fn pool_size(&self) -> usize {
        self.registry.len().max(1)
    }

    /// # Summary
    /// 执行一次评估。
    ///
    /// # Logic
    /// 1. `IDLE -> EVALUATING`：在触发 K 线序列上计算完整指标集。
    /// 2. 序列为空或全部指标失败时进入 `FAILED`，仍产出 `NEUTRAL`、零共识的结果。
    /// 3. 否则每个策略在阻塞线程池中并发执行，按注册顺序汇合结果。
    /// 4. 归约后进入 `PUBLISHED`；若所有策略都被跳过，附带错误说明。
    ///
    /// # Arguments
    /// * `request`: 评估输入。
    ///
    /// # Returns
    /// 必定包含一个综合结果的评估输出。
    pub async fn evaluate(&self, request: EvaluationRequest) -> Evaluation {
        let mut state = EvaluationState::Idle;
        transition(&mut state, EvaluationState::Evaluating);

        let EvaluationRequest {
            key,
            timeframe,
            timestamp,
            candles,
            mut notes,
        } = request;

        let indicators = tenkan_indicator::compute_set(&self.specs, &candles);
        if candles.is_empty() || indicators.all_failed() {
            let reason = format!(
                "indicator computation failed for {} {}: {} candles available",
                key,
                timeframe,
                candles.len()
            );
            warn!("{}", reason);
            transition(&mut state, EvaluationState::Failed);
            notes.push(reason.clone());
            return Evaluation {
                state,
                result: neutral_result(key, timeframe, timestamp, Vec::new(), notes),
                error: Some(reason),
            };
        }

        let ctx = Arc::new(StrategyContext {
            key: key.clone(),
            timeframe,
            candles,
            indicators,
        });
        let strategy_results = self.run_strategies(&ctx).await;

        let reduction = reduce(&strategy_results);
        let error = if reduction.counted == 0 {
            let reason = format!("all strategies skipped for {} {}", key, timeframe);
            warn!("{}", reason);
            notes.push(reason.clone());
            Some(reason)
        } else {
            None
        };

        let mut per_timeframe_summary = BTreeMap::new();
        per_timeframe_summary.insert(timeframe, reduction.summary());
        transition(&mut state, EvaluationState::Published);
        debug!(
            "Evaluated {} {} at {}: {} (consensus {:.2})",
            key, timeframe, timestamp, reduction.signal, reduction.consensus
        );

        Evaluation {
            state,
            result: MultiStrategyResult {
                instrument: key,
                timeframe,
                timestamp,
                strategy_results,
                overall_signal: reduction.signal,
                consensus: reduction.consensus,
                per_timeframe_summary,
                notes,
            },
            error,
        }
    }

    /// # Summary
    /// 并发运行全部策略，按注册顺序返回结果。
    ///
    /// # Logic
    /// 每个策略先取得执行池许可，再进入阻塞线程池；许可随阻塞任务结束释放。
    async fn run_strategies(&self, ctx: &Arc<StrategyContext>) -> Vec<StrategyResult> {
        let tasks = self.registry.strategies().iter().map(|strategy| {
            let strategy = Arc::clone(strategy);
            let ctx = Arc::clone(ctx);
            let pool = Arc::clone(&self.pool);
            async move {
                let permit = pool
                    .acquire_owned()
                    .await
                    .map_err(|e| StrategyError::Execution(e.to_string()))?;
                tokio::task::spawn_blocking(move || {
                    let _permit = permit;
                    strategy.evaluate(&ctx)
                })
                .await
                .map_err(|e| StrategyError::Execution(format!("panicked: {}", e)))?
            }
        });
        let outcomes = join_all(tasks).await;

        self.registry
            .strategies()
            .iter()
            .zip(outcomes)
            .map(|(strategy, outcome)| match outcome {
                Ok(result) => result,
                Err(e) => {
                    match &e {
                        StrategyError::InsufficientData(_) => {
                            debug!("Strategy {} skipped: {}", strategy.id(), e)
                        }
                        StrategyError::Execution(_) => {
                            warn!("Strategy {} failed: {}", strategy.id(), e)
                        }
                    }
                    skipped(ctx, strategy.id(), e.to_string())
                }
            })
            .collect()
    }
}

fn transition(state: &mut EvaluationState, next: EvaluationState) {
    if !state.can_transition(next) {
        warn!("Unexpected evaluation transition {:?} -> {:?}", state, next);
    }
    *state = next;
}

/// 被跳过的策略：零权重 `NEUTRAL`，错误记录在证据中
fn skipped(ctx: &StrategyContext, strategy_id: &str, error: String) -> StrategyResult {
    let evidence = Evidence {
        error: Some(error),
        ..Evidence::default()
    };
    ctx.result(strategy_id, SignalLevel::Neutral, evidence)
}

fn neutral_result(
    instrument: InstrumentKey,
    timeframe: TimeFrame,
    timestamp: DateTime<Utc>,
    strategy_results: Vec<StrategyResult>,
    notes: Vec<String>,
) -> MultiStrategyResult {
    let mut per_timeframe_summary = BTreeMap::new();
    per_timeframe_summary.insert(
        timeframe,
        TimeframeSummary {
            signal: SignalLevel::Neutral,
            strategy_count: 0,
        },
    );
    MultiStrategyResult {
        instrument,
        timeframe,
        timestamp,
        strategy_results,
        overall_signal: SignalLevel::Neutral,
        consensus: 0.0,
        per_timeframe_summary,
        notes,
    }
}
