use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tenkan_core::common::{InstrumentKey, TimeFrame};
use tenkan_core::config::AppConfig;
use tenkan_core::indicator::entity::IndicatorSpec;
use tenkan_core::market::entity::Candle;
use tenkan_core::strategy::entity::{EvaluationState, Evidence, SignalLevel, StrategyResult};
use tenkan_core::strategy::error::StrategyError;
use tenkan_core::strategy::port::{Strategy, StrategyContext};
use tenkan_core::testing::linear_candles;
use tenkan_engine::strategies::MaBreakout;
use tenkan_engine::{EvaluationRequest, StrategyEngine, StrategyRegistry};

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

fn key() -> InstrumentKey {
    InstrumentKey::new("BTCUSDT", "spot")
}

fn request(candles: Vec<Candle>) -> EvaluationRequest {
    let timestamp = candles.last().map(|c| c.open_time).unwrap_or_else(start);
    EvaluationRequest {
        key: key(),
        timeframe: TimeFrame::Minute1,
        timestamp,
        candles,
        notes: Vec::new(),
    }
}

/// 固定返回给定信号
struct Fixed(&'static str, SignalLevel);

impl Strategy for Fixed {
    fn id(&self) -> &str {
        self.0
    }
    fn requirements(&self) -> Vec<IndicatorSpec> {
        vec![IndicatorSpec::Sma { period: 2 }]
    }
    fn evaluate(&self, ctx: &StrategyContext) -> Result<StrategyResult, StrategyError> {
        Ok(ctx.result(self.0, self.1, Evidence::default()))
    }
}

struct Failing;

impl Strategy for Failing {
    fn id(&self) -> &str {
        "failing"
    }
    fn requirements(&self) -> Vec<IndicatorSpec> {
        Vec::new()
    }
    fn evaluate(&self, _: &StrategyContext) -> Result<StrategyResult, StrategyError> {
        Err(StrategyError::Execution("division by zero".to_string()))
    }
}

struct Panicking;

impl Strategy for Panicking {
    fn id(&self) -> &str {
        "panicking"
    }
    fn requirements(&self) -> Vec<IndicatorSpec> {
        Vec::new()
    }
    #[allow(clippy::panic)]
    fn evaluate(&self, _: &StrategyContext) -> Result<StrategyResult, StrategyError> {
        panic!("strategy exploded")
    }
}

/// 记录同时运行的策略数量峰值
struct Gauge {
    id: &'static str,
    running: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl Strategy for Gauge {
    fn id(&self) -> &str {
        self.id
    }
    fn requirements(&self) -> Vec<IndicatorSpec> {
        Vec::new()
    }
    fn evaluate(&self, ctx: &StrategyContext) -> Result<StrategyResult, StrategyError> {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(20));
        self.running.fetch_sub(1, Ordering::SeqCst);
        Ok(ctx.result(self.id, SignalLevel::Neutral, Evidence::default()))
    }
}

fn registry(strategies: Vec<Arc<dyn Strategy>>) -> StrategyRegistry {
    let mut registry = StrategyRegistry::new();
    for strategy in strategies {
        registry.register(strategy);
    }
    registry
}

#[tokio::test]
async fn test_failures_are_isolated_and_order_is_stable() -> Result<()> {
    let engine = StrategyEngine::new(
        registry(vec![
            Arc::new(Panicking),
            Arc::new(Fixed("buy", SignalLevel::Buy)),
            Arc::new(Failing),
            Arc::new(Fixed("strong", SignalLevel::StrongBuy)),
        ]),
        &[],
    );

    let evaluation = engine
        .evaluate(request(linear_candles(start(), 10, 100.0, 110.0)))
        .await;
    assert_eq!(evaluation.state, EvaluationState::Published);
    assert!(evaluation.error.is_none());

    let result = evaluation.result;
    let ids: Vec<&str> = result
        .strategy_results
        .iter()
        .map(|r| r.strategy_id.as_str())
        .collect();
    assert_eq!(ids, vec!["panicking", "buy", "failing", "strong"]);

    let panicked = &result.strategy_results[0];
    assert_eq!(panicked.signal, SignalLevel::Neutral);
    assert!(panicked.is_skipped());
    let failed = &result.strategy_results[2];
    assert!(
        failed
            .evidence
            .error
            .as_deref()
            .is_some_and(|e| e.contains("division by zero"))
    );

    // 只有两个成功结果参与加权：(1 + 2) / 2 = 1.5
    assert_eq!(result.overall_signal, SignalLevel::StrongBuy);
    assert_eq!(result.consensus, 1.0);
    let summary = result.per_timeframe_summary[&TimeFrame::Minute1];
    assert_eq!(summary.strategy_count, 2);
    Ok(())
}

#[tokio::test]
async fn test_empty_series_fails_with_neutral_result() -> Result<()> {
    let engine = StrategyEngine::new(registry(vec![Arc::new(Fixed("buy", SignalLevel::Buy))]), &[]);
    let evaluation = engine.evaluate(request(Vec::new())).await;

    assert_eq!(evaluation.state, EvaluationState::Failed);
    assert!(evaluation.error.is_some());
    assert_eq!(evaluation.result.overall_signal, SignalLevel::Neutral);
    assert_eq!(evaluation.result.consensus, 0.0);
    assert!(evaluation.result.strategy_results.is_empty());
    assert_eq!(evaluation.result.notes.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_all_skipped_still_publishes() -> Result<()> {
    // 5 根 K 线不足以计算 SMA(20)，但 SMA(2) 依然成功，因此不是 FAILED
    let engine = StrategyEngine::new(
        registry(vec![Arc::new(MaBreakout::new(20))]),
        &[IndicatorSpec::Sma { period: 2 }],
    );
    let evaluation = engine
        .evaluate(request(linear_candles(start(), 5, 100.0, 105.0)))
        .await;

    assert_eq!(evaluation.state, EvaluationState::Published);
    assert!(evaluation.error.is_some());
    assert_eq!(evaluation.result.overall_signal, SignalLevel::Neutral);
    assert!(evaluation.result.strategy_results[0].is_skipped());
    Ok(())
}

#[tokio::test]
async fn test_ma_breakout_fires_once_on_uptrend() -> Result<()> {
    let config = AppConfig::default();
    let engine = StrategyEngine::new(
        registry(vec![Arc::new(MaBreakout::new(20))]),
        &config.indicators.specs(),
    );

    let candles = linear_candles(start(), 60, 100.0, 160.0);
    let mut buys = Vec::new();
    for end in 1..=candles.len() {
        let evaluation = engine.evaluate(request(candles[..end].to_vec())).await;
        for breakout in &evaluation.result.strategy_results {
            if breakout.signal == SignalLevel::Buy {
                buys.push(end - 1);
            }
            assert_ne!(breakout.signal, SignalLevel::Sell);
        }
    }
    assert_eq!(buys, vec![19]);
    Ok(())
}

#[tokio::test]
async fn test_default_catalogue_is_deterministic() -> Result<()> {
    let config = AppConfig::default();
    let engine = StrategyEngine::new(
        StrategyRegistry::from_config(&config.strategies, &config.indicators),
        &config.indicators.specs(),
    );
    let candles = linear_candles(start(), 80, 100.0, 140.0);

    let first = engine.evaluate(request(candles.clone())).await;
    let second = engine.evaluate(request(candles)).await;
    assert_eq!(first.result, second.result);
    assert_eq!(first.result.strategy_results.len(), 11);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_evaluations_share_bounded_pool() -> Result<()> {
    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let gauges: Vec<Arc<dyn Strategy>> = ["a", "b"]
        .into_iter()
        .map(|id| {
            Arc::new(Gauge {
                id,
                running: Arc::clone(&running),
                peak: Arc::clone(&peak),
            }) as Arc<dyn Strategy>
        })
        .collect();
    let engine = StrategyEngine::new(registry(gauges), &[IndicatorSpec::Sma { period: 2 }]);
    assert_eq!(engine.pool_size(), 2);

    let candles = linear_candles(start(), 10, 100.0, 110.0);
    let evaluations = futures::future::join_all(
        (0..6).map(|_| engine.evaluate(request(candles.clone()))),
    )
    .await;

    assert_eq!(evaluations.len(), 6);
    assert!(
        evaluations
            .iter()
            .all(|e| e.state == EvaluationState::Published)
    );
    let peak = peak.load(Ordering::SeqCst);
    assert!((1..=2).contains(&peak), "peak {}", peak);
    Ok(())
}
