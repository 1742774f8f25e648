use crate::strategies::{
    AtrBreakout, BollingerReversion, BollingerSqueeze, EmaTrend, MaBreakout, MaCross, MacdCross,
    ObvDivergence, RsiReversal, VolumeSurge, VwapCross,
};
use std::sync::Arc;
use tenkan_core::config::{IndicatorConfig, StrategyConfig};
use tenkan_core::indicator::entity::IndicatorSpec;
use tenkan_core::strategy::port::Strategy;
use tracing::{info, warn};

/// # Summary
/// 策略注册表。
///
/// # Invariants
/// - 策略按注册顺序保存，评估结果也按此顺序排列，保证聚合输入确定。
/// - 策略标识唯一，重复注册会被拒绝。
#[derive(Default, Clone)]
pub struct StrategyRegistry {
    strategies: Vec<Arc<dyn Strategy>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Summary
    /// 按配置构建内置策略目录。
    ///
    /// # Logic
    /// 1. 只注册启用的策略。
    /// 2. 依赖共享指标参数 (RSI/MACD/布林带/成交量/ATR/VWAP) 的策略沿用指标配置，
    ///    使其与 `IndicatorConfig::specs()` 计算出的结果一致。
    ///
    /// # Arguments
    /// * `strategies`: 策略开关与参数。
    /// * `indicators`: 指标参数。
    ///
    /// # Returns
    /// 初始化完成的注册表。
    pub fn from_config(strategies: &StrategyConfig, indicators: &IndicatorConfig) -> Self {
        let mut registry = Self::new();
        let s = strategies;

        if s.ma_breakout.enabled {
            registry.register(Arc::new(MaBreakout::new(s.ma_breakout.period)));
        }
        if s.ma_cross.enabled {
            registry.register(Arc::new(MaCross::new(s.ma_cross.fast, s.ma_cross.slow)));
        }
        if s.ema_trend.enabled {
            registry.register(Arc::new(EmaTrend::new(
                s.ema_trend.fast,
                s.ema_trend.slow,
                s.ema_trend.confirm,
            )));
        }
        if s.rsi_reversal.enabled {
            registry.register(Arc::new(RsiReversal::new(
                indicators.rsi,
                s.rsi_reversal.extreme_low,
                s.rsi_reversal.extreme_high,
            )));
        }
        if s.macd_cross.enabled {
            registry.register(Arc::new(MacdCross::new(indicators.macd)));
        }
        if s.bollinger_reversion.enabled {
            registry.register(Arc::new(BollingerReversion::new(indicators.bollinger)));
        }
        if s.bollinger_squeeze.enabled {
            registry.register(Arc::new(BollingerSqueeze::new(
                indicators.bollinger,
                s.bollinger_squeeze.lookback,
            )));
        }
        if s.volume_surge.enabled {
            registry.register(Arc::new(VolumeSurge::new(indicators.volume)));
        }
        if s.vwap_cross.enabled {
            registry.register(Arc::new(VwapCross::new(indicators.vwap_session)));
        }
        if s.atr_breakout.enabled {
            registry.register(Arc::new(AtrBreakout::new(
                indicators.atr_period,
                s.atr_breakout.multiplier,
            )));
        }
        if s.obv_divergence.enabled {
            registry.register(Arc::new(ObvDivergence::new(
                indicators.volume,
                s.obv_divergence.lookback,
            )));
        }

        info!("Strategy registry initialized with {} strategies", registry.len());
        registry
    }

    /// # Summary
    /// 注册一个策略。
    ///
    /// # Returns
    /// 标识重复时不注册并返回 `false`。
    pub fn register(&mut self, strategy: Arc<dyn Strategy>) -> bool {
        if self.strategies.iter().any(|s| s.id() == strategy.id()) {
            warn!("Strategy {} already registered, ignoring", strategy.id());
            return false;
        }
        self.strategies.push(strategy);
        true
    }

    pub fn strategies(&self) -> &[Arc<dyn Strategy>] {
        &self.strategies
    }

    pub fn ids(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// # Summary
    /// 合并配置的指标参数与所有策略声明的依赖，去重后保持首次出现的顺序。
    pub fn indicator_specs(&self, configured: &[IndicatorSpec]) -> Vec<IndicatorSpec> {
        let mut specs: Vec<IndicatorSpec> = Vec::new();
        let required = self.strategies.iter().flat_map(|s| s.requirements());
        for spec in configured.iter().copied().chain(required) {
            if !specs.contains(&spec) {
                specs.push(spec);
            }
        }
        specs
    }
}
