use crate::common::TimeFrame;
use crate::indicator::entity::{
    BollingerParams, IndicatorSpec, MacdParams, RsiParams, VolumeParams, VwapSession,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// 全局应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub pipeline: PipelineConfig,
    pub indicators: IndicatorConfig,
    pub strategies: StrategyConfig,
    pub logging: LoggingConfig,
}

/// # Summary
/// 管线配置：缓冲区容量、聚合周期、评估周期与工作队列深度。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    // 一分钟缓冲区容量 (1440 ≈ 24 小时)
    pub buffer_capacity: usize,
    // 每个高周期序列的容量
    pub aggregated_capacity: usize,
    // 由一分钟序列派生的高周期
    pub aggregated_timeframes: Vec<TimeFrame>,
    // 收盘时触发策略评估的周期
    pub evaluated_timeframes: Vec<TimeFrame>,
    // 每个键的工作队列深度
    pub queue_depth: usize,
    // 冷启动时从仓库回填的一分钟 K 线数量，0 表示不回填
    pub warm_start_limit: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: 1_440,
            aggregated_capacity: 200,
            aggregated_timeframes: vec![TimeFrame::Minute15, TimeFrame::Hour1, TimeFrame::Day1],
            evaluated_timeframes: vec![
                TimeFrame::Minute1,
                TimeFrame::Minute15,
                TimeFrame::Hour1,
                TimeFrame::Day1,
            ],
            queue_depth: 1_024,
            warm_start_limit: 1_440,
        }
    }
}

impl PipelineConfig {
    /// # Summary
    /// 规整配置。
    ///
    /// # Logic
    /// 1. 从聚合周期中剔除一分钟周期 (它本身就是源序列)。
    /// 2. 聚合周期与评估周期排序去重。
    /// 3. 评估周期中未被聚合的高周期会被忽略并告警。
    /// 4. 容量与队列深度至少为 1。
    pub fn normalized(mut self) -> Self {
        self.aggregated_timeframes.retain(|tf| *tf != TimeFrame::Minute1);
        self.aggregated_timeframes.sort();
        self.aggregated_timeframes.dedup();
        self.evaluated_timeframes.sort();
        self.evaluated_timeframes.dedup();
        let aggregated = self.aggregated_timeframes.clone();
        self.evaluated_timeframes.retain(|tf| {
            let known = *tf == TimeFrame::Minute1 || aggregated.contains(tf);
            if !known {
                warn!("Evaluated timeframe {} is not aggregated, ignoring", tf);
            }
            known
        });
        self.buffer_capacity = self.buffer_capacity.max(1);
        self.aggregated_capacity = self.aggregated_capacity.max(1);
        self.queue_depth = self.queue_depth.max(1);
        self
    }
}

/// # Summary
/// 指标配置，默认值即各指标的标准参数。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub sma_periods: Vec<usize>,
    pub ema_periods: Vec<usize>,
    pub rsi: RsiParams,
    pub macd: MacdParams,
    pub bollinger: BollingerParams,
    pub atr_period: usize,
    pub volume: VolumeParams,
    pub vwap_session: VwapSession,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            sma_periods: vec![20, 50],
            ema_periods: vec![12, 26],
            rsi: RsiParams::default(),
            macd: MacdParams::default(),
            bollinger: BollingerParams::default(),
            atr_period: 14,
            volume: VolumeParams::default(),
            vwap_session: VwapSession::default(),
        }
    }
}

impl IndicatorConfig {
    /// 展开为指标参数化列表
    pub fn specs(&self) -> Vec<IndicatorSpec> {
        let mut specs: Vec<IndicatorSpec> = self
            .sma_periods
            .iter()
            .map(|&period| IndicatorSpec::Sma { period })
            .collect();
        specs.extend(
            self.ema_periods
                .iter()
                .map(|&period| IndicatorSpec::Ema { period }),
        );
        specs.push(IndicatorSpec::Rsi(self.rsi));
        specs.push(IndicatorSpec::Macd(self.macd));
        specs.push(IndicatorSpec::Bollinger(self.bollinger));
        specs.push(IndicatorSpec::Atr {
            period: self.atr_period,
        });
        specs.push(IndicatorSpec::Volume(self.volume));
        specs.push(IndicatorSpec::Vwap {
            session: self.vwap_session,
        });
        specs
    }
}

/// # Summary
/// 策略注册配置，每个策略可单独启用并调整参数。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub ma_breakout: MaBreakoutConfig,
    pub ma_cross: MaCrossConfig,
    pub ema_trend: EmaTrendConfig,
    pub rsi_reversal: RsiReversalConfig,
    pub macd_cross: Toggle,
    pub bollinger_reversion: Toggle,
    pub bollinger_squeeze: BollingerSqueezeConfig,
    pub volume_surge: Toggle,
    pub vwap_cross: Toggle,
    pub atr_breakout: AtrBreakoutConfig,
    pub obv_divergence: ObvDivergenceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Toggle {
    pub enabled: bool,
}

impl Default for Toggle {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MaBreakoutConfig {
    pub enabled: bool,
    pub period: usize,
}

impl Default for MaBreakoutConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            period: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MaCrossConfig {
    pub enabled: bool,
    pub fast: usize,
    pub slow: usize,
}

impl Default for MaCrossConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            fast: 20,
            slow: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmaTrendConfig {
    pub enabled: bool,
    pub fast: usize,
    pub slow: usize,
    // 以 SMA(confirm) 作为趋势过滤
    pub confirm: usize,
}

impl Default for EmaTrendConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            fast: 12,
            slow: 26,
            confirm: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RsiReversalConfig {
    pub enabled: bool,
    // 低于该值离开超卖区时给出强买
    pub extreme_low: f64,
    // 高于该值离开超买区时给出强卖
    pub extreme_high: f64,
}

impl Default for RsiReversalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            extreme_low: 20.0,
            extreme_high: 80.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BollingerSqueezeConfig {
    pub enabled: bool,
    // 判断收口时回看的带宽数量
    pub lookback: usize,
}

impl Default for BollingerSqueezeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            lookback: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AtrBreakoutConfig {
    pub enabled: bool,
    pub multiplier: f64,
}

impl Default for AtrBreakoutConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            multiplier: 1.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObvDivergenceConfig {
    pub enabled: bool,
    pub lookback: usize,
}

impl Default for ObvDivergenceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            lookback: 20,
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    // 默认过滤级别，可被 RUST_LOG 覆盖
    pub level: String,
    // 滚动日志文件目录，为空则只输出到标准输出
    pub directory: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}
