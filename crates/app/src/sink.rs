use async_trait::async_trait;
use tenkan_core::signal::entity::ErrorReport;
use tenkan_core::signal::error::SinkError;
use tenkan_core::signal::port::{ErrorSink, SignalSink};
use tenkan_core::strategy::entity::MultiStrategyResult;
use tracing::{info, warn};

/// # Summary
/// 把综合结果写入日志的接收方，同时充当错误通道。
///
/// # Logic
/// 摘要字段走结构化日志；`json = true` 时附带完整结果的 JSON。
#[derive(Debug, Default)]
pub struct LogSink {
    json: bool,
}

impl LogSink {
    pub fn new(json: bool) -> Self {
        Self { json }
    }
}

#[async_trait]
impl SignalSink for LogSink {
    async fn publish(&self, result: &MultiStrategyResult) -> Result<(), SinkError> {
        info!(
            instrument = %result.instrument,
            timeframe = %result.timeframe,
            timestamp = %result.timestamp,
            signal = %result.overall_signal,
            consensus = result.consensus,
            "Composite signal"
        );
        if self.json {
            let payload =
                serde_json::to_string(result).map_err(|e| SinkError::Delivery(e.to_string()))?;
            info!("{}", payload);
        }
        Ok(())
    }
}

#[async_trait]
impl ErrorSink for LogSink {
    async fn report(&self, report: &ErrorReport) -> Result<(), SinkError> {
        warn!(
            instrument = %report.instrument,
            timeframe = %report.timeframe,
            timestamp = %report.timestamp,
            "Evaluation degraded: {}",
            report.error
        );
        Ok(())
    }
}
