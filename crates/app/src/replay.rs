use async_trait::async_trait;
use std::path::PathBuf;
use tenkan_core::market::entity::CandleEvent;
use tenkan_core::market::error::MarketError;
use tenkan_core::market::port::{CandleEventStream, MarketDataFeed};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

/// # Summary
/// 从 JSON Lines 文件回放行情事件的行情源，每行一个 `CandleEvent`。
///
/// # Invariants
/// - 事件按文件行序产出，文件读完即流结束。
/// - 无法解析的行被跳过并告警，不会中断回放。
pub struct JsonLinesFeed {
    path: PathBuf,
}

impl JsonLinesFeed {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// 解析一行回放数据，空行返回 `None`
pub fn parse_line(line: &str) -> Option<Result<CandleEvent, MarketError>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    Some(serde_json::from_str(line).map_err(|e| MarketError::Feed(e.to_string())))
}

#[async_trait]
impl MarketDataFeed for JsonLinesFeed {
    async fn subscribe(&self) -> Result<CandleEventStream, MarketError> {
        let file = tokio::fs::File::open(&self.path)
            .await
            .map_err(|e| MarketError::Feed(format!("{}: {}", self.path.display(), e)))?;
        info!("Replaying events from {}", self.path.display());

        let mut lines = BufReader::new(file).lines();
        let stream = async_stream::stream! {
            let mut number = 0usize;
            loop {
                let line = match lines.next_line().await {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        warn!("Replay read failed after line {}: {}", number, e);
                        break;
                    }
                };
                number += 1;
                match parse_line(&line) {
                    Some(Ok(event)) => yield event,
                    Some(Err(e)) => warn!("Skipping replay line {}: {}", number, e),
                    None => {}
                }
            }
        };
        Ok(Box::pin(stream))
    }
}
