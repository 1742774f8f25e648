use crate::common::{InstrumentKey, TimeFrame};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// # Summary
/// 投递到错误通道的记录，表示一次触发未能产出有意义的结果。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    pub instrument: InstrumentKey,
    pub timeframe: TimeFrame,
    pub error: String,
    pub timestamp: DateTime<Utc>,
}
