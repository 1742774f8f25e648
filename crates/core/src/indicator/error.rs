use thiserror::Error;

/// # Summary
/// 指标计算错误枚举。
///
/// # Invariants
/// - `InsufficientData` 是预热阶段的常态，属于可恢复错误，不代表故障。
/// - 指标函数在出错时绝不返回部分结果或补零结果。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndicatorError {
    /// 历史数据不足以满足回溯窗口
    #[error("Insufficient data for {indicator}: need {required}, have {available}")]
    InsufficientData {
        indicator: String,
        required: usize,
        available: usize,
    },
    /// 参数不合法 (例如周期为 0)
    #[error("Invalid parameter for {indicator}: {reason}")]
    InvalidParameter { indicator: String, reason: String },
}
