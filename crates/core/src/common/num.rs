//! 计数到浮点数的转换辅助函数。
//!
//! 工作区禁止有损的 `as` 转换，窗口长度与计数都经由这里转为 `f64` 或 `i64`。

/// 将计数转换为 `f64`；超出 `u32` 范围的值被截断为 `u32::MAX`。
pub fn count_to_f64(n: usize) -> f64 {
    f64::from(u32::try_from(n).unwrap_or(u32::MAX))
}

/// 将计数转换为 `i64`，用于整数权重运算；超出范围时截断为 `i64::MAX`。
pub fn count_to_i64(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// 计算 `numer / denom`；分母为零时返回 0。
pub fn ratio(numer: usize, denom: usize) -> f64 {
    if denom == 0 {
        return 0.0;
    }
    count_to_f64(numer) / count_to_f64(denom)
}
