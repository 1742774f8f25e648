use serde::{Deserialize, Serialize};
use tenkan_core::market::entity::Candle;
use tenkan_core::market::error::MarketError;
use tracing::debug;

/// # Summary
/// 固定容量的滚动环形缓冲区。
///
/// # Invariants
/// - 内存空间在初始化时一次性分配，后续不再扩容。
/// - 始终保持最近 N 个元素，超出容量时从最旧的一端淘汰。
/// - 未写满前 `cursor` 恒为 0；写满后 `cursor` 指向最旧元素。
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RollingBuffer<T> {
    // 内部存储容器
    data: Vec<T>,
    // 最大容量
    capacity: usize,
    // 最旧元素的位置索引
    cursor: usize,
}

impl<T: Clone> RollingBuffer<T> {
    /// # Summary
    /// 创建一个新的滚动缓冲区。
    ///
    /// # Logic
    /// 调用 Vec::with_capacity 预分配指定大小的内存，容量至少为 1。
    ///
    /// # Arguments
    /// * `capacity`: 固定容量上限。
    ///
    /// # Returns
    /// 初始化后的 RollingBuffer 实例。
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            data: Vec::with_capacity(capacity),
            capacity,
            cursor: 0,
        }
    }

    /// # Summary
    /// 向缓冲区推送新元素。
    ///
    /// # Logic
    /// 1. 若未满，则直接 push。
    /// 2. 若已满，覆盖 cursor 处的最旧元素，并递增（取模）cursor。
    ///
    /// # Returns
    /// 被淘汰的最旧元素 (若有)。
    pub fn push(&mut self, item: T) -> Option<T> {
        if self.data.len() < self.capacity {
            self.data.push(item);
            None
        } else {
            let evicted = std::mem::replace(&mut self.data[self.cursor], item);
            self.cursor = (self.cursor + 1) % self.capacity;
            Some(evicted)
        }
    }

    /// # Summary
    /// 原地替换最新的元素。
    ///
    /// # Returns
    /// 缓冲区为空时不做任何修改并返回 None，否则返回被替换的旧值。
    pub fn replace_last(&mut self, item: T) -> Option<T> {
        let idx = self.last_index()?;
        Some(std::mem::replace(&mut self.data[idx], item))
    }

    /// 获取缓冲区中最新插入的元素。
    pub fn last(&self) -> Option<&T> {
        self.last_index().and_then(|idx| self.data.get(idx))
    }

    /// 按插入顺序遍历，从最旧到最新。
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + '_ {
        self.data[self.cursor..]
            .iter()
            .chain(self.data[..self.cursor].iter())
    }

    /// 获取按插入顺序排序的完整数据列表。
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn last_index(&self) -> Option<usize> {
        if self.data.is_empty() {
            None
        } else if self.data.len() < self.capacity {
            Some(self.data.len() - 1)
        } else {
            Some((self.cursor + self.capacity - 1) % self.capacity)
        }
    }
}

/// 一次缓冲区更新对尾部做了什么
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferAction {
    // 追加了新的一分钟 K 线
    Appended,
    // 原地替换了尚未收盘的尾部
    Replaced,
    // 已收盘 K 线的重复投递，忽略
    Ignored,
}

/// # Summary
/// 缓冲区更新结果。
///
/// # Invariants
/// - `closed` 按时间升序，最多两根：被更晚 K 线顶替而隐式收盘的旧尾部，以及本次显式收盘的新尾部。
#[derive(Debug, Clone, PartialEq)]
pub struct BufferUpdate {
    pub action: BufferAction,
    pub closed: Vec<Candle>,
}

/// # Summary
/// 单个键的一分钟 K 线缓冲区。
///
/// # Invariants
/// - K 线按 `open_time` 严格递增。
/// - 只有尾部元素可能处于未收盘状态；未收盘时同一 `open_time` 的更新原地替换。
/// - 每根 K 线恰好被报告收盘一次。
#[derive(Debug, Clone)]
pub struct CandleBuffer {
    candles: RollingBuffer<Candle>,
    // 尾部 K 线是否已收盘
    tail_closed: bool,
}

impl CandleBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            candles: RollingBuffer::new(capacity),
            tail_closed: false,
        }
    }

    /// # Summary
    /// 应用一次上游 K 线更新。
    ///
    /// # Logic
    /// 1. 校验 K 线不变量，非法则拒绝并保持当前状态。
    /// 2. 早于尾部的 K 线视为乱序并拒绝。
    /// 3. 与尾部同一 `open_time`：尾部已收盘则忽略 (重复投递)，否则原地替换。
    /// 4. 晚于尾部：若尾部尚未收盘，它被隐式收盘；然后追加新 K 线。
    /// 5. `is_final` 为真时，新尾部立即收盘。
    ///
    /// # Arguments
    /// * `candle`: 新的一分钟 K 线。
    /// * `is_final`: 上游给出的收盘标记。
    ///
    /// # Returns
    /// 成功返回本次更新的动作与新收盘的 K 线；非法或乱序返回 `MarketError`。
    pub fn update(&mut self, candle: Candle, is_final: bool) -> Result<BufferUpdate, MarketError> {
        candle.validate()?;

        let mut closed = Vec::new();
        let action = match self.candles.last() {
            Some(tail) if candle.open_time < tail.open_time => {
                return Err(MarketError::OutOfOrder {
                    tail: tail.open_time,
                    received: candle.open_time,
                });
            }
            Some(tail) if candle.open_time == tail.open_time => {
                if self.tail_closed {
                    debug!("Ignoring redelivery of closed candle {}", candle.open_time);
                    return Ok(BufferUpdate {
                        action: BufferAction::Ignored,
                        closed,
                    });
                }
                self.candles.replace_last(candle.clone());
                BufferAction::Replaced
            }
            Some(tail) => {
                if !self.tail_closed {
                    closed.push(tail.clone());
                }
                self.candles.push(candle.clone());
                self.tail_closed = false;
                BufferAction::Appended
            }
            None => {
                self.candles.push(candle.clone());
                self.tail_closed = false;
                BufferAction::Appended
            }
        };

        if is_final {
            self.tail_closed = true;
            closed.push(candle);
        }

        Ok(BufferUpdate { action, closed })
    }

    /// 已收盘的 K 线，按时间升序
    pub fn closed_candles(&self) -> Vec<Candle> {
        let mut candles = self.candles.to_vec();
        if !self.tail_closed {
            candles.pop();
        }
        candles
    }

    /// 尚未收盘的尾部 K 线
    pub fn live(&self) -> Option<&Candle> {
        if self.tail_closed {
            None
        } else {
            self.candles.last()
        }
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use tenkan_core::testing::minute_candle;

    fn candle_at(minute: i64, close: f64) -> Candle {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minute);
        minute_candle(t, close, close + 1.0, close - 1.0, close, 10.0)
    }

    #[test]
    fn test_rolling_buffer_evicts_oldest() {
        let mut buf = RollingBuffer::new(3);
        assert_eq!(buf.push(1), None);
        buf.push(2);
        buf.push(3);
        assert_eq!(buf.push(4), Some(1));
        assert_eq!(buf.to_vec(), vec![2, 3, 4]);
        assert_eq!(buf.last(), Some(&4));
        buf.push(5);
        assert_eq!(buf.to_vec(), vec![3, 4, 5]);
    }

    #[test]
    fn test_rolling_buffer_replace_last_when_wrapped() {
        let mut buf = RollingBuffer::new(2);
        assert_eq!(buf.replace_last(9), None);
        assert!(buf.is_empty());
        buf.push(1);
        buf.push(2);
        buf.push(3);
        assert_eq!(buf.replace_last(30), Some(3));
        assert_eq!(buf.to_vec(), vec![2, 30]);
        assert_eq!(buf.len(), 2);
        assert_eq!(buf.capacity(), 2);
    }

    #[test]
    fn test_live_updates_replace_in_place() {
        let mut buf = CandleBuffer::new(10);
        let first = buf.update(candle_at(0, 100.0), false).unwrap();
        assert_eq!(first.action, BufferAction::Appended);
        assert!(first.closed.is_empty());

        let second = buf.update(candle_at(0, 101.0), false).unwrap();
        assert_eq!(second.action, BufferAction::Replaced);
        assert_eq!(buf.len(), 1);
        assert_eq!(buf.live().map(|c| c.close), Some(101.0));
        assert!(buf.closed_candles().is_empty());

        let fin = buf.update(candle_at(0, 102.0), true).unwrap();
        assert_eq!(fin.action, BufferAction::Replaced);
        assert_eq!(fin.closed.len(), 1);
        assert_eq!(fin.closed[0].close, 102.0);
        assert!(buf.live().is_none());
        assert_eq!(buf.closed_candles().len(), 1);
    }

    #[test]
    fn test_redelivered_final_is_ignored() {
        let mut buf = CandleBuffer::new(10);
        buf.update(candle_at(0, 100.0), true).unwrap();
        let again = buf.update(candle_at(0, 100.0), true).unwrap();
        assert_eq!(again.action, BufferAction::Ignored);
        assert!(again.closed.is_empty());
        assert_eq!(buf.len(), 1);
    }

    #[test]
    fn test_greater_open_time_closes_previous_tail() {
        let mut buf = CandleBuffer::new(10);
        buf.update(candle_at(0, 100.0), false).unwrap();
        let next = buf.update(candle_at(1, 101.0), false).unwrap();
        assert_eq!(next.action, BufferAction::Appended);
        assert_eq!(next.closed.len(), 1);
        assert_eq!(next.closed[0].close, 100.0);

        let both = buf.update(candle_at(2, 102.0), true).unwrap();
        let closes: Vec<f64> = both.closed.iter().map(|c| c.close).collect();
        assert_eq!(closes, vec![101.0, 102.0]);
    }

    #[test]
    fn test_out_of_order_and_invalid_are_rejected() {
        let mut buf = CandleBuffer::new(10);
        buf.update(candle_at(5, 100.0), true).unwrap();
        assert!(matches!(
            buf.update(candle_at(4, 100.0), true),
            Err(MarketError::OutOfOrder { .. })
        ));

        let mut bad = candle_at(6, 100.0);
        bad.low = 200.0;
        assert!(matches!(
            buf.update(bad, true),
            Err(MarketError::InvalidCandle { .. })
        ));
        assert_eq!(buf.len(), 1);
        assert_eq!(buf.last().map(|c| c.close), Some(100.0));
    }

    #[test]
    fn test_capacity_eviction_keeps_order() {
        let mut buf = CandleBuffer::new(3);
        for (m, close) in (0..5).zip([100.0, 101.0, 102.0, 103.0, 104.0]) {
            buf.update(candle_at(m, close), true).unwrap();
        }
        let closes: Vec<f64> = buf.closed_candles().iter().map(|c| c.close).collect();
        assert_eq!(closes, vec![102.0, 103.0, 104.0]);
    }
}
