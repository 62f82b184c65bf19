// ==========================================
// 资源产能日历引擎 - 时间桶聚合
// ==========================================
// 依据: Calendar_Dev_Master_Spec.md - PART C4 产能聚合
// 依据: Timeline_Engine_Specs_v0.5.md - 8. 时间桶与哈希合并
// ==========================================
// 红线: 桶累计采用饱和加法, 溢出只计数不回绕

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::error::{CalendarError, CalendarResult};
use crate::domain::time::TimeInterval;

// ==========================================
// TimeBucket - 单桶
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimeBucket {
    pub accumulated: Duration, // 加权累计时长
    pub overflow_count: u32,   // 饱和发生次数
}

impl TimeBucket {
    /// 饱和累加: 溢出时封顶并递增计数
    fn saturating_add(&mut self, amount: Duration, amount_overflowed: bool) {
        if amount_overflowed {
            self.accumulated = Duration::MAX;
            self.overflow_count += 1;
            return;
        }
        match self.accumulated.checked_add(&amount) {
            Some(sum) => self.accumulated = sum,
            None => {
                self.accumulated = Duration::MAX;
                self.overflow_count += 1;
            }
        }
    }
}

// ==========================================
// TimeBucketList - 等宽时间桶列表
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeBucketList {
    start: DateTime<Utc>,      // 首桶开始时刻
    bucket_length: Duration,   // 桶宽(固定)
    buckets: Vec<TimeBucket>,
}

impl TimeBucketList {
    /// 构造时间桶列表
    ///
    /// # 参数
    /// - `start`: 首桶开始时刻
    /// - `bucket_length`: 桶宽, 必须为正
    /// - `bucket_count`: 桶数
    pub fn new(
        start: DateTime<Utc>,
        bucket_length: Duration,
        bucket_count: usize,
    ) -> CalendarResult<Self> {
        if bucket_length <= Duration::zero() {
            return Err(CalendarError::InvalidBucketSpec {
                field: "bucket_length".to_string(),
                message: format!("桶宽必须为正 (bucket_length={})", bucket_length),
            });
        }
        Ok(TimeBucketList {
            start,
            bucket_length,
            buckets: vec![TimeBucket::default(); bucket_count],
        })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn bucket_length(&self) -> Duration {
        self.bucket_length
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// 列表覆盖范围的结束时刻
    pub fn end(&self) -> DateTime<Utc> {
        self.start + self.bucket_length * (self.buckets.len() as i32)
    }

    pub fn get(&self, idx: usize) -> Option<&TimeBucket> {
        self.buckets.get(idx)
    }

    /// 第 idx 个桶的时间窗口
    pub fn bucket_window(&self, idx: usize) -> Option<TimeInterval> {
        if idx >= self.buckets.len() {
            return None;
        }
        let start = self.start + self.bucket_length * (idx as i32);
        Some(TimeInterval::raw(start, start + self.bucket_length))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TimeBucket> {
        self.buckets.iter()
    }

    /// 把一段时长按权重计入落点桶
    ///
    /// 先裁剪到列表范围, 跨桶部分按与各桶的重叠时长
    /// 分摊; 计入量 = 重叠时长 × 权重, 饱和累加
    ///
    /// 非正时长或非正权重不计入
    pub fn add_time(&mut self, start: DateTime<Utc>, end: DateTime<Utc>, weight: f64) {
        if end <= start || !(weight > 0.0) || self.buckets.is_empty() {
            return;
        }
        let span = TimeInterval::raw(start, end);
        let list_range = TimeInterval::raw(self.start, self.end());
        let clipped = match span.intersection(&list_range) {
            Some(w) => w,
            None => return,
        };
        let first = self.bucket_index_of(clipped.start);
        let last = self.bucket_index_of(clipped.end - crate::domain::time::one_tick());
        for idx in first..=last {
            let window = match self.bucket_window(idx) {
                Some(w) => w,
                None => break,
            };
            if let Some(overlap) = window.intersection(&clipped) {
                let (amount, overflowed) = weighted_duration(overlap.duration(), weight);
                self.buckets[idx].saturating_add(amount, overflowed);
            }
        }
    }

    /// 逐桶吸收另一列表(按下标对齐, 较短者为准)
    ///
    /// 溢出计数一并吸收; 本次吸收再饱和时继续计数
    pub fn absorb(&mut self, other: &TimeBucketList) {
        let n = self.buckets.len().min(other.buckets.len());
        for idx in 0..n {
            let incoming = other.buckets[idx];
            self.buckets[idx].overflow_count += incoming.overflow_count;
            self.buckets[idx].saturating_add(incoming.accumulated, false);
        }
    }

    /// 时刻所属桶下标(时刻须在列表范围内)
    fn bucket_index_of(&self, t: DateTime<Utc>) -> usize {
        let offset = t - self.start;
        let len_ms = self.bucket_length.num_milliseconds();
        if len_ms <= 0 {
            return 0;
        }
        let idx = offset.num_milliseconds() / len_ms;
        (idx.max(0) as usize).min(self.buckets.len().saturating_sub(1))
    }
}

/// 重叠时长 × 权重, 超出时长可表示范围时饱和
fn weighted_duration(d: Duration, weight: f64) -> (Duration, bool) {
    let nanos = match d.num_nanoseconds() {
        Some(n) => n,
        None => return (Duration::MAX, true),
    };
    let weighted = nanos as f64 * weight;
    if !weighted.is_finite() || weighted >= i64::MAX as f64 {
        return (Duration::MAX, true);
    }
    (Duration::nanoseconds(weighted as i64), false)
}

// ==========================================
// TimeBucketListHash - 具名桶列表哈希
// ==========================================
// 键为业务侧命名(如资源名/产能代码), 同键合并
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeBucketListHash {
    lists: HashMap<String, TimeBucketList>,
}

impl TimeBucketListHash {
    pub fn new() -> Self {
        TimeBucketListHash {
            lists: HashMap::new(),
        }
    }

    /// 键不存在则插入, 存在则逐桶吸收
    pub fn add_or_consolidate(&mut self, key: &str, list: TimeBucketList) {
        match self.lists.get_mut(key) {
            Some(existing) => existing.absorb(&list),
            None => {
                self.lists.insert(key.to_string(), list);
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&TimeBucketList> {
        self.lists.get(key)
    }

    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    pub fn iter(&self) -> std::collections::hash_map::Iter<'_, String, TimeBucketList> {
        self.lists.iter()
    }
}
