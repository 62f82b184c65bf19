use std::time::Instant;

/// 性能统计 Guard：记录操作耗时 elapsed_ms
///
/// 使用方式：
/// ```ignore
/// let _perf = capacity_calendar::perf::PerfGuard::new("refresh_resource");
/// // do work...
/// ```
pub struct PerfGuard {
    op: &'static str,
    start: Instant,
}

impl PerfGuard {
    pub fn new(op: &'static str) -> Self {
        Self {
            op,
            start: Instant::now(),
        }
    }

    /// 当前已耗时（毫秒），供结果上报复用
    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

impl Drop for PerfGuard {
    fn drop(&mut self) {
        let elapsed_ms = self.start.elapsed().as_millis() as u64;

        tracing::info!(
            target: "perf",
            op = self.op,
            elapsed_ms,
            "done"
        );
    }
}
