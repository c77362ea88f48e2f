//! 全局限流器 - 基础设施层
//!
//! 持有唯一的共享可变状态（上一次调用的时间），只暴露"等待下一个调用窗口"的能力

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::debug;

/// 全局限流器
///
/// 职责：
/// - 保证整个进程内任意两次上游调用的间隔不小于 `min_interval`
/// - 所有批次、所有问题共享同一个实例（通过 `Arc<Throttle>` 注入）
/// - 不认识 Question / Answer
///
/// 等待期间一直持有锁，因此并发调用者会按到达顺序依次排队，
/// 读-改-写 `last_dispatch_at` 不会交错。
#[derive(Debug, Default)]
pub struct Throttle {
    last_dispatch_at: Mutex<Option<Instant>>,
}

impl Throttle {
    /// 创建新的限流器（尚未发生任何调用）
    pub fn new() -> Self {
        Self::default()
    }

    /// 等待直到距离上一次调用至少 `min_interval`，然后记录本次调用时间
    ///
    /// 等待时长被限制在 `[0, min_interval]` 内。
    /// 在等待中被取消（future 被丢弃）时不会记录新的调用时间。
    pub async fn wait(&self, min_interval: Duration) {
        let mut last = self.last_dispatch_at.lock().await;

        if let Some(prev) = *last {
            let elapsed = Instant::now().saturating_duration_since(prev);
            let wait_time = min_interval.saturating_sub(elapsed);
            if !wait_time.is_zero() {
                debug!("⏳ 限流等待 {:.1} 秒", wait_time.as_secs_f64());
                sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }

    /// 上一次记录的调用时间
    pub async fn last_dispatch_at(&self) -> Option<Instant> {
        *self.last_dispatch_at.lock().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_first_call_does_not_wait() {
        let throttle = Throttle::new();
        tokio_test::block_on(async {
            assert!(throttle.last_dispatch_at().await.is_none());
            throttle.wait(Duration::from_secs(3600)).await;
            assert!(throttle.last_dispatch_at().await.is_some());
        });
    }

    #[tokio::test(start_paused = true)]
    async fn test_consecutive_calls_are_spaced() {
        let throttle = Throttle::new();
        let interval = Duration::from_secs(12);

        let start = Instant::now();
        throttle.wait(interval).await;
        throttle.wait(interval).await;
        throttle.wait(interval).await;

        assert!(start.elapsed() >= Duration::from_secs(24));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_wait_after_interval_has_passed() {
        let throttle = Throttle::new();
        let interval = Duration::from_secs(12);

        throttle.wait(interval).await;
        sleep(Duration::from_secs(20)).await;

        let before = Instant::now();
        throttle.wait(interval).await;
        assert_eq!(before.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_are_serialized() {
        let throttle = Arc::new(Throttle::new());
        let interval = Duration::from_secs(12);
        let stamps = Arc::new(std::sync::Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let throttle = throttle.clone();
            let stamps = stamps.clone();
            handles.push(tokio::spawn(async move {
                throttle.wait(interval).await;
                stamps.lock().unwrap().push(Instant::now());
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let mut stamps = stamps.lock().unwrap().clone();
        stamps.sort();
        assert_eq!(stamps.len(), 4);
        for pair in stamps.windows(2) {
            assert!(pair[1] - pair[0] >= interval);
        }
    }
}
