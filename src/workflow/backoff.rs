//! 退避策略
//!
//! 纯函数：相同的结果类别和尝试序号总是得到相同的等待时间

use std::time::Duration;

use crate::config::DispatchConfig;
use crate::workflow::attempt::AttemptOutcome;

/// 退避策略
///
/// - 超时：固定等待 `timeout_backoff`
/// - 限流/暂不可用：线性退避 `transient_base * (attempt_index + 1)`
/// - 致命错误：不重试
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub timeout_backoff: Duration,
    pub transient_base: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from_config(&DispatchConfig::default())
    }
}

impl BackoffPolicy {
    pub fn from_config(config: &DispatchConfig) -> Self {
        Self {
            timeout_backoff: config.timeout_backoff,
            transient_base: config.transient_backoff_base,
        }
    }

    /// 计算下一次重试前的等待时间，`None` 表示不再重试
    ///
    /// `attempt_index` 为刚刚失败的那次尝试的序号（从 0 开始）。
    pub fn next_delay(&self, outcome: &AttemptOutcome, attempt_index: usize) -> Option<Duration> {
        match outcome {
            AttemptOutcome::TimedOut => Some(self.timeout_backoff),
            AttemptOutcome::Transient(_) => {
                let factor = u32::try_from(attempt_index + 1).unwrap_or(u32::MAX);
                Some(self.transient_base.saturating_mul(factor))
            }
            AttemptOutcome::Fatal(_) | AttemptOutcome::Success(_) => None,
        }
    }
}
