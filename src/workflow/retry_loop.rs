//! 单个问题的重试流程 - 流程层
//!
//! 核心职责：定义"一个问题"从排队到得出最终答案的完整流程
//!
//! 流程顺序：
//! 1. 限流等待（Throttle）
//! 2. 单次调用（AttemptRunner）
//! 3. 失败时按退避策略等待，然后回到 1
//! 4. 成功、致命错误或用完尝试次数时产出最终答案
//!
//! 本流程不会向外返回错误：任何退出路径都产出一个 `Answer`。

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::DispatchConfig;
use crate::infrastructure::Throttle;
use crate::models::{Answer, Question};
use crate::services::Answerer;
use crate::workflow::attempt::{AttemptOutcome, AttemptRunner};
use crate::workflow::backoff::BackoffPolicy;
use crate::workflow::question_ctx::QuestionCtx;

/// 所有错误答案的统一前缀
pub const ERROR_PREFIX: &str = "Error: ";

/// 问题的最终失败原因
///
/// `Display` 输出即为返回给调用方的错误答案文本，统一以 `ERROR_PREFIX` 开头。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TerminalError {
    /// 所有尝试均超时
    #[error("Error: Request timed out after {} seconds", .timeout.as_secs_f64())]
    TimedOut { timeout: Duration },
    /// 限流 / 暂不可用，重试次数用尽
    #[error("Error: Upstream rate limit exceeded. Please try again later.")]
    RateLimited,
    /// 不可重试的错误
    #[error("Error: {0}")]
    Fatal(String),
    /// 被取消（客户端断开或批次超时）
    #[error("Error: Request cancelled before an answer was produced")]
    Cancelled,
    /// 兜底：尝试次数用尽但没有可归类的失败
    #[error("Error: All retry attempts failed")]
    Exhausted,
}

impl TerminalError {
    fn from_outcome(outcome: &AttemptOutcome, timeout: Duration) -> Self {
        match outcome {
            AttemptOutcome::TimedOut => TerminalError::TimedOut { timeout },
            AttemptOutcome::Transient(_) => TerminalError::RateLimited,
            AttemptOutcome::Fatal(reason) => TerminalError::Fatal(reason.clone()),
            AttemptOutcome::Success(_) => TerminalError::Exhausted,
        }
    }
}

/// 单个问题的重试流程
///
/// - 每次尝试前都经过全局限流器
/// - 只依赖能力（Throttle / AttemptRunner / BackoffPolicy），不持有批次数据
#[derive(Clone)]
pub struct RetryLoop {
    throttle: Arc<Throttle>,
    runner: AttemptRunner,
    backoff: BackoffPolicy,
    min_interval: Duration,
    max_attempts: usize,
}

impl RetryLoop {
    pub fn new(
        throttle: Arc<Throttle>,
        runner: AttemptRunner,
        backoff: BackoffPolicy,
        min_interval: Duration,
        max_attempts: usize,
    ) -> Self {
        Self {
            throttle,
            runner,
            backoff,
            min_interval,
            max_attempts: max_attempts.max(1),
        }
    }

    /// 根据调度配置创建
    pub fn from_config(
        config: &DispatchConfig,
        throttle: Arc<Throttle>,
        answerer: Arc<dyn Answerer>,
    ) -> Self {
        Self::new(
            throttle,
            AttemptRunner::new(answerer, config.per_attempt_timeout),
            BackoffPolicy::from_config(config),
            config.min_interval,
            config.max_attempts,
        )
    }

    /// 为一个问题求出最终答案
    ///
    /// 三个挂起点（限流等待、调用、退避等待）都会响应 `cancel`；
    /// 取消时正在进行的调用被直接丢弃。
    pub async fn resolve(
        &self,
        question: &Question,
        ctx: &QuestionCtx,
        cancel: &CancellationToken,
    ) -> Answer {
        let mut attempts_used = 0;

        loop {
            // Throttling
            if until_cancelled(cancel, self.throttle.wait(self.min_interval))
                .await
                .is_none()
            {
                return self.cancelled(question, ctx);
            }

            // InFlight
            let Some(outcome) = until_cancelled(cancel, self.runner.run(&question.text)).await
            else {
                return self.cancelled(question, ctx);
            };

            if let AttemptOutcome::Success(text) = outcome {
                if attempts_used > 0 {
                    info!("{} ✓ 第 {} 次尝试成功", ctx, attempts_used + 1);
                } else {
                    info!("{} ✓ 回答成功", ctx);
                }
                return Answer::success(question.index, text);
            }

            let is_last_attempt = attempts_used + 1 >= self.max_attempts;
            let delay = if is_last_attempt {
                None
            } else {
                self.backoff.next_delay(&outcome, attempts_used)
            };

            let Some(delay) = delay else {
                let terminal = TerminalError::from_outcome(&outcome, self.runner.timeout());
                error!(
                    "{} ❌ {} (尝试 {}/{}): {}",
                    ctx,
                    outcome.label(),
                    attempts_used + 1,
                    self.max_attempts,
                    terminal
                );
                return Answer::error(question.index, terminal.to_string());
            };

            // Backoff
            warn!(
                "{} ⚠️ {} (尝试 {}/{}), 等待 {:.1} 秒后重试...",
                ctx,
                outcome.label(),
                attempts_used + 1,
                self.max_attempts,
                delay.as_secs_f64()
            );
            if until_cancelled(cancel, sleep(delay)).await.is_none() {
                return self.cancelled(question, ctx);
            }
            attempts_used += 1;
        }
    }

    fn cancelled(&self, question: &Question, ctx: &QuestionCtx) -> Answer {
        warn!("{} 🛑 已取消", ctx);
        Answer::error(question.index, TerminalError::Cancelled.to_string())
    }
}

/// 运行 `fut`，在 `cancel` 被触发时放弃并返回 `None`
async fn until_cancelled<F: Future>(cancel: &CancellationToken, fut: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        out = fut => Some(out),
    }
}
