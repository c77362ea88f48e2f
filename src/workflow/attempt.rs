//! 单次调用执行器
//!
//! 执行一次有时限的上游调用，并把结果归类为 `AttemptOutcome`

use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

use crate::services::Answerer;

/// 单次调用的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// 成功，文本已去除首尾空白
    Success(String),
    /// 超过单次调用时限
    TimedOut,
    /// 配额耗尽 / 服务暂不可用，可以等待后重试
    Transient(String),
    /// 其他错误，不重试
    Fatal(String),
}

impl AttemptOutcome {
    /// 用于日志的简短名称
    pub fn label(&self) -> &'static str {
        match self {
            AttemptOutcome::Success(_) => "成功",
            AttemptOutcome::TimedOut => "超时",
            AttemptOutcome::Transient(_) => "限流/暂不可用",
            AttemptOutcome::Fatal(_) => "致命错误",
        }
    }
}

/// 单次调用执行器
///
/// 不修改限流状态，也不计算重试次数。
#[derive(Clone)]
pub struct AttemptRunner {
    answerer: Arc<dyn Answerer>,
    timeout: Duration,
}

impl AttemptRunner {
    pub fn new(answerer: Arc<dyn Answerer>, timeout: Duration) -> Self {
        Self { answerer, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// 执行一次调用
    ///
    /// 超时后内部的 future 会被直接丢弃，底层请求随之取消，不会在后台继续运行。
    pub async fn run(&self, query: &str) -> AttemptOutcome {
        match timeout(self.timeout, self.answerer.ask(query)).await {
            Ok(Ok(text)) => AttemptOutcome::Success(text.trim().to_string()),
            Ok(Err(e)) if e.is_transient() => {
                debug!("上游暂时性错误 ({:?}): {}", e.kind, e.message);
                AttemptOutcome::Transient(e.message)
            }
            Ok(Err(e)) => AttemptOutcome::Fatal(e.message),
            Err(_) => AttemptOutcome::TimedOut,
        }
    }
}
