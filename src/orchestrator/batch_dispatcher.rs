//! 批量问题调度器 - 编排层
//!
//! ## 职责
//!
//! 1. **顺序处理**：严格按输入顺序逐个处理问题（全局限流器决定了不做并发）
//! 2. **故障隔离**：单个问题失败不会中断整批，总是继续处理下一个
//! 3. **位置对齐**：输出答案与输入问题一一对应
//! 4. **取消 / 总时限**：取消后剩余问题直接得到取消答案

use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use crate::models::{Answer, Question};
use crate::services::WarnWriter;
use crate::utils::logging::{log_batch_complete, log_batch_start, log_question_start};
use crate::workflow::{QuestionCtx, RetryLoop, TerminalError};

/// 批量问题调度器
pub struct BatchDispatcher {
    retry_loop: RetryLoop,
    batch_deadline: Option<Duration>,
    warn_writer: Option<WarnWriter>,
}

impl BatchDispatcher {
    pub fn new(retry_loop: RetryLoop) -> Self {
        Self {
            retry_loop,
            batch_deadline: None,
            warn_writer: None,
        }
    }

    /// 设置整批的总时限
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.batch_deadline = deadline;
        self
    }

    /// 将失败的问题写入 warn 文件
    pub fn with_warn_writer(mut self, writer: WarnWriter) -> Self {
        self.warn_writer = Some(writer);
        self
    }

    /// 处理一批问题，返回与输入位置对齐的答案
    pub async fn run(
        &self,
        batch_id: u64,
        questions: &[Question],
        cancel: &CancellationToken,
    ) -> Vec<Answer> {
        let total = questions.len();
        let started = Instant::now();
        log_batch_start(batch_id, total);

        let batch_token = cancel.child_token();
        let deadline_timer = self.batch_deadline.map(|deadline| {
            let token = batch_token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(deadline).await;
                warn!(
                    "⌛ 批次 #{} 超过总时限 {:.1} 秒，放弃剩余问题",
                    batch_id,
                    deadline.as_secs_f64()
                );
                token.cancel();
            })
        });

        let mut answers = Vec::with_capacity(total);
        let mut failed = 0;

        for (position, question) in questions.iter().enumerate() {
            let ctx = QuestionCtx::new(batch_id, position, total);

            let answer = if batch_token.is_cancelled() {
                Answer::error(question.index, TerminalError::Cancelled.to_string())
            } else {
                log_question_start(&ctx, &question.text);
                self.retry_loop.resolve(question, &ctx, &batch_token).await
            };

            if answer.is_error {
                failed += 1;
                self.record_failure(batch_id, question, &answer).await;
            }
            answers.push(answer);
        }

        if let Some(timer) = deadline_timer {
            timer.abort();
        }

        if batch_token.is_cancelled() {
            warn!("🛑 批次 #{} 已被取消，未完成的问题已标记为错误", batch_id);
        }

        log_batch_complete(batch_id, total - failed, failed, started.elapsed());
        answers
    }

    async fn record_failure(&self, batch_id: u64, question: &Question, answer: &Answer) {
        if let Some(writer) = &self.warn_writer {
            if let Err(e) = writer
                .write(batch_id, question.index, &question.text, &answer.text)
                .await
            {
                error!("写入失败记录出错: {}", e);
            }
        }
    }
}
