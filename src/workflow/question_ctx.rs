//! 问题处理上下文
//!
//! 封装"我正在处理哪个批次的第几个问题"这一信息

use std::fmt::Display;

/// 问题处理上下文（仅用于日志显示）
#[derive(Debug, Clone, Copy)]
pub struct QuestionCtx {
    /// 批次编号
    pub batch_id: u64,

    /// 问题在批次中的索引（从0开始）
    pub question_index: usize,

    /// 批次中的问题总数
    pub total: usize,
}

impl QuestionCtx {
    pub fn new(batch_id: u64, question_index: usize, total: usize) -> Self {
        Self {
            batch_id,
            question_index,
            total,
        }
    }
}

impl Display for QuestionCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[批次 #{} 问题 {}/{}]",
            self.batch_id,
            self.question_index + 1,
            self.total
        )
    }
}
