//! 失败记录服务 - 业务能力层
//!
//! 只负责"把失败的问题写入 warn 文件"能力，不关心流程

use crate::error::{AppError, AppResult};
use std::path::PathBuf;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// 失败记录服务
///
/// 职责：
/// - 将最终失败的问题及其错误答案追加到 warn 文件
/// - 只处理单个问题的记录
pub struct WarnWriter {
    warn_file_path: PathBuf,
}

impl WarnWriter {
    /// 使用自定义文件路径创建
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            warn_file_path: path.into(),
        }
    }

    /// 写入一条失败记录
    ///
    /// # 参数
    /// - `batch_id`: 批次编号
    /// - `question_index`: 问题索引（从 0 开始）
    /// - `question`: 问题文本
    /// - `error_answer`: 最终的错误答案
    pub async fn write(
        &self,
        batch_id: u64,
        question_index: usize,
        question: &str,
        error_answer: &str,
    ) -> AppResult<()> {
        debug!(
            "写入失败记录: 批次 {} | 问题 {} | {}",
            batch_id, question_index, error_answer
        );

        let path = self.warn_file_path.display().to_string();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.warn_file_path)
            .await
            .map_err(|e| AppError::file_write_failed(&path, e))?;

        let warn_msg = format!(
            "{} | 批次 {} | 问题 {} | {} | 问题: {}\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            batch_id,
            question_index,
            error_answer,
            question.replace('\n', " ")
        );

        file.write_all(warn_msg.as_bytes())
            .await
            .map_err(|e| AppError::file_write_failed(&path, e))?;
        // tokio 的文件写入在后台线程完成，flush 之后才算落盘
        file.flush()
            .await
            .map_err(|e| AppError::file_write_failed(&path, e))?;

        Ok(())
    }
}
