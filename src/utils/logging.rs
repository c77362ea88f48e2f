/// 日志工具模块
///
/// 提供日志初始化和格式化输出的辅助函数
use crate::config::Config;
use crate::workflow::QuestionCtx;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化 tracing 日志
///
/// 优先使用 `RUST_LOG`，否则根据 `verbose` 选择 debug / info 级别。
/// 重复调用是安全的（测试中可能多次初始化）。
pub fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    let d = &config.dispatch;
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 文档问答批量调度模式");
    info!(
        "⏱️ 最小调用间隔: {:.1} 秒 | 单次超时: {:.1} 秒 | 最多尝试: {} 次",
        d.min_interval.as_secs_f64(),
        d.per_attempt_timeout.as_secs_f64(),
        d.max_attempts
    );
    if let Some(deadline) = d.batch_deadline {
        info!("⌛ 批次总时限: {:.1} 秒", deadline.as_secs_f64());
    }
    info!("🤖 模型: {}", config.llm_model_name);
    info!("{}", "=".repeat(60));
}

/// 记录批次开始信息
pub fn log_batch_start(batch_id: u64, total: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始处理批次 #{}，共 {} 个问题", batch_id, total);
    info!("{}", "=".repeat(60));
}

/// 记录单个问题开始处理
pub fn log_question_start(ctx: &QuestionCtx, text: &str) {
    info!("{} 正在处理: {}", ctx, truncate_text(text, 50));
}

/// 记录批次完成信息
pub fn log_batch_complete(batch_id: u64, success: usize, failed: usize, elapsed: Duration) {
    info!("\n{}", "─".repeat(60));
    info!(
        "✓ 批次 #{} 完成: 成功 {}/{}，失败 {}，耗时 {:.1} 秒",
        batch_id,
        success,
        success + failed,
        failed,
        elapsed.as_secs_f64()
    );
    info!("{}", "─".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大字符数
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("short", 50), "short");
        assert_eq!(truncate_text("abcdef", 3), "abc...");
        // 按字符而不是字节截断
        assert_eq!(truncate_text("中文问题测试", 2), "中文...");
    }

    #[test]
    fn test_init_tracing_twice() {
        init_tracing(false);
        init_tracing(true);
    }
}
