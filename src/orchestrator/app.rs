//! 应用入口 - 编排层
//!
//! ## 职责
//!
//! 1. **资源所有者**：持有全进程唯一的 `Throttle`，所有批次共享
//! 2. **批量入口**：`answer(documents, questions)`，供传输层（HTTP 等）调用
//! 3. **文件驱动运行**：从 TOML 读取批量请求，把答案写成 JSON
//!
//! 文档获取、鉴权、请求编解码都在本模块之外完成。

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::infrastructure::Throttle;
use crate::models::{load_batch_request, write_batch_response, BatchResponse, Question};
use crate::orchestrator::batch_dispatcher::BatchDispatcher;
use crate::services::{Answerer, LlmAnswerer, WarnWriter};
use crate::utils::logging::log_startup;
use crate::workflow::RetryLoop;

/// 应用主结构
pub struct App {
    config: Config,
    throttle: Arc<Throttle>,
    next_batch_id: AtomicU64,
}

impl App {
    /// 初始化应用
    pub fn initialize(config: Config) -> Self {
        log_startup(&config);
        Self::new(config)
    }

    /// 创建应用（不输出启动日志）
    pub fn new(config: Config) -> Self {
        Self {
            config,
            throttle: Arc::new(Throttle::new()),
            next_batch_id: AtomicU64::new(1),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 共享的全局限流器
    pub fn throttle(&self) -> Arc<Throttle> {
        self.throttle.clone()
    }

    /// 批量入口：针对文档回答一组问题
    ///
    /// 返回的字符串与 `questions` 一一对应，失败的问题以 `"Error: "` 开头。
    pub async fn answer(
        &self,
        documents: &str,
        questions: Vec<String>,
        cancel: &CancellationToken,
    ) -> Vec<String> {
        let answerer = Arc::new(LlmAnswerer::for_document(&self.config, documents));
        self.answer_with(answerer, questions, cancel).await
    }

    /// 使用指定的问答服务回答一组问题
    pub async fn answer_with(
        &self,
        answerer: Arc<dyn Answerer>,
        questions: Vec<String>,
        cancel: &CancellationToken,
    ) -> Vec<String> {
        let batch_id = self.next_batch_id.fetch_add(1, Ordering::Relaxed);
        let questions = Question::from_texts(questions);

        let retry_loop =
            RetryLoop::from_config(&self.config.dispatch, self.throttle.clone(), answerer);
        let dispatcher = BatchDispatcher::new(retry_loop)
            .with_deadline(self.config.dispatch.batch_deadline)
            .with_warn_writer(WarnWriter::with_path(&self.config.warn_file));

        let answers = dispatcher.run(batch_id, &questions, cancel).await;
        BatchResponse::from(answers).answers
    }

    /// 运行应用主逻辑：读取批量请求文件，回答，写出结果
    pub async fn run(&self, cancel: &CancellationToken) -> Result<BatchResponse> {
        let batch_path = Path::new(&self.config.batch_file);
        info!("📁 正在读取批量请求: {}", batch_path.display());

        let request = load_batch_request(batch_path)
            .await
            .context("加载批量请求失败")?;

        if request.questions.is_empty() {
            warn!("⚠️ 批量请求中没有问题，程序结束");
            return Ok(BatchResponse::default());
        }

        let answers = self
            .answer(&request.documents, request.questions, cancel)
            .await;
        let response = BatchResponse { answers };

        let answers_path = Path::new(&self.config.answers_file);
        write_batch_response(answers_path, &response)
            .await
            .context("写入答案文件失败")?;
        info!("\n答案已保存至: {}", answers_path.display());

        Ok(response)
    }
}
