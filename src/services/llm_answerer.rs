//! LLM 问答服务 - 业务能力层
//!
//! 基于文档回答单个问题，不关心限流和重试
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 兼容 OpenAI API 的服务（默认使用 Gemini 的 OpenAI 兼容端点）

use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    error::{ApiError, OpenAIError},
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, LlmError};
use crate::services::answerer::{AnswerError, Answerer};

/// LLM 问答服务
///
/// 职责：
/// - 绑定一个文档引用，回答关于该文档的问题
/// - 把上游错误转换为结构化的 `AnswerError`
/// - 只处理单个问题
pub struct LlmAnswerer {
    client: Client<OpenAIConfig>,
    model_name: String,
    system_message: String,
}

impl LlmAnswerer {
    /// 创建绑定到指定文档的问答服务
    pub fn for_document(config: &Config, documents: &str) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        // 重试与退避由调度层统一负责，客户端内部不再重试
        let no_retry = backoff::ExponentialBackoff {
            max_elapsed_time: Some(Duration::ZERO),
            ..Default::default()
        };

        Self {
            client: Client::with_config(openai_config).with_backoff(no_retry),
            model_name: config.llm_model_name.clone(),
            system_message: build_system_message(documents),
        }
    }

    fn build_messages(&self, query: &str) -> AppResult<Vec<ChatCompletionRequestMessage>> {
        let system_msg = ChatCompletionRequestSystemMessageArgs::default()
            .content(self.system_message.as_str())
            .build()
            .map_err(|e| AppError::llm_request_failed(&self.model_name, e.to_string()))?;
        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(query)
            .build()
            .map_err(|e| AppError::llm_request_failed(&self.model_name, e.to_string()))?;

        Ok(vec![
            ChatCompletionRequestMessage::System(system_msg),
            ChatCompletionRequestMessage::User(user_msg),
        ])
    }
}

#[async_trait]
impl Answerer for LlmAnswerer {
    async fn ask(&self, query: &str) -> Result<String, AnswerError> {
        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!("问题长度: {} 字符", query.len());

        let messages = self
            .build_messages(query)
            .map_err(|e| AnswerError::other(e.to_string()))?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .temperature(0.2)
            .build()
            .map_err(|e| {
                AnswerError::other(
                    AppError::llm_request_failed(&self.model_name, e.to_string()).to_string(),
                )
            })?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            classify_openai_error(&e)
        })?;

        debug!("LLM API 调用成功");

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| {
                AnswerError::other(
                    AppError::Llm(LlmError::EmptyContent {
                        model: self.model_name.clone(),
                    })
                    .to_string(),
                )
            })?;

        Ok(content.trim().to_string())
    }
}

/// 构建系统消息，把文档引用交给模型
fn build_system_message(documents: &str) -> String {
    format!(
        "You answer questions about the document at {}. \
         Answer only from the document's content; if it does not contain the answer, say so.",
        documents
    )
}

/// 将 async-openai 的错误映射为结构化错误类别
///
/// 优先使用响应里的结构化字段（`code` / `type` / HTTP 状态），只有在缺失时才匹配文本
fn classify_openai_error(err: &OpenAIError) -> AnswerError {
    match err {
        OpenAIError::ApiError(api) => classify_api_error(api),
        OpenAIError::Reqwest(e) => match e.status().map(|s| s.as_u16()) {
            Some(429) => AnswerError::quota_exhausted(e.to_string()),
            Some(503) => AnswerError::unavailable(e.to_string()),
            _ => AnswerError::classify(e.to_string()),
        },
        // 非标准错误体（例如 Gemini 的数组形式 429）只能从原始内容判断
        OpenAIError::JSONDeserialize(_, content) => AnswerError::classify(content.as_str()),
        other => AnswerError::classify(other.to_string()),
    }
}

fn classify_api_error(api: &ApiError) -> AnswerError {
    let fields = [api.code.as_deref(), api.r#type.as_deref()];
    let has = |names: &[&str]| {
        fields
            .iter()
            .flatten()
            .any(|f| names.iter().any(|n| f.eq_ignore_ascii_case(n)))
    };

    if has(&[
        "429",
        "rate_limit_exceeded",
        "rate_limit_error",
        "insufficient_quota",
        "resource_exhausted",
        "requests",
        "tokens",
    ]) {
        AnswerError::quota_exhausted(api.message.clone())
    } else if has(&["503", "unavailable", "server_error", "overloaded_error"]) {
        AnswerError::unavailable(api.message.clone())
    } else if api.code.is_none() && api.r#type.is_none() && api.param.is_none() {
        // 5xx 响应没有结构化字段，async-openai 只保留原始响应体
        AnswerError::unavailable(api.message.clone())
    } else {
        AnswerError::classify(api.message.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::answerer::AnswerErrorKind;
    use crate::workflow::{AttemptOutcome, AttemptRunner};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    #[test]
    fn test_system_message_mentions_document() {
        let msg = build_system_message("https://example.com/policy.pdf");
        assert!(msg.contains("https://example.com/policy.pdf"));
    }

    #[test]
    fn test_build_messages() {
        let answerer = LlmAnswerer::for_document(&Config::default(), "doc.pdf");
        let messages = answerer.build_messages("What is covered?").unwrap();
        assert_eq!(messages.len(), 2);
        assert!(matches!(messages[0], ChatCompletionRequestMessage::System(_)));
        assert!(matches!(messages[1], ChatCompletionRequestMessage::User(_)));
    }

    #[test]
    fn test_invalid_argument_is_fatal() {
        let err = classify_openai_error(&OpenAIError::InvalidArgument("bad doc".to_string()));
        assert_eq!(err.kind, AnswerErrorKind::Other);
    }

    fn api_error(r#type: Option<&str>, code: Option<&str>) -> OpenAIError {
        OpenAIError::ApiError(ApiError {
            message: "upstream said no".to_string(),
            r#type: r#type.map(str::to_string),
            param: None,
            code: code.map(str::to_string),
        })
    }

    #[test]
    fn test_api_error_uses_structured_fields() {
        let quota = classify_openai_error(&api_error(Some("insufficient_quota"), None));
        assert_eq!(quota.kind, AnswerErrorKind::QuotaExhausted);

        let limited = classify_openai_error(&api_error(None, Some("rate_limit_exceeded")));
        assert_eq!(limited.kind, AnswerErrorKind::QuotaExhausted);

        let server = classify_openai_error(&api_error(Some("server_error"), None));
        assert_eq!(server.kind, AnswerErrorKind::Unavailable);

        let invalid = classify_openai_error(&api_error(
            Some("invalid_request_error"),
            Some("model_not_found"),
        ));
        assert_eq!(invalid.kind, AnswerErrorKind::Other);
        assert_eq!(invalid.message, "upstream said no");
    }

    #[test]
    fn test_bare_server_error_body_is_unavailable() {
        let err = classify_openai_error(&api_error(None, None));
        assert_eq!(err.kind, AnswerErrorKind::Unavailable);
    }

    #[test]
    fn test_non_standard_body_falls_back_to_text() {
        let body = r#"[{"error":{"code":429,"status":"RESOURCE_EXHAUSTED"}}]"#;
        let parse_err = serde_json::from_str::<u8>("x").unwrap_err();
        let err = classify_openai_error(&OpenAIError::JSONDeserialize(parse_err, body.to_string()));
        assert_eq!(err.kind, AnswerErrorKind::QuotaExhausted);
    }

    /// 本地假服务：记录请求次数，并对每个请求返回固定的 HTTP 响应
    async fn spawn_fixed_upstream(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(AtomicUsize::new(0));
        let counter = requests.clone();

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let counter = counter.clone();
                tokio::spawn(async move {
                    if read_request(&mut socket).await.is_none() {
                        return;
                    }
                    counter.fetch_add(1, Ordering::SeqCst);
                    let response = format!(
                        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status_line,
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        (format!("http://{}/v1", addr), requests)
    }

    /// 读完一个请求（头部 + Content-Length 指定的请求体）
    async fn read_request(socket: &mut TcpStream) -> Option<()> {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.ok()?;
            if n == 0 {
                return None;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= header_end + 4 + content_length {
                    return Some(());
                }
            }
        }
    }

    fn config_for(base_url: String) -> Config {
        Config {
            llm_api_key: "test-key".to_string(),
            llm_api_base_url: base_url,
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_rate_limited_upstream_is_called_once() {
        let (base_url, requests) = spawn_fixed_upstream(
            "429 Too Many Requests",
            r#"{"error":{"message":"RESOURCE_EXHAUSTED: quota","type":"rate_limit_error","param":null,"code":"429"}}"#,
        )
        .await;

        let answerer = Arc::new(LlmAnswerer::for_document(&config_for(base_url), "doc.pdf"));
        let runner = AttemptRunner::new(answerer, Duration::from_secs(5));
        let outcome = runner.run("q").await;

        assert!(
            matches!(outcome, AttemptOutcome::Transient(_)),
            "unexpected outcome: {}",
            outcome.label()
        );
        assert_eq!(requests.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unavailable_upstream_is_called_once() {
        let (base_url, requests) =
            spawn_fixed_upstream("503 Service Unavailable", "Service Unavailable").await;

        let answerer = LlmAnswerer::for_document(&config_for(base_url), "doc.pdf");
        let err = answerer.ask("q").await.unwrap_err();

        assert_eq!(err.kind, AnswerErrorKind::Unavailable);
        assert_eq!(requests.load(Ordering::SeqCst), 1);
    }

    /// 真实 API 连通性测试
    ///
    /// 运行方式：
    /// ```bash
    /// LLM_API_KEY=... cargo test test_llm_answerer_live -- --ignored --nocapture
    /// ```
    #[tokio::test]
    #[ignore]
    async fn test_llm_answerer_live() {
        let _ = tracing_subscriber::fmt::try_init();

        let config = Config::from_env();
        let answerer = LlmAnswerer::for_document(&config, "https://example.com/policy.pdf");

        match answerer.ask("What is this document about?").await {
            Ok(answer) => {
                println!("LLM 响应: {}", answer);
                assert!(!answer.is_empty());
            }
            Err(e) => panic!("LLM 调用失败 ({:?}): {}", e.kind, e),
        }
    }
}
