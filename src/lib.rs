//! # Doc QA Dispatch
//!
//! 针对一份文档批量回答自然语言问题的调度器：把每个问题交给外部问答服务，
//! 在全进程共享的限流下逐个调用，每次调用有超时，失败按类别退避重试，
//! 单个问题失败不会影响整批。
//!
//! ## 架构设计
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有唯一的共享可变状态
//! - `Throttle` - 全局最小调用间隔
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个问题
//! - `Answerer` - 问答能力（结构化错误类别）
//! - `LlmAnswerer` - 基于 OpenAI 兼容接口的实现
//! - `WarnWriter` - 写 warn.txt 能力
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个问题"的完整处理流程
//! - `AttemptRunner` - 单次有时限的调用与结果归类
//! - `BackoffPolicy` - 退避时间计算
//! - `RetryLoop` - 限流 → 调用 → 退避 → 重试
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_dispatcher` - 按顺序处理一批问题
//! - `orchestrator/app` - 批量入口与文件驱动运行

pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::{Config, DispatchConfig};
pub use error::{AppError, AppResult};
pub use infrastructure::Throttle;
pub use models::{Answer, BatchRequest, BatchResponse, Question};
pub use orchestrator::{App, BatchDispatcher};
pub use services::{AnswerError, AnswerErrorKind, Answerer, LlmAnswerer};
pub use workflow::{AttemptOutcome, AttemptRunner, BackoffPolicy, RetryLoop, TerminalError};
