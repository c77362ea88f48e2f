//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `app` - 应用入口
//! - 持有全局限流器
//! - 对外暴露批量问答入口
//! - 文件驱动的运行方式（TOML 输入，JSON 输出）
//!
//! ### `batch_dispatcher` - 批量问题调度器
//! - 按顺序处理 `Vec<Question>`
//! - 隔离单个问题的失败
//! - 处理取消和批次总时限
//!
//! ## 层次关系
//!
//! ```text
//! app (批量入口)
//!     ↓
//! batch_dispatcher (处理 Vec<Question>)
//!     ↓
//! workflow::RetryLoop (处理单个 Question)
//!     ↓
//! services (能力层：Answerer / WarnWriter)
//!     ↓
//! infrastructure (基础设施：Throttle)
//! ```

pub mod app;
pub mod batch_dispatcher;

// 重新导出主要类型
pub use app::App;
pub use batch_dispatcher::BatchDispatcher;
