pub mod attempt;
pub mod backoff;
pub mod question_ctx;
pub mod retry_loop;

pub use attempt::{AttemptOutcome, AttemptRunner};
pub use backoff::BackoffPolicy;
pub use question_ctx::QuestionCtx;
pub use retry_loop::{RetryLoop, TerminalError, ERROR_PREFIX};
