pub mod answerer;
pub mod llm_answerer;
pub mod warn_writer;

pub use answerer::{AnswerError, AnswerErrorKind, Answerer};
pub use llm_answerer::LlmAnswerer;
pub use warn_writer::WarnWriter;
