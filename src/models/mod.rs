pub mod loaders;
pub mod question;

pub use loaders::{load_batch_request, write_batch_response};
pub use question::{Answer, BatchRequest, BatchResponse, Question};
