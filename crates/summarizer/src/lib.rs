pub mod context;
pub mod http_llm;
pub mod llm;
pub mod sweep;

pub use context::build_conversation;
pub use http_llm::HttpNamingModel;
pub use llm::{NamingModel, ThreadNaming};
pub use sweep::{SweepSummary, ThreadSummarizer};
