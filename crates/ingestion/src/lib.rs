pub mod chunking;
pub mod convert;
pub mod dedupe;
pub mod http_convert;
pub mod job_executor;
pub mod pipeline;

pub use chunking::{chunk_text, ChunkDraft, ChunkingStrategy, SizeClass};
pub use convert::{convert_with_timeout, DocumentConverter, TranscriptProvider, TranscriptService};
pub use dedupe::DuplicateReason;
pub use http_convert::{HttpDocumentConverter, HttpTranscriptProvider};
pub use job_executor::IngestJobExecutor;
pub use pipeline::{IngestInput, IngestItem, IngestItemKind, IngestPipeline, IngestResult, ItemOutcome, SkippedItem};
