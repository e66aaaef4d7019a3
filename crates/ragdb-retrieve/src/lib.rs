//! Query-time retrieval and the build pipeline feeding it.
//!
//! `Retriever` answers top-k queries against one immutable index.
//! `KnowledgeBase` owns the active index and rebuilds it from the record source.

pub mod context;
pub mod pipeline;
pub mod report;
pub mod retriever;
pub mod retry;

pub use context::KnowledgeBase;
pub use pipeline::{build_knowledge, BuildOutput};
pub use report::BuildReport;
pub use retriever::{join_context, Retriever};
pub use retry::RetryPolicy;
