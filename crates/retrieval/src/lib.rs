//! Retrieval pipeline for the portfolio assistant.
//!
//! Ingestion: `documents -> chunking -> Embedder -> EmbeddedChunk corpus`.
//! Query: `query -> Embedder -> search over the corpus -> context assembly`.
//!
//! The corpus is owned by the caller. Every function here only borrows it,
//! so concurrent queries over one [`CorpusSnapshot`] need no locking; the
//! caller must not mutate a corpus slice while a query over it is running.

pub mod chunking;
pub mod config;
pub mod context;
pub mod corpus;
pub mod errors;
pub mod ingestion;
pub mod query;
pub mod search;
pub mod types;

pub use chunking::{build_chunks_from_documents, chunk_text, normalize_whitespace, ChunkingOptions};
pub use config::RetrievalConfig;
pub use context::{build_context_from_chunks, render_block, AssembledContext, ContextOptions};
pub use corpus::{CorpusHandle, CorpusSnapshot};
pub use errors::{Result, RetrievalError};
pub use ingestion::{ingest_documents, IngestOptions};
pub use query::{build_query_context, prepare_query, query_context, query_context_multi, QueryOptions};
pub use search::{
    cosine_similarity, cosine_similarity_checked, merge_retrieval_results, retrieve_top_k,
    SearchOptions,
};
pub use types::{
    Chunk, Document, EmbeddedChunk, Metadata, QueryPreparation, RetrievedChunk, SourceType,
    VectorStoreItem,
};
