//! Two-stage retrieval-and-answering core for Australian tax Q&A.
//!
//! Pipeline: embedding-index search over a pre-built corpus, optional
//! cross-encoder reranking, confidence scoring, then a streamed answer that
//! appends formatted source citations after generation completes. Everything
//! upstream (crawling, chunking, index building) and downstream (HTTP
//! transport, auth) lives outside this crate.

pub mod answer;
pub mod confidence;
pub mod corpus;
pub mod embeddings;
pub mod llm;
pub mod ollama;
pub mod rerank;
pub mod retrieve;
pub mod service;

pub use answer::AnswerStream;
pub use retrieve::{Candidate, RetrievalResult};
pub use service::RagService;
