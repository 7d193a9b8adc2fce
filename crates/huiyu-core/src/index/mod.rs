//! Indexing pipeline
//!
//! Corpus scanning, parent/child chunking and embedding.

mod chunker;
mod ingest;
mod scanner;

pub use chunker::*;
pub use ingest::*;
pub use scanner::*;
