//! Retrieval-augmented generation core: loaders, chunking, the vector
//! index, history-aware query rewriting, and the answer pipeline.

pub mod chunker;
pub mod loader;
pub mod pipeline;
pub mod rewriter;
pub mod sqlite;
pub mod store;

pub use chunker::{split_documents, Chunk};
pub use loader::{load_documents, Document, LoadOutcome, StagedFile};
pub use pipeline::{ChatAnswer, Citation, RagPipeline, NO_DOCUMENTS_MESSAGE};
pub use sqlite::SqliteVectorStore;
pub use store::{EmbeddingRecord, PassageMatch, StoredPassage, VectorStore};
