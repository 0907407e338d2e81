//! Vector Store (spec §4.4): per-repo collections for {code_chunks,
//! docstrings, commits, document_chunks, summaries}, filtered search,
//! hierarchical retrieval, and the Embedding Cache that fronts every write.

pub mod ai;
pub mod cache;
pub mod in_memory;
pub mod ports;
pub mod qdrant;

pub use ai::OllamaAiProvider;
pub use cache::{CacheStats, EmbeddingCache};
pub use in_memory::InMemoryVectorStore;
pub use ports::{
    SearchFilter, SearchHit, VectorStore, ALL_COLLECTIONS, COLLECTION_CODE_CHUNKS,
    COLLECTION_COMMITS, COLLECTION_DOCSTRINGS, COLLECTION_DOCUMENT_CHUNKS, COLLECTION_SUMMARIES,
};
pub use qdrant::QdrantVectorStore;
