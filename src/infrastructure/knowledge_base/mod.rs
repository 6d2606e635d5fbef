//! Knowledge base registry and retrieval implementations

mod registry;
mod retrieval;

pub use registry::InMemoryKnowledgeBaseRegistry;
pub use retrieval::{DEFAULT_CHUNK_SIZE, InMemoryRetrievalProvider, chunk_counts};
