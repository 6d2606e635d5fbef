//! Knowledge base domain - Registries of documents and retrieval over them

mod registry;
mod retrieval;

pub use registry::{KnowledgeBase, KnowledgeBaseRegistry};
pub use retrieval::{PASSAGE_SEPARATOR, RetrievalProvider};

#[cfg(test)]
pub use retrieval::mock::MockRetrievalProvider;
