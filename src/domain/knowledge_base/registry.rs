//! Knowledge base registry: which documents each knowledge base owns

use std::fmt::Debug;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// A knowledge base and the document identifiers it groups
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBase {
    pub id: String,

    #[serde(default)]
    pub name: String,

    /// Identifiers of the documents indexed by the retrieval service
    #[serde(default)]
    pub files: Vec<String>,
}

impl KnowledgeBase {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            files: Vec::new(),
        }
    }

    pub fn with_files(mut self, files: Vec<String>) -> Self {
        self.files = files;
        self
    }
}

#[async_trait]
pub trait KnowledgeBaseRegistry: Send + Sync + Debug {
    /// Look up a knowledge base; `None` when the identifier is unknown
    async fn get(&self, kb_id: &str) -> Result<Option<KnowledgeBase>, DomainError>;

    async fn list(&self) -> Result<Vec<KnowledgeBase>, DomainError>;
}
