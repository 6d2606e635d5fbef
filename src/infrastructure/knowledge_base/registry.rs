//! In-memory knowledge base registry

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::info;

use crate::domain::DomainError;
use crate::domain::knowledge_base::{KnowledgeBase, KnowledgeBaseRegistry};

#[derive(Debug, Default)]
pub struct InMemoryKnowledgeBaseRegistry {
    bases: RwLock<HashMap<String, KnowledgeBase>>,
}

/// Registry file entry; the id defaults to the map key
#[derive(Debug, Deserialize)]
struct RegistryEntry {
    #[serde(default)]
    name: String,
    #[serde(default)]
    files: Vec<String>,
}

impl InMemoryKnowledgeBaseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_knowledge_base(mut self, kb: KnowledgeBase) -> Self {
        self.bases.get_mut().insert(kb.id.clone(), kb);
        self
    }

    pub async fn insert(&self, kb: KnowledgeBase) {
        self.bases.write().await.insert(kb.id.clone(), kb);
    }

    /// Parse a registry document: `{"<kb_id>": {"name": .., "files": [..]}}`
    pub fn from_json(json: &str) -> Result<Self, DomainError> {
        let entries: HashMap<String, RegistryEntry> = serde_json::from_str(json)
            .map_err(|e| DomainError::knowledge_base(format!("Invalid registry: {}", e)))?;

        let bases = entries
            .into_iter()
            .map(|(id, entry)| {
                let kb = KnowledgeBase::new(id.clone(), entry.name).with_files(entry.files);
                (id, kb)
            })
            .collect();

        Ok(Self {
            bases: RwLock::new(bases),
        })
    }

    pub async fn from_file(path: &Path) -> Result<Self, DomainError> {
        let json = tokio::fs::read_to_string(path).await.map_err(|e| {
            DomainError::knowledge_base(format!("Cannot read {}: {}", path.display(), e))
        })?;

        let registry = Self::from_json(&json)?;
        info!(
            path = %path.display(),
            knowledge_bases = registry.bases.read().await.len(),
            "Loaded knowledge base registry"
        );
        Ok(registry)
    }
}

#[async_trait]
impl KnowledgeBaseRegistry for InMemoryKnowledgeBaseRegistry {
    async fn get(&self, kb_id: &str) -> Result<Option<KnowledgeBase>, DomainError> {
        Ok(self.bases.read().await.get(kb_id).cloned())
    }

    async fn list(&self) -> Result<Vec<KnowledgeBase>, DomainError> {
        let mut bases: Vec<KnowledgeBase> = self.bases.read().await.values().cloned().collect();
        bases.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(bases)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_from_json() {
        let registry = InMemoryKnowledgeBaseRegistry::from_json(
            r#"{"kb1": {"id": "kb1", "name": "Docs", "files": ["a.md", "b.md"], "created_at": "2024-01-01 10:00"}}"#,
        )
        .unwrap();

        let kb = registry.get("kb1").await.unwrap().unwrap();
        assert_eq!(kb.name, "Docs");
        assert_eq!(kb.files, vec!["a.md", "b.md"]);
        assert!(registry.get("kb2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_and_list() {
        let registry = InMemoryKnowledgeBaseRegistry::new()
            .with_knowledge_base(KnowledgeBase::new("b", "B"));
        registry.insert(KnowledgeBase::new("a", "A")).await;

        let ids: Vec<String> = registry.list().await.unwrap().into_iter().map(|kb| kb.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_invalid_json() {
        assert!(InMemoryKnowledgeBaseRegistry::from_json("[1, 2]").is_err());
    }
}
