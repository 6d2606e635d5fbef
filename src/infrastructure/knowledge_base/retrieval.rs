//! In-memory retrieval over chunked documents
//!
//! Ranking is by query-term overlap, which is enough for local runs and
//! tests. Production deployments plug in a vector store behind the same trait.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::domain::DomainError;
use crate::domain::knowledge_base::{PASSAGE_SEPARATOR, RetrievalProvider};

/// Characters per stored chunk
pub const DEFAULT_CHUNK_SIZE: usize = 500;

#[derive(Debug, Clone)]
struct Chunk {
    document_id: String,
    text: String,
    terms: HashSet<String>,
}

#[derive(Debug)]
pub struct InMemoryRetrievalProvider {
    chunks: RwLock<Vec<Chunk>>,
    chunk_size: usize,
}

impl Default for InMemoryRetrievalProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRetrievalProvider {
    pub fn new() -> Self {
        Self::with_chunk_size(DEFAULT_CHUNK_SIZE)
    }

    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            chunks: RwLock::new(Vec::new()),
            chunk_size: chunk_size.max(1),
        }
    }

    /// Index a document, replacing any previous content under the same id.
    /// Returns the number of chunks stored.
    pub async fn add_text(&self, document_id: &str, text: &str) -> usize {
        let chars: Vec<char> = text.chars().collect();
        let new_chunks: Vec<Chunk> = chars
            .chunks(self.chunk_size)
            .map(|part| {
                let text: String = part.iter().collect();
                Chunk {
                    document_id: document_id.to_string(),
                    terms: terms(&text),
                    text,
                }
            })
            .collect();

        let count = new_chunks.len();
        let mut chunks = self.chunks.write().await;
        chunks.retain(|c| c.document_id != document_id);
        chunks.extend(new_chunks);

        debug!(document_id = %document_id, chunks = count, "Indexed document");
        count
    }

    /// Index every regular file in a directory under its file name
    pub async fn load_dir(&self, dir: &Path) -> Result<usize, DomainError> {
        let mut entries = tokio::fs::read_dir(dir).await.map_err(|e| {
            DomainError::knowledge_base(format!("Cannot read {}: {}", dir.display(), e))
        })?;

        let mut documents = 0;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| DomainError::knowledge_base(e.to_string()))?
        {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };

            match tokio::fs::read_to_string(&path).await {
                Ok(text) => {
                    self.add_text(name, &text).await;
                    documents += 1;
                }
                Err(e) => debug!(path = %path.display(), error = %e, "Skipping unreadable document"),
            }
        }

        info!(dir = %dir.display(), documents, "Loaded retrieval documents");
        Ok(documents)
    }

    pub async fn remove(&self, document_id: &str) {
        self.chunks
            .write()
            .await
            .retain(|c| c.document_id != document_id);
    }
}

fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

#[async_trait]
impl RetrievalProvider for InMemoryRetrievalProvider {
    async fn query(
        &self,
        query: &str,
        document_ids: &[String],
        top_k: usize,
    ) -> Result<String, DomainError> {
        if document_ids.is_empty() || top_k == 0 {
            return Ok(String::new());
        }

        let allowed: HashSet<&str> = document_ids.iter().map(String::as_str).collect();
        let query_terms = terms(query);
        let chunks = self.chunks.read().await;

        let mut scored: Vec<(usize, usize)> = chunks
            .iter()
            .enumerate()
            .filter(|(_, c)| allowed.contains(c.document_id.as_str()))
            .map(|(i, c)| (i, c.terms.intersection(&query_terms).count()))
            .filter(|(_, score)| *score > 0)
            .collect();

        // Highest overlap first; indexing order breaks ties
        scored.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        let passages: Vec<&str> = scored
            .into_iter()
            .take(top_k)
            .map(|(i, _)| chunks[i].text.as_str())
            .collect();

        Ok(passages.join(PASSAGE_SEPARATOR))
    }
}

/// Chunk counts per document, for diagnostics
pub async fn chunk_counts(provider: &InMemoryRetrievalProvider) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for chunk in provider.chunks.read().await.iter() {
        *counts.entry(chunk.document_id.clone()).or_insert(0) += 1;
    }
    counts
}
