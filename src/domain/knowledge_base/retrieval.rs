//! Retrieval over indexed documents

use std::fmt::Debug;

use async_trait::async_trait;

use crate::domain::DomainError;

/// Separator placed between retrieved passages
pub const PASSAGE_SEPARATOR: &str = "\n---\n";

#[async_trait]
pub trait RetrievalProvider: Send + Sync + Debug {
    /// Top `top_k` passages for `query`, restricted to `document_ids`,
    /// joined with [`PASSAGE_SEPARATOR`]
    async fn query(
        &self,
        query: &str,
        document_ids: &[String],
        top_k: usize,
    ) -> Result<String, DomainError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns a fixed answer and records every call
    #[derive(Debug, Default)]
    pub struct MockRetrievalProvider {
        answer: String,
        call_count: AtomicUsize,
        calls: Mutex<Vec<(String, Vec<String>, usize)>>,
    }

    impl MockRetrievalProvider {
        pub fn new(answer: impl Into<String>) -> Self {
            Self {
                answer: answer.into(),
                ..Self::default()
            }
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }

        pub fn calls(&self) -> Vec<(String, Vec<String>, usize)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RetrievalProvider for MockRetrievalProvider {
        async fn query(
            &self,
            query: &str,
            document_ids: &[String],
            top_k: usize,
        ) -> Result<String, DomainError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            self.calls
                .lock()
                .unwrap()
                .push((query.to_string(), document_ids.to_vec(), top_k));
            Ok(self.answer.clone())
        }
    }
}
