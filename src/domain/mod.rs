//! Domain layer - Core workflow model, collaborator traits and errors

pub mod error;
pub mod knowledge_base;
pub mod llm;
pub mod storage;
pub mod workflow;

pub use error::DomainError;
pub use knowledge_base::{KnowledgeBase, KnowledgeBaseRegistry, RetrievalProvider};
pub use llm::{
    FinishReason, LlmEndpoint, LlmProvider, LlmRequest, LlmResponse, LlmStream, Message,
    MessageRole, ProviderResolver, StreamChunk, Usage,
};
pub use storage::{Storage, StorageEntity, StorageKey};
pub use workflow::{
    Edge, ExecutionContext, ExecutionOptions, ExecutionResult, ExecutionStatus, Node, NodeKind,
    NodeType, ScriptRequest, ScriptSandbox, Workflow, WorkflowError, WorkflowExecutor, WorkflowId,
};
