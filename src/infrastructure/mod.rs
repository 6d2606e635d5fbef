//! Infrastructure layer - Engine, node collaborators and persistence

pub mod http_client;
pub mod knowledge_base;
pub mod llm;
pub mod logging;
pub mod sandbox;
pub mod services;
pub mod storage;
pub mod workflow;
