//! LLM provider implementations

mod openai;
mod resolver;

pub use openai::{DEFAULT_OPENAI_BASE_URL, OpenAiProvider};
pub use resolver::{EndpointPreset, EndpointProviderResolver};
