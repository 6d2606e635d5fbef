//! LLM provider domain models and traits

mod message;
mod provider;
mod provider_resolver;
mod request;
mod response;

pub use message::{Message, MessageRole};
pub use provider::{LlmProvider, LlmStream};
pub use provider_resolver::{LlmEndpoint, ProviderResolver, StaticProviderResolver};
pub use request::{
    LlmJsonSchema, LlmRequest, LlmRequestBuilder, LlmResponseFormat, STRUCTURED_RESPONSE_NAME,
};
pub use response::{FinishReason, LlmResponse, StreamChunk, Usage};

#[cfg(test)]
pub use provider::mock::MockLlmProvider;
