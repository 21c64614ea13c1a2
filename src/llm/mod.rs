//! Client layer for one OpenAI-compatible chat endpoint: provider
//! configuration, cached model listing, and completion streaming.

pub mod client;
pub mod error;
pub mod provider;
pub mod stream;
pub mod types;

pub use client::{DEFAULT_MODEL_TTL, LlmClient};
pub use error::ClientError;
pub use provider::{DEFAULT_ENDPOINT, ProviderConfig};
pub use stream::CompletionStream;
pub use types::{ChatMessage, ModelDescriptor, Role};
