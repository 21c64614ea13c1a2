//! Courier: a small client for OpenAI-compatible chat endpoints.
//!
//! The [`llm`] module is the core: provider configuration, a client with a
//! TTL-cached model listing, and chat completions exposed as a lazy fragment
//! stream. The [`config`] module is the surrounding application surface
//! (config file plus env var resolution) used by the CLI binary.

pub mod config;
pub mod llm;
