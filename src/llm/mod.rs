//! LLM integration module.
//!
//! Provides an OpenAI-compatible client, the [`ChatModel`] seam the judge
//! talks to, and the judging prompts and schema.

mod client;
mod prompts;

pub use client::{ChatModel, LlmClient, LlmResponse, Message, ResponseSchema, Role, TokenUsage};
pub use prompts::Prompts;
