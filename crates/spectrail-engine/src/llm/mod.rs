//! OpenAI-compatible chat-completions client and prompt builders.

pub mod client;
pub mod config;
pub mod prompts;
pub mod types;

pub use client::{ChatCompletion, HttpProvider};
pub use config::ProviderConfig;
pub use types::{AssistantTurn, ChatMessage, FunctionCallMessage, ToolCallMessage};
