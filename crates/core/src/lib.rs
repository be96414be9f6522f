//! # Quill Core
//!
//! Domain types, traits, and error definitions for the Quill coding assistant.
//! This crate has **no framework dependencies**. It defines the data substrate
//! that the provider, tool, and agent crates implement against.
//!
//! ## Layout
//!
//! - [`message`]: the durable Conversation Model and the model-facing chat turns
//! - [`tool`]: capability descriptors, tool calls, and tool results
//! - [`provider`]: the streaming generation service contract
//! - [`error`]: the error taxonomy shared by every crate

pub mod error;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{AgentError, ProviderError, ToolError};
pub use message::{ChatMessage, ChatRole, Conversation, ConversationId, Message, MessageToolCall, Role};
pub use provider::{ChunkReceiver, GenerationRequest, Provider, StreamChunk, ToolCallDelta, ToolDefinition};
pub use tool::{ParamType, ToolCall, ToolParameter, ToolResult, ToolSpec};
