//! Provider trait: the abstraction over the streaming generation service.
//!
//! A Provider takes the outbound message list plus the tool catalog and
//! returns a stream of raw chunks. It does **not** assemble tool calls:
//! fragments are forwarded exactly as they arrive and the agent's stream
//! reconciler accumulates them.
//!
//! Implementations: OpenAI-compatible endpoints (Gemini, OpenAI), a scripted mock.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::ProviderError;
use crate::message::ChatMessage;

/// One generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The model to use (e.g., "gemini-2.5-flash", "gpt-4o")
    pub model: String,

    /// The outbound message list, system prompt first
    pub messages: Vec<ChatMessage>,

    /// Temperature (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Available tools the model can call
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
}

fn default_temperature() -> f32 {
    0.7
}

/// A tool declaration sent to the model so it knows what it can call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,

    pub description: String,

    /// JSON Schema describing the tool's parameters
    pub parameters: serde_json::Value,
}

/// A single incremental unit of a streaming response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Partial text delta
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Partial tool call fragments
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_call_deltas: Vec<ToolCallDelta>,
}

impl StreamChunk {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            tool_call_deltas: Vec::new(),
        }
    }

    pub fn tool_calls(deltas: Vec<ToolCallDelta>) -> Self {
        Self {
            content: None,
            tool_call_deltas: deltas,
        }
    }
}

/// A fragment of one tool call. Fragments for the same `index` arrive in
/// argument order; `id` and `name` usually only appear on the first one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolCallDelta {
    /// Position of the call within the current generation step
    pub index: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// A piece of the JSON argument text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
}

/// Receiving half of a generation stream. The stream ends when the sender is dropped.
pub type ChunkReceiver = mpsc::Receiver<std::result::Result<StreamChunk, ProviderError>>;

/// The core Provider trait.
///
/// The agent calls `stream()` without knowing which backend is behind it.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "gemini", "mock").
    fn name(&self) -> &str;

    /// Open a generation stream.
    ///
    /// Errors returned here mean the stream could not be opened; errors
    /// delivered through the receiver mean it broke midway.
    async fn stream(&self, request: GenerationRequest) -> std::result::Result<ChunkReceiver, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_defaults_temperature() {
        let req: GenerationRequest =
            serde_json::from_str(r#"{"model":"gemini-2.5-flash","messages":[]}"#).unwrap();
        assert!((req.temperature - 0.7).abs() < f32::EPSILON);
        assert!(req.tools.is_empty());
        assert!(req.max_tokens.is_none());
    }

    #[test]
    fn chunk_constructors() {
        let text = StreamChunk::text("Hello");
        assert_eq!(text.content.as_deref(), Some("Hello"));
        assert!(text.tool_call_deltas.is_empty());

        let calls = StreamChunk::tool_calls(vec![ToolCallDelta {
            index: 1,
            arguments: Some("{\"pa".into()),
            ..Default::default()
        }]);
        assert!(calls.content.is_none());
        assert_eq!(calls.tool_call_deltas[0].index, 1);
    }
}
