//! Offline provider that replays canned responses.
//!
//! Selected with `USE_MOCK_MODEL=true`. It never touches the network, which
//! makes it useful for trying the REPL without an API key or quota.

use std::time::Duration;

use async_trait::async_trait;
use quill_core::error::ProviderError;
use quill_core::message::{ChatMessage, ChatRole};
use quill_core::provider::*;
use tokio::sync::mpsc;
use tracing::debug;

/// Phrase in the user's message that makes the mock request a tool call.
const TOOL_TRIGGER: &str = "use tool ls";

pub struct MockProvider {
    delay: Duration,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            delay: Duration::from_millis(100),
        }
    }

    /// Pause between chunks. Zero disables pacing.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Decide the chunk script for this request.
    fn script(messages: &[ChatMessage]) -> Vec<StreamChunk> {
        if let Some(last) = messages.last()
            && last.role == ChatRole::Tool
        {
            return tool_followup(&last.content);
        }

        let prompt = messages
            .iter()
            .rev()
            .find(|m| m.role == ChatRole::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default();

        if prompt.to_lowercase().contains(TOOL_TRIGGER) {
            return vec![
                StreamChunk::tool_calls(vec![ToolCallDelta {
                    index: 0,
                    id: Some("mock-tool-1".into()),
                    name: Some("bash".into()),
                    arguments: Some("{\"comm".into()),
                }]),
                StreamChunk::tool_calls(vec![ToolCallDelta {
                    index: 0,
                    arguments: Some("and\": \"l".into()),
                    ..Default::default()
                }]),
                StreamChunk::tool_calls(vec![ToolCallDelta {
                    index: 0,
                    arguments: Some("s\"}".into()),
                    ..Default::default()
                }]),
            ];
        }

        let excerpt: String = prompt.chars().take(50).collect();
        [
            "I'm a mock AI assistant. ".to_string(),
            "This is a simulated response ".to_string(),
            "to avoid hitting API quotas. ".to_string(),
            format!("You asked: \"{excerpt}...\" "),
            "\n\nI can help you with various tasks!".to_string(),
        ]
        .into_iter()
        .map(StreamChunk::text)
        .collect()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Text reply after a tool round-trip, quoting the tool's stdout when present.
fn tool_followup(content: &str) -> Vec<StreamChunk> {
    let output = serde_json::from_str::<serde_json::Value>(content)
        .ok()
        .and_then(|v| v.get("stdout").and_then(|s| s.as_str()).map(str::to_string))
        .unwrap_or_else(|| content.to_string());

    vec![
        StreamChunk::text("The command finished. "),
        StreamChunk::text(format!("Here is what it returned:\n\n{output}")),
    ]
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn stream(&self, request: GenerationRequest) -> Result<ChunkReceiver, ProviderError> {
        let script = Self::script(&request.messages);
        debug!(chunks = script.len(), "Mock provider replaying script");

        let (tx, rx) = mpsc::channel(16);
        let delay = self.delay;
        tokio::spawn(async move {
            for chunk in script {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                if tx.send(Ok(chunk)).await.is_err() {
                    return;
                }
            }
        });
        Ok(rx)
    }
}
