//! Shared test helpers.

use std::collections::VecDeque;
use std::sync::Mutex;

use quill_core::error::ProviderError;
use quill_core::provider::{ChunkReceiver, GenerationRequest, Provider, StreamChunk, ToolCallDelta};
use tokio::sync::mpsc;

pub type Script = Vec<Result<StreamChunk, ProviderError>>;

/// A provider that replays one script per generation step.
///
/// Once the scripts run out, opening a stream fails with `NotConfigured`.
pub struct ScriptedProvider {
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedProvider {
    pub fn new(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every request seen so far, in order.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn stream(&self, request: GenerationRequest) -> Result<ChunkReceiver, ProviderError> {
        self.requests.lock().unwrap().push(request);
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ProviderError::NotConfigured("script exhausted".into()))?;

        let (tx, rx) = mpsc::channel(script.len().max(1));
        for item in script {
            tx.send(item).await.unwrap();
        }
        Ok(rx)
    }
}

/// A single chunk carrying one complete tool call.
pub fn call(index: usize, id: &str, name: &str, arguments: &str) -> Result<StreamChunk, ProviderError> {
    Ok(StreamChunk::tool_calls(vec![ToolCallDelta {
        index,
        id: Some(id.into()),
        name: Some(name.into()),
        arguments: Some(arguments.into()),
    }]))
}

pub fn text(content: &str) -> Result<StreamChunk, ProviderError> {
    Ok(StreamChunk::text(content))
}
