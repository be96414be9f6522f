//! The orchestration loop.

use std::path::Path;
use std::sync::Arc;

use quill_config::AppConfig;
use quill_core::error::AgentError;
use quill_core::message::{ChatMessage, Conversation, Role};
use quill_core::provider::{GenerationRequest, Provider};
use quill_tools::CapabilityRegistry;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::dispatcher::dispatch;
use crate::executor::run_step;
use crate::narration::NarrationSink;

/// Drives one user utterance through as many generation steps as the
/// model needs, dispatching tool calls in between.
pub struct Agent {
    /// The generation service
    provider: Arc<dyn Provider>,

    /// The model to use
    model: String,

    /// Prepended to every outbound message list
    system_prompt: String,

    /// Capabilities offered to the model
    registry: CapabilityRegistry,

    temperature: f32,

    max_tokens: Option<u32>,

    /// Generation-step ceiling per utterance; `None` means unbounded
    max_steps: Option<u32>,
}

impl Agent {
    /// Create an agent with the full built-in catalog and no system prompt.
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            system_prompt: String::new(),
            registry: CapabilityRegistry::builtin(),
            temperature: 0.7,
            max_tokens: None,
            max_steps: None,
        }
    }

    /// Build an agent from loaded configuration. `cwd` is where `AGENTS.md`
    /// is looked up for the system prompt.
    pub fn from_config(provider: Arc<dyn Provider>, config: &AppConfig, cwd: &Path) -> Self {
        let mut agent = Self::new(provider, &config.model.name)
            .with_system_prompt(config.system_prompt(cwd))
            .with_temperature(config.model.temperature)
            .with_max_steps(config.agent.max_steps);
        if let Some(max) = config.model.max_tokens {
            agent = agent.with_max_tokens(max);
        }
        agent
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Restrict or replace the capability catalog.
    pub fn with_registry(mut self, registry: CapabilityRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the default max tokens per generation step.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn with_max_steps(mut self, max: Option<u32>) -> Self {
        self.max_steps = max;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    /// Answer one user utterance.
    ///
    /// The utterance is appended to `conversation` first. On success the
    /// accumulated text of every step is appended as an assistant message
    /// and returned; on failure an error message is appended instead and
    /// the error is returned. Tool traffic never enters the conversation.
    pub async fn respond<S>(
        &self,
        conversation: &mut Conversation,
        utterance: &str,
        sink: &mut S,
    ) -> Result<String, AgentError>
    where
        S: NarrationSink + ?Sized,
    {
        let history = conversation.project();
        conversation.append(Role::User, utterance);
        let received_at = conversation
            .last()
            .map(|m| m.timestamp.to_rfc3339())
            .unwrap_or_default();

        let span = info_span!(
            "llm.chat",
            conversation_id = %conversation.id,
            received_at = %received_at,
            model = %self.model,
            history_len = history.len(),
        );
        info!(
            conversation_id = %conversation.id,
            messages = conversation.len(),
            "Processing utterance"
        );

        let outcome = self.run_turn(history, utterance, sink).instrument(span).await;

        match &outcome {
            Ok(text) => {
                conversation.append(Role::Assistant, text.as_str());
            }
            Err(e) => {
                warn!(conversation_id = %conversation.id, error = %e, "Utterance failed");
                conversation.append(Role::Error, e.to_string());
            }
        }
        outcome
    }

    async fn run_turn<S>(
        &self,
        history: Vec<ChatMessage>,
        utterance: &str,
        sink: &mut S,
    ) -> Result<String, AgentError>
    where
        S: NarrationSink + ?Sized,
    {
        let mut messages = Vec::with_capacity(history.len() + 2);
        if !self.system_prompt.is_empty() {
            messages.push(ChatMessage::system(&self.system_prompt));
        }
        messages.extend(history);
        messages.push(ChatMessage::user(utterance));

        let tools = self.registry.definitions();
        let mut full_text = String::new();
        let mut iteration: u32 = 0;

        loop {
            if let Some(max) = self.max_steps
                && iteration >= max
            {
                warn!(steps = iteration, "Step limit reached without a final answer");
                return Err(AgentError::StepLimit { steps: iteration });
            }
            iteration += 1;

            let request = GenerationRequest {
                model: self.model.clone(),
                messages: messages.clone(),
                temperature: self.temperature,
                max_tokens: self.max_tokens,
                tools: tools.clone(),
            };

            let span = info_span!(
                "llm.generate",
                iteration,
                message_count = messages.len(),
                has_tool_calls = tracing::field::Empty,
            );
            let outcome = run_step(self.provider.as_ref(), request, sink)
                .instrument(span.clone())
                .await?;
            span.record("has_tool_calls", outcome.has_tool_calls());

            full_text.push_str(&outcome.text);

            if !outcome.has_tool_calls() {
                debug!(iteration, "Step produced no tool calls, turn complete");
                return Ok(full_text);
            }

            debug!(
                iteration,
                tool_count = outcome.calls.len(),
                "Executing tool calls"
            );
            let turns = dispatch(&self.registry, &outcome, sink)
                .instrument(span)
                .await;
            messages.extend(turns);
        }
    }
}
