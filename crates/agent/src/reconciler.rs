//! Stream reconciliation: raw chunks in, text and complete tool calls out.
//!
//! Tool-call fragments are addressed by index and may interleave across
//! indices; arguments arrive split into arbitrary pieces. Indices come off the
//! wire unchecked, so fragments live in a sparse map rather than a dense
//! array. The reconciler is plain state with no I/O.

use std::collections::BTreeMap;

use quill_core::message::MessageToolCall;
use quill_core::provider::{StreamChunk, ToolCallDelta};
use quill_core::tool::ToolCall;
use tracing::{debug, trace};

/// One tool call under construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolCallFragment {
    pub id: String,
    pub name: String,
    /// Raw argument text, accumulated in arrival order
    pub arguments: String,
}

impl ToolCallFragment {
    fn merge(&mut self, delta: &ToolCallDelta) {
        if self.id.is_empty()
            && let Some(id) = delta.id.as_deref().filter(|s| !s.is_empty())
        {
            self.id = id.to_string();
        }
        if self.name.is_empty()
            && let Some(name) = delta.name.as_deref().filter(|s| !s.is_empty())
        {
            self.name = name.to_string();
        }
        if let Some(piece) = &delta.arguments {
            self.arguments.push_str(piece);
        }
    }
}

/// A settled tool call: the raw record echoed back to the model, plus the
/// parsed call handed to the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub struct SettledCall {
    pub raw: MessageToolCall,
    pub call: ToolCall,
}

/// What one generation step produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepOutcome {
    pub text: String,
    pub calls: Vec<SettledCall>,
}

impl StepOutcome {
    pub fn has_tool_calls(&self) -> bool {
        !self.calls.is_empty()
    }
}

/// Accumulator for a single generation step.
#[derive(Debug, Default)]
pub struct StreamReconciler {
    text: String,
    fragments: BTreeMap<usize, ToolCallFragment>,
}

impl StreamReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one chunk into the accumulators, reporting any text delta to `on_text`.
    pub fn apply(&mut self, chunk: &StreamChunk, mut on_text: impl FnMut(&str)) {
        if let Some(delta) = chunk.content.as_deref().filter(|d| !d.is_empty()) {
            self.text.push_str(delta);
            on_text(delta);
        }

        for delta in &chunk.tool_call_deltas {
            self.fragments.entry(delta.index).or_default().merge(delta);
            trace!(index = delta.index, "Merged tool call fragment");
        }
    }

    /// Text accumulated so far.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Fragments under construction, keyed by stream index.
    pub fn fragments(&self) -> &BTreeMap<usize, ToolCallFragment> {
        &self.fragments
    }

    /// Settle the step in index order. Nameless fragments are dropped and
    /// missing ids are filled with `call_<index>`.
    pub fn finish(self) -> StepOutcome {
        let calls = self
            .fragments
            .into_iter()
            .filter_map(|(index, fragment)| {
                if fragment.name.is_empty() {
                    if !fragment.arguments.is_empty() || !fragment.id.is_empty() {
                        debug!(index, "Dropping tool call fragment without a name");
                    }
                    return None;
                }
                let id = if fragment.id.is_empty() {
                    format!("call_{index}")
                } else {
                    fragment.id
                };
                let call = ToolCall::from_raw(id.clone(), fragment.name.clone(), &fragment.arguments);
                Some(SettledCall {
                    raw: MessageToolCall {
                        id,
                        name: fragment.name,
                        arguments: fragment.arguments,
                    },
                    call,
                })
            })
            .collect();

        StepOutcome {
            text: self.text,
            calls,
        }
    }
}
