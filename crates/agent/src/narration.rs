//! The progress narration channel.
//!
//! Everything the user sees while an utterance is in flight passes through
//! here: raw model text plus status lines synthesized around tool calls.
//! Narration is display-only and never enters the conversation.

use serde::{Deserialize, Serialize};

/// One item on the narration channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Narration {
    /// Raw model text delta.
    Text { content: String },

    /// A capability is about to run.
    ToolRunning { name: String, description: String },

    /// A capability returned.
    ToolCompleted {
        name: String,
        description: String,
        success: bool,
    },

    /// Standard output of a successful capability.
    ToolStdout { content: String },

    /// Standard error of a successful capability.
    ToolStderr { content: String },
}

impl Narration {
    /// Plain-text rendering, without colors.
    pub fn render(&self) -> String {
        match self {
            Self::Text { content } => content.clone(),
            Self::ToolRunning { name, description } | Self::ToolCompleted { name, description, .. } => {
                format!("[Tool: {name}] {description}\n")
            }
            Self::ToolStdout { content } | Self::ToolStderr { content } => format!("{content}\n"),
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text { .. })
    }
}

/// Receiver of narration events.
pub trait NarrationSink {
    fn emit(&mut self, event: Narration);
}

impl<F: FnMut(Narration)> NarrationSink for F {
    fn emit(&mut self, event: Narration) {
        self(event)
    }
}

/// A sink that discards everything.
pub struct Silent;

impl NarrationSink for Silent {
    fn emit(&mut self, _event: Narration) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_lines_use_tool_prefix() {
        let running = Narration::ToolRunning {
            name: "bash".into(),
            description: "Executing: ls".into(),
        };
        assert_eq!(running.render(), "[Tool: bash] Executing: ls\n");

        let failed = Narration::ToolCompleted {
            name: "read_file".into(),
            description: "Failed to read file: x".into(),
            success: false,
        };
        assert_eq!(failed.render(), "[Tool: read_file] Failed to read file: x\n");
    }

    #[test]
    fn text_is_rendered_verbatim() {
        let text = Narration::Text { content: "partial".into() };
        assert_eq!(text.render(), "partial");
        assert!(text.is_text());
    }

    #[test]
    fn serializes_with_type_tag() {
        let event = Narration::ToolStderr { content: "warning".into() };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"tool_stderr""#));
    }

    #[test]
    fn closures_are_sinks() {
        let mut seen = Vec::new();
        {
            let mut sink = |e: Narration| seen.push(e);
            sink.emit(Narration::Text { content: "a".into() });
        }
        assert_eq!(seen.len(), 1);
        Silent.emit(Narration::Text { content: "dropped".into() });
    }
}
