//! Tool dispatch: turn a settled step into the turns appended to the
//! outbound message list.

use quill_core::message::ChatMessage;
use quill_tools::CapabilityRegistry;
use serde_json::json;
use tracing::{debug, warn};

use crate::narration::{Narration, NarrationSink};
use crate::reconciler::StepOutcome;

/// Execute every call of `outcome` in order and return the assistant turn
/// followed by exactly one tool-result turn per call.
///
/// Unknown tools produce an error result for the model but no narration.
/// Standard output and error are only narrated for successful calls.
pub async fn dispatch<S>(
    registry: &CapabilityRegistry,
    outcome: &StepOutcome,
    sink: &mut S,
) -> Vec<ChatMessage>
where
    S: NarrationSink + ?Sized,
{
    let mut turns = Vec::with_capacity(outcome.calls.len() + 1);
    turns.push(ChatMessage::assistant_with_tool_calls(
        outcome.text.clone(),
        outcome.calls.iter().map(|c| c.raw.clone()).collect(),
    ));

    for settled in &outcome.calls {
        let call = &settled.call;
        let Some(kind) = registry.resolve(&call.name) else {
            warn!(tool = %call.name, call_id = %call.id, "Model requested an unknown tool");
            let content = json!({ "error": format!("Unknown tool: {}", call.name) });
            turns.push(ChatMessage::tool_result(&call.id, content.to_string()));
            continue;
        };

        debug!(tool = kind.name(), call_id = %call.id, "Dispatching tool call");
        sink.emit(Narration::ToolRunning {
            name: call.name.clone(),
            description: kind.running_description(&call.arguments),
        });

        let result = kind.execute(&call.arguments).await;

        sink.emit(Narration::ToolCompleted {
            name: call.name.clone(),
            description: kind.completed_description(&call.arguments, &result),
            success: result.success,
        });
        if let Some(stdout) = result.output("stdout") {
            sink.emit(Narration::ToolStdout {
                content: stdout.to_string(),
            });
        }
        if let Some(stderr) = result.output("stderr") {
            sink.emit(Narration::ToolStderr {
                content: stderr.to_string(),
            });
        }

        turns.push(ChatMessage::tool_result(&call.id, result.to_content()));
    }

    turns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconciler::StreamReconciler;
    use crate::testing;
    use quill_core::message::ChatRole;
    use quill_tools::ToolKind;

    fn outcome(chunks: Vec<testing::Script>) -> StepOutcome {
        let mut reconciler = StreamReconciler::new();
        for chunk in chunks.into_iter().flatten() {
            reconciler.apply(&chunk.unwrap(), |_| {});
        }
        reconciler.finish()
    }

    #[tokio::test]
    async fn one_result_turn_per_call_in_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "alpha").unwrap();
        let path = dir.path().join("a.txt").display().to_string();

        let step = outcome(vec![vec![
            testing::text("Reading. "),
            testing::call(0, "c0", "read_file", &json!({"path": path}).to_string()),
            testing::call(1, "c1", "bash", r#"{"command":"echo hi"}"#),
        ]]);

        let mut events = Vec::new();
        let turns = dispatch(&CapabilityRegistry::builtin(), &step, &mut |e: Narration| events.push(e)).await;

        assert_eq!(turns.len(), 3);
        assert_eq!(turns[0].role, ChatRole::Assistant);
        assert_eq!(turns[0].content, "Reading. ");
        assert_eq!(turns[0].tool_calls.len(), 2);
        assert_eq!(turns[1].tool_call_id.as_deref(), Some("c0"));
        assert!(turns[1].content.contains("alpha"));
        assert_eq!(turns[2].tool_call_id.as_deref(), Some("c1"));

        let rendered: Vec<String> = events.iter().map(Narration::render).collect();
        assert_eq!(
            rendered,
            vec![
                format!("[Tool: read_file] Reading file: {path}\n"),
                format!("[Tool: read_file] Read file: {path} (5 bytes)\n"),
                "[Tool: bash] Executing: echo hi\n".to_string(),
                "[Tool: bash] Executed: echo hi\n".to_string(),
                "hi\n".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn unknown_tool_is_reported_to_model_only() {
        let step = outcome(vec![vec![testing::call(0, "c0", "frobnicate", "{}")]]);
        let mut events = Vec::new();
        let turns = dispatch(&CapabilityRegistry::builtin(), &step, &mut |e: Narration| events.push(e)).await;

        assert!(events.is_empty());
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].content, r#"{"error":"Unknown tool: frobnicate"}"#);
    }

    #[tokio::test]
    async fn tools_outside_the_registry_are_unknown() {
        let step = outcome(vec![vec![testing::call(0, "c0", "bash", r#"{"command":"echo hi"}"#)]]);
        let registry = CapabilityRegistry::with_kinds([ToolKind::ReadFile]);
        let turns = dispatch(&registry, &step, &mut crate::narration::Silent).await;
        assert_eq!(turns[1].content, r#"{"error":"Unknown tool: bash"}"#);
    }

    #[tokio::test]
    async fn failed_call_suppresses_output_narration() {
        let step = outcome(vec![vec![testing::call(
            0,
            "c0",
            "bash",
            r#"{"command":"echo visible; echo oops >&2; exit 3"}"#,
        )]]);
        let mut events = Vec::new();
        let turns = dispatch(&CapabilityRegistry::builtin(), &step, &mut |e: Narration| events.push(e)).await;

        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], Narration::ToolCompleted { success: false, .. }));
        let content: serde_json::Value = serde_json::from_str(&turns[1].content).unwrap();
        assert_eq!(content["error"], "oops");
        assert_eq!(content["stdout"], "visible");
    }

    #[tokio::test]
    async fn malformed_arguments_still_dispatch() {
        let step = outcome(vec![vec![testing::call(0, "c0", "read_file", "{\"path\": ")]]);
        let mut events = Vec::new();
        let turns = dispatch(&CapabilityRegistry::builtin(), &step, &mut |e: Narration| events.push(e)).await;

        assert_eq!(events.len(), 2);
        let content: serde_json::Value = serde_json::from_str(&turns[1].content).unwrap();
        assert!(content["error"].as_str().unwrap().contains("path"));
    }
}
