//! The agent loop for Quill.
//!
//! One user utterance is answered by a **generate → dispatch** cycle:
//!
//! 1. **Project** the conversation into model-facing turns and append the
//!    utterance
//! 2. **Generate**: stream one step from the provider, reconciling text
//!    deltas and tool-call fragments as they arrive
//! 3. **Dispatch**: if the step requested tools, run them in order and
//!    feed the results back, then go to 2
//! 4. **Answer**: a step with no tool calls ends the turn; its text (plus
//!    any text from earlier steps) becomes the assistant message
//!
//! Progress is reported on a narration channel that never touches the
//! conversation.

pub mod dispatcher;
pub mod executor;
pub mod loop_runner;
pub mod narration;
pub mod reconciler;

#[cfg(test)]
mod testing;

pub use dispatcher::dispatch;
pub use executor::run_step;
pub use loop_runner::Agent;
pub use narration::{Narration, NarrationSink, Silent};
pub use reconciler::{SettledCall, StepOutcome, StreamReconciler, ToolCallFragment};
