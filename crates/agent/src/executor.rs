//! Turn executor: one generation step.

use quill_core::error::ProviderError;
use quill_core::provider::{GenerationRequest, Provider};
use tracing::{debug, warn};

use crate::narration::{Narration, NarrationSink};
use crate::reconciler::{StepOutcome, StreamReconciler};

/// Open a stream for `request`, reconcile it to completion, and report
/// text deltas to `sink` as they arrive.
///
/// A transport failure, at open or midway, aborts the step untouched.
pub async fn run_step<S>(
    provider: &dyn Provider,
    request: GenerationRequest,
    sink: &mut S,
) -> Result<StepOutcome, ProviderError>
where
    S: NarrationSink + ?Sized,
{
    let mut rx = provider.stream(request).await?;
    let mut reconciler = StreamReconciler::new();
    let mut chunks = 0usize;

    while let Some(item) = rx.recv().await {
        let chunk = item.inspect_err(|e| {
            warn!(provider = provider.name(), error = %e, "Generation stream failed");
        })?;
        chunks += 1;
        reconciler.apply(&chunk, |delta| {
            sink.emit(Narration::Text {
                content: delta.to_string(),
            })
        });
    }

    let outcome = reconciler.finish();
    debug!(
        provider = provider.name(),
        chunks,
        text_len = outcome.text.len(),
        tool_calls = outcome.calls.len(),
        "Generation step settled"
    );
    Ok(outcome)
}
