//! Error types for the Quill domain.
//!
//! Each bounded context has its own `thiserror` enum; there is no catch-all.

use thiserror::Error;

// --- Bounded context errors ---

/// Failures of the generation service. All of these are fatal to the
/// current utterance and are never retried by the agent.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Failures inside a capability.
///
/// These never leave the capability boundary: the tool registry turns them
/// into a `ToolResult` with `success == false`.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {what}: {reason}")]
    Parse { what: String, reason: String },

    #[error("{0}")]
    ExecutionFailed(String),
}

/// Failures of a generation step as seen by the orchestration loop.
#[derive(Debug, Clone, Error)]
pub enum AgentError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Stopped after {steps} generation steps without a final answer")]
    StepLimit { steps: u32 },
}
