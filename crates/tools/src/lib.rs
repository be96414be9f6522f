//! Built-in capabilities for Quill.
//!
//! The catalog is closed: every capability is a [`ToolKind`] variant bound
//! to its module's `SPEC`, `run`, and narration functions. Nothing is
//! registered at runtime.

pub mod args;
pub mod bash;
pub mod edit_file;
pub mod git;
pub mod github_pr;
pub mod glob;
pub mod grep;
pub mod list_directory;
pub mod process;
pub mod read_file;
pub mod walk;
pub mod write_file;

use quill_core::error::ToolError;
use quill_core::provider::ToolDefinition;
use quill_core::tool::{ToolResult, ToolSpec};
use serde_json::{Map, Value};
use tracing::{Instrument, debug, info_span, warn};

use crate::args::Args;

/// One built-in capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    Bash,
    ReadFile,
    WriteFile,
    EditFile,
    Git,
    GithubPr,
    Grep,
    Glob,
    ListDirectory,
}

impl ToolKind {
    /// Every capability, in catalog order.
    pub const ALL: [ToolKind; 9] = [
        Self::Bash,
        Self::ReadFile,
        Self::WriteFile,
        Self::EditFile,
        Self::Git,
        Self::GithubPr,
        Self::Grep,
        Self::Glob,
        Self::ListDirectory,
    ];

    pub fn spec(self) -> &'static ToolSpec {
        match self {
            Self::Bash => &bash::SPEC,
            Self::ReadFile => &read_file::SPEC,
            Self::WriteFile => &write_file::SPEC,
            Self::EditFile => &edit_file::SPEC,
            Self::Git => &git::SPEC,
            Self::GithubPr => &github_pr::SPEC,
            Self::Grep => &grep::SPEC,
            Self::Glob => &glob::SPEC,
            Self::ListDirectory => &list_directory::SPEC,
        }
    }

    pub fn name(self) -> &'static str {
        self.spec().name
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    /// Execute the capability. Never fails: capability errors become a
    /// `ToolResult` with `success == false`.
    pub async fn execute(self, args: &Args) -> ToolResult {
        let span = info_span!("tool.execute", tool = self.name(), success = tracing::field::Empty);
        let outcome = async {
            match self {
                Self::Bash => bash::run(args).await,
                Self::ReadFile => read_file::run(args).await,
                Self::WriteFile => write_file::run(args).await,
                Self::EditFile => edit_file::run(args).await,
                Self::Git => git::run(args).await,
                Self::GithubPr => github_pr::run(args).await,
                Self::Grep => grep::run(args).await,
                Self::Glob => glob::run(args).await,
                Self::ListDirectory => list_directory::run(args).await,
            }
        }
        .instrument(span.clone())
        .await;

        let result = match outcome {
            Ok(result) => result,
            Err(e) => {
                warn!(tool = self.name(), error = %e, "Capability failed");
                failure_from(&e)
            }
        };
        span.record("success", result.success);
        debug!(tool = self.name(), success = result.success, "Capability finished");
        result
    }

    /// Narration shown before the capability runs.
    pub fn running_description(self, args: &Args) -> String {
        match self {
            Self::Bash => bash::running(args),
            Self::ReadFile => read_file::running(args),
            Self::WriteFile => write_file::running(args),
            Self::EditFile => edit_file::running(args),
            Self::Git => git::running(args),
            Self::GithubPr => github_pr::running(args),
            Self::Grep => grep::running(args),
            Self::Glob => glob::running(args),
            Self::ListDirectory => list_directory::running(args),
        }
    }

    /// Narration shown after the capability returns.
    pub fn completed_description(self, args: &Args, result: &ToolResult) -> String {
        match self {
            Self::Bash => bash::completed(args, result),
            Self::ReadFile => read_file::completed(args, result),
            Self::WriteFile => write_file::completed(args, result),
            Self::EditFile => edit_file::completed(args, result),
            Self::Git => git::completed(args, result),
            Self::GithubPr => github_pr::completed(args, result),
            Self::Grep => grep::completed(args, result),
            Self::Glob => glob::completed(args, result),
            Self::ListDirectory => list_directory::completed(args, result),
        }
    }
}

/// The fixed catalog handed to the agent.
#[derive(Debug, Clone)]
pub struct CapabilityRegistry {
    kinds: Vec<ToolKind>,
}

impl CapabilityRegistry {
    /// All nine built-in capabilities.
    pub fn builtin() -> Self {
        Self {
            kinds: ToolKind::ALL.to_vec(),
        }
    }

    /// A registry restricted to `kinds`, in the given order.
    pub fn with_kinds(kinds: impl IntoIterator<Item = ToolKind>) -> Self {
        let mut unique = Vec::new();
        for kind in kinds {
            if !unique.contains(&kind) {
                unique.push(kind);
            }
        }
        Self { kinds: unique }
    }

    pub fn list(&self) -> Vec<&'static ToolSpec> {
        self.kinds.iter().map(|k| k.spec()).collect()
    }

    pub fn resolve(&self, name: &str) -> Option<ToolKind> {
        self.kinds.iter().copied().find(|k| k.name() == name)
    }

    /// Tool declarations sent with every generation request.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.kinds.iter().map(|k| k.spec().to_definition()).collect()
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// A process that never started still reports the process fields, with
/// `exit_code` -1.
fn failure_from(e: &ToolError) -> ToolResult {
    let message = e.to_string();
    let mut data = Map::new();
    if matches!(e, ToolError::Spawn { .. }) {
        data.insert("stdout".into(), Value::from(""));
        data.insert("stderr".into(), Value::from(message.as_str()));
        data.insert("exit_code".into(), Value::from(-1));
    }
    ToolResult::failure(data, message)
}
