//! Version-control command execution.

use quill_core::error::ToolError;
use quill_core::tool::{ParamType, ToolParameter, ToolResult, ToolSpec};

use crate::args::{self, Args};
use crate::process;

pub const SPEC: ToolSpec = ToolSpec {
    name: "git",
    description: "Execute git commands and return the output",
    parameters: &[
        ToolParameter {
            name: "args",
            param_type: ParamType::String,
            description: "The git command arguments (e.g., \"status\", \"log --oneline -5\", \"diff HEAD~1\")",
            required: true,
        },
        ToolParameter {
            name: "cwd",
            param_type: ParamType::String,
            description: "Optional working directory to run the git command in",
            required: false,
        },
    ],
};

pub async fn run(args: &Args) -> Result<ToolResult, ToolError> {
    let git_args = args::required_str(args, "args")?;
    let cwd = args::optional_str(args, "cwd")
        .map(args::resolve_path)
        .transpose()?;

    // Through the shell so quoted arguments like --format="%h %s" survive.
    let command = format!("git {git_args}");
    Ok(process::shell(&command, cwd.as_deref()).await?.into_result())
}

pub fn running(args: &Args) -> String {
    format!("Running: git {}", args::display(args, "args"))
}

pub fn completed(args: &Args, result: &ToolResult) -> String {
    let git_args = args::display(args, "args");
    if result.success {
        format!("Completed: git {git_args}")
    } else {
        format!("Failed: git {git_args}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn runs_in_requested_directory() {
        let dir = tempfile::tempdir().unwrap();
        let a = json!({"args": "rev-parse --is-inside-work-tree", "cwd": dir.path().to_str().unwrap()})
            .as_object()
            .cloned()
            .unwrap();
        let result = run(&a).await.unwrap();
        // Not a repository (or git missing): either way a failure with an exit code, never a panic.
        assert!(!result.success);
        assert!(result.data.contains_key("exit_code"));
        assert!(completed(&a, &result).starts_with("Failed: git rev-parse"));
    }

    #[tokio::test]
    async fn args_are_required() {
        assert!(matches!(run(&Args::new()).await, Err(ToolError::InvalidArguments(_))));
    }

    #[test]
    fn narration() {
        let a = json!({"args": "status"}).as_object().cloned().unwrap();
        assert_eq!(running(&a), "Running: git status");
        assert_eq!(completed(&a, &ToolResult::ok(Default::default())), "Completed: git status");
    }
}
