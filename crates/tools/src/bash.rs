//! Shell command execution.

use quill_core::error::ToolError;
use quill_core::tool::{ParamType, ToolParameter, ToolResult, ToolSpec};

use crate::args::{self, Args};
use crate::process;

pub const SPEC: ToolSpec = ToolSpec {
    name: "bash",
    description: "Execute bash commands and return the output",
    parameters: &[ToolParameter {
        name: "command",
        param_type: ParamType::String,
        description: "The bash command to execute",
        required: true,
    }],
};

pub async fn run(args: &Args) -> Result<ToolResult, ToolError> {
    let command = args::required_str(args, "command")?;
    Ok(process::shell(command, None).await?.into_result())
}

pub fn running(args: &Args) -> String {
    format!("Executing: {}", args::display(args, "command"))
}

pub fn completed(args: &Args, _result: &ToolResult) -> String {
    format!("Executed: {}", args::display(args, "command"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: serde_json::Value) -> Args {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn echo_succeeds() {
        let result = run(&args(json!({"command": "echo hello"}))).await.unwrap();
        assert!(result.success);
        assert_eq!(result.output("stdout"), Some("hello"));
        assert_eq!(result.data["exit_code"], 0);
    }

    #[tokio::test]
    async fn failing_command_reports_exit_code() {
        let result = run(&args(json!({"command": "exit 2"}))).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.data["exit_code"], 2);
    }

    #[tokio::test]
    async fn missing_command_is_invalid() {
        let err = run(&Args::new()).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[test]
    fn narration() {
        let a = args(json!({"command": "ls -la"}));
        assert_eq!(running(&a), "Executing: ls -la");
        assert_eq!(completed(&a, &ToolResult::ok(Default::default())), "Executed: ls -la");
    }
}
