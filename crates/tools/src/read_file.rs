//! Read a file from disk.

use quill_core::data;
use quill_core::error::ToolError;
use quill_core::tool::{ParamType, ToolParameter, ToolResult, ToolSpec};

use crate::args::{self, Args};

pub const SPEC: ToolSpec = ToolSpec {
    name: "read_file",
    description: "Read the contents of a file from the filesystem",
    parameters: &[ToolParameter {
        name: "path",
        param_type: ParamType::String,
        description: "The path to the file to read (absolute or relative to current working directory)",
        required: true,
    }],
};

pub async fn run(args: &Args) -> Result<ToolResult, ToolError> {
    let raw = args::required_str(args, "path")?;
    let path = args::resolve_path(raw)?;

    let content = tokio::fs::read_to_string(&path)
        .await
        .map_err(|source| ToolError::Io {
            path: path.display().to_string(),
            source,
        })?;

    Ok(ToolResult::ok(data! {
        "size" => content.len(),
        "path" => path.display().to_string(),
        "content" => content,
    }))
}

pub fn running(args: &Args) -> String {
    format!("Reading file: {}", args::display(args, "path"))
}

pub fn completed(args: &Args, result: &ToolResult) -> String {
    let path = args::display(args, "path");
    if result.success {
        format!("Read file: {path} ({} bytes)", result.data.get("size").and_then(|v| v.as_u64()).unwrap_or(0))
    } else {
        format!("Failed to read file: {path}")
    }
}
