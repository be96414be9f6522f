//! Write a file, creating parent directories as needed.

use quill_core::data;
use quill_core::error::ToolError;
use quill_core::tool::{ParamType, ToolParameter, ToolResult, ToolSpec};

use crate::args::{self, Args};

pub const SPEC: ToolSpec = ToolSpec {
    name: "write_file",
    description: "Write content to a file, creating the file and parent directories if they do not exist",
    parameters: &[
        ToolParameter {
            name: "path",
            param_type: ParamType::String,
            description: "The path to the file to write (absolute or relative to current working directory)",
            required: true,
        },
        ToolParameter {
            name: "content",
            param_type: ParamType::String,
            description: "The content to write to the file",
            required: true,
        },
    ],
};

pub async fn run(args: &Args) -> Result<ToolResult, ToolError> {
    let raw = args::required_str(args, "path")?;
    let content = args::required_str(args, "content")?;
    let path = args::resolve_path(raw)?;
    let io_err = |source| ToolError::Io {
        path: path.display().to_string(),
        source,
    };

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }
    tokio::fs::write(&path, content).await.map_err(io_err)?;

    Ok(ToolResult::ok(data! {
        "path" => path.display().to_string(),
        "size" => content.len(),
    }))
}

pub fn running(args: &Args) -> String {
    format!("Writing file: {}", args::display(args, "path"))
}

pub fn completed(args: &Args, result: &ToolResult) -> String {
    let path = args::display(args, "path");
    if result.success {
        format!("Wrote file: {path} ({} bytes)", result.data.get("size").and_then(|v| v.as_u64()).unwrap_or(0))
    } else {
        format!("Failed to write file: {path}")
    }
}
