//! Filename search by glob.

use quill_core::data;
use quill_core::error::ToolError;
use quill_core::tool::{ParamType, ToolParameter, ToolResult, ToolSpec};

use crate::args::{self, Args};
use crate::walk;

const DEFAULT_MAX_RESULTS: u64 = 100;

pub const SPEC: ToolSpec = ToolSpec {
    name: "glob",
    description: "Find files matching a glob pattern",
    parameters: &[
        ToolParameter {
            name: "pattern",
            param_type: ParamType::String,
            description: "The glob pattern to match files (e.g., \"**/*.ts\", \"src/**/*.test.js\")",
            required: true,
        },
        ToolParameter {
            name: "path",
            param_type: ParamType::String,
            description: "The directory to search in (default: current directory)",
            required: false,
        },
        ToolParameter {
            name: "max_results",
            param_type: ParamType::Integer,
            description: "Maximum number of results to return (default: 100)",
            required: false,
        },
    ],
};

pub async fn run(args: &Args) -> Result<ToolResult, ToolError> {
    let pattern = args::required_str(args, "pattern")?.to_string();
    let root = args::resolve_path(args::optional_str(args, "path").unwrap_or("."))?;
    let max_results = args::optional_u64(args, "max_results").unwrap_or(DEFAULT_MAX_RESULTS) as usize;

    if !root.is_dir() {
        return Err(ToolError::NotFound(format!("directory {}", root.display())));
    }

    let files = walk::blocking(move || walk::files(&root, Some(&pattern), Some(max_results))).await?;
    let files: Vec<String> = files.iter().map(|p| p.display().to_string()).collect();

    Ok(ToolResult::ok(data! {
        "count" => files.len(),
        "files" => files,
    }))
}

pub fn running(args: &Args) -> String {
    format!("Finding files: {}", args::display(args, "pattern"))
}

pub fn completed(args: &Args, result: &ToolResult) -> String {
    let pattern = args::display(args, "pattern");
    if result.success {
        let n = result.data.get("count").and_then(|v| v.as_u64()).unwrap_or(0);
        format!("Found {n} files matching: {pattern}")
    } else {
        format!("Failed to find files: {pattern}")
    }
}
