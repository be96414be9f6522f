//! Exact string replacement inside a file.

use quill_core::data;
use quill_core::error::ToolError;
use quill_core::tool::{ParamType, ToolParameter, ToolResult, ToolSpec};

use crate::args::{self, Args};

pub const SPEC: ToolSpec = ToolSpec {
    name: "edit_file",
    description: "Edit a file by replacing a specific string with new content. The old_string must match exactly.",
    parameters: &[
        ToolParameter {
            name: "path",
            param_type: ParamType::String,
            description: "The path to the file to edit",
            required: true,
        },
        ToolParameter {
            name: "old_string",
            param_type: ParamType::String,
            description: "The exact string to search for and replace (must be unique in the file)",
            required: true,
        },
        ToolParameter {
            name: "new_string",
            param_type: ParamType::String,
            description: "The string to replace old_string with",
            required: true,
        },
        ToolParameter {
            name: "replace_all",
            param_type: ParamType::Boolean,
            description: "Whether to replace all occurrences (default: false, only replaces first occurrence)",
            required: false,
        },
    ],
};

pub async fn run(args: &Args) -> Result<ToolResult, ToolError> {
    let raw = args::required_str(args, "path")?;
    let old = args::required_str(args, "old_string")?;
    let new = args::required_str(args, "new_string")?;
    let replace_all = args::optional_bool(args, "replace_all").unwrap_or(false);

    if old.is_empty() {
        return Err(ToolError::InvalidArguments("old_string must not be empty".into()));
    }

    let path = args::resolve_path(raw)?;
    let display = path.display().to_string();
    let content = tokio::fs::read_to_string(&path)
        .await
        .map_err(|source| ToolError::Io {
            path: display.clone(),
            source,
        })?;

    let (updated, replacements) = match replace(&content, old, new, replace_all) {
        Ok(edit) => edit,
        Err(reason) => return Ok(ToolResult::failure(data! { "path" => display }, reason)),
    };

    tokio::fs::write(&path, updated)
        .await
        .map_err(|source| ToolError::Io {
            path: display.clone(),
            source,
        })?;

    Ok(ToolResult::ok(data! {
        "path" => display,
        "replacements" => replacements,
    }))
}

/// Apply the edit in memory, or explain why it cannot be applied.
fn replace(content: &str, old: &str, new: &str, replace_all: bool) -> Result<(String, usize), String> {
    let occurrences = content.matches(old).count();
    match occurrences {
        0 => Err("old_string not found in file".into()),
        n if n > 1 && !replace_all => Err(format!(
            "old_string found {n} times. Use replace_all: true to replace all, or provide a more unique string."
        )),
        n if replace_all => Ok((content.replace(old, new), n)),
        _ => Ok((content.replacen(old, new, 1), 1)),
    }
}

pub fn running(args: &Args) -> String {
    format!("Editing file: {}", args::display(args, "path"))
}

pub fn completed(args: &Args, result: &ToolResult) -> String {
    let path = args::display(args, "path");
    if !result.success {
        return format!("Failed to edit file: {path}");
    }
    let n = result.data.get("replacements").and_then(|v| v.as_u64()).unwrap_or(0);
    let plural = if n == 1 { "" } else { "s" };
    format!("Edited file: {path} ({n} replacement{plural})")
}
