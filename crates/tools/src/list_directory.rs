//! Directory listing, optionally recursive.

use std::path::Path;

use quill_core::data;
use quill_core::error::ToolError;
use quill_core::tool::{ParamType, ToolParameter, ToolResult, ToolSpec};
use serde_json::{Map, Value, json};

use crate::args::{self, Args};
use crate::walk;

const DEFAULT_MAX_DEPTH: u64 = 3;

pub const SPEC: ToolSpec = ToolSpec {
    name: "list_directory",
    description: "List files and directories in a given path",
    parameters: &[
        ToolParameter {
            name: "path",
            param_type: ParamType::String,
            description: "The path to the directory to list (absolute or relative to current working directory)",
            required: true,
        },
        ToolParameter {
            name: "recursive",
            param_type: ParamType::Boolean,
            description: "Whether to list recursively (default: false)",
            required: false,
        },
        ToolParameter {
            name: "max_depth",
            param_type: ParamType::Integer,
            description: "Maximum depth for recursive listing (default: 3)",
            required: false,
        },
    ],
};

pub async fn run(args: &Args) -> Result<ToolResult, ToolError> {
    let raw = args::required_str(args, "path")?;
    let path = args::resolve_path(raw)?;
    let recursive = args::optional_bool(args, "recursive").unwrap_or(false);
    let max_depth = args::optional_u64(args, "max_depth")
        .or_else(|| args::optional_u64(args, "maxDepth"))
        .unwrap_or(DEFAULT_MAX_DEPTH) as usize;

    let listed = path.clone();
    let entries = walk::blocking(move || {
        if recursive {
            // The top level must exist; unreadable subdirectories are skipped.
            std::fs::read_dir(&listed).map_err(|source| ToolError::Io {
                path: listed.display().to_string(),
                source,
            })?;
            Ok(list_recursive(&listed, 0, max_depth))
        } else {
            list_flat(&listed)
        }
    })
    .await?;

    Ok(ToolResult::ok(data! {
        "path" => path.display().to_string(),
        "entries" => entries,
    }))
}

/// Names in `dir` sorted, with dot-entries removed.
fn sorted_names(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut names: Vec<String> = std::fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| !n.starts_with('.'))
        .collect();
    names.sort();
    Ok(names)
}

fn entry(name: &str, full: &Path, metadata: &std::fs::Metadata) -> Map<String, Value> {
    let mut e = data! {
        "name" => name,
        "path" => full.display().to_string(),
        "type" => if metadata.is_dir() { "directory" } else { "file" },
    };
    if metadata.is_file() {
        e.insert("size".into(), json!(metadata.len()));
    }
    e
}

fn list_flat(dir: &Path) -> Result<Vec<Value>, ToolError> {
    let names = sorted_names(dir).map_err(|source| ToolError::Io {
        path: dir.display().to_string(),
        source,
    })?;

    Ok(names
        .iter()
        .map(|name| {
            let full = dir.join(name);
            match std::fs::metadata(&full) {
                Ok(meta) => Value::Object(entry(name, &full, &meta)),
                Err(_) => json!({
                    "name": name,
                    "path": full.display().to_string(),
                    "type": "unknown",
                }),
            }
        })
        .collect())
}

fn list_recursive(dir: &Path, depth: usize, max_depth: usize) -> Vec<Value> {
    let Ok(names) = sorted_names(dir) else {
        return Vec::new();
    };

    names
        .iter()
        .filter(|name| name.as_str() != "node_modules")
        .filter_map(|name| {
            let full = dir.join(name);
            let meta = std::fs::metadata(&full).ok()?;
            let mut e = entry(name, &full, &meta);
            if meta.is_dir() && depth < max_depth {
                e.insert("children".into(), Value::Array(list_recursive(&full, depth + 1, max_depth)));
            }
            Some(Value::Object(e))
        })
        .collect()
}

pub fn running(args: &Args) -> String {
    format!("Listing directory: {}", args::display(args, "path"))
}

pub fn completed(args: &Args, result: &ToolResult) -> String {
    let path = args::display(args, "path");
    if result.success {
        let n = result.data.get("entries").and_then(Value::as_array).map_or(0, Vec::len);
        format!("Listed directory: {path} ({n} entries)")
    } else {
        format!("Failed to list directory: {path}")
    }
}
