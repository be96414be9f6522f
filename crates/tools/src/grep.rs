//! Regex content search over the working tree.

use std::path::PathBuf;

use quill_core::data;
use quill_core::error::ToolError;
use quill_core::tool::{ParamType, ToolParameter, ToolResult, ToolSpec};
use regex::{Regex, RegexBuilder};
use serde_json::{Value, json};

use crate::args::{self, Args};
use crate::walk;

const DEFAULT_MAX_RESULTS: u64 = 50;

pub const SPEC: ToolSpec = ToolSpec {
    name: "grep",
    description: "Search for a regex pattern in files. Returns matching lines with file paths and line numbers.",
    parameters: &[
        ToolParameter {
            name: "pattern",
            param_type: ParamType::String,
            description: "The regex pattern to search for",
            required: true,
        },
        ToolParameter {
            name: "path",
            param_type: ParamType::String,
            description: "The directory or file to search in (default: current directory)",
            required: false,
        },
        ToolParameter {
            name: "file_pattern",
            param_type: ParamType::String,
            description: "Glob pattern to filter files (e.g., \"*.ts\", \"*.{js,jsx}\")",
            required: false,
        },
        ToolParameter {
            name: "case_insensitive",
            param_type: ParamType::Boolean,
            description: "Whether to search case-insensitively (default: false)",
            required: false,
        },
        ToolParameter {
            name: "max_results",
            param_type: ParamType::Integer,
            description: "Maximum number of results to return (default: 50)",
            required: false,
        },
        ToolParameter {
            name: "context_lines",
            param_type: ParamType::Integer,
            description: "Number of context lines before and after each match (default: 0)",
            required: false,
        },
    ],
};

pub async fn run(args: &Args) -> Result<ToolResult, ToolError> {
    let pattern = args::required_str(args, "pattern")?;
    let regex = RegexBuilder::new(pattern)
        .case_insensitive(args::optional_bool(args, "case_insensitive").unwrap_or(false))
        .build()
        .map_err(|e| ToolError::InvalidArguments(format!("invalid regex: {e}")))?;

    let root = args::resolve_path(args::optional_str(args, "path").unwrap_or("."))?;
    let file_pattern = args::optional_str(args, "file_pattern").map(str::to_string);
    let max_results = args::optional_u64(args, "max_results").unwrap_or(DEFAULT_MAX_RESULTS) as usize;
    let context = args::optional_u64(args, "context_lines").unwrap_or(0) as usize;

    let matches = walk::blocking(move || {
        let files = walk::files(&root, file_pattern.as_deref(), None)?;
        Ok(search(&regex, &files, max_results, context))
    })
    .await?;

    Ok(ToolResult::ok(data! {
        "match_count" => matches.len(),
        "matches" => matches,
    }))
}

/// Collect up to `max` matching lines across `files`.
///
/// Files that are unreadable or not UTF-8 are skipped.
fn search(regex: &Regex, files: &[PathBuf], max: usize, context: usize) -> Vec<Value> {
    let mut matches = Vec::new();
    for file in files {
        let Ok(text) = std::fs::read_to_string(file) else {
            continue;
        };
        let lines: Vec<&str> = text.lines().collect();
        for (i, line) in lines.iter().enumerate() {
            if matches.len() >= max {
                return matches;
            }
            if !regex.is_match(line) {
                continue;
            }
            let mut entry = json!({
                "file": file.display().to_string(),
                "line": i + 1,
                "content": line,
            });
            if context > 0 {
                entry["before"] = json!(lines[i.saturating_sub(context)..i]);
                entry["after"] = json!(lines[i + 1..(i + 1 + context).min(lines.len())]);
            }
            matches.push(entry);
        }
    }
    matches
}

pub fn running(args: &Args) -> String {
    format!("Searching for: {}", args::display(args, "pattern"))
}

pub fn completed(args: &Args, result: &ToolResult) -> String {
    let pattern = args::display(args, "pattern");
    if result.success {
        let n = result.data.get("match_count").and_then(Value::as_u64).unwrap_or(0);
        format!("Found {n} matches for: {pattern}")
    } else {
        format!("Search failed for: {pattern}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/lib.rs"), "// TODO: one\nfn a() {}\n// todo: two\n").unwrap();
        std::fs::write(dir.path().join("notes.md"), "TODO in docs\n").unwrap();
        std::fs::write(dir.path().join("blob.bin"), [0xff, 0xfe, b'T', b'O', b'D', b'O']).unwrap();
        dir
    }

    fn search_args(dir: &tempfile::TempDir, extra: Value) -> Args {
        let mut a = json!({"pattern": "TODO", "path": dir.path().to_str().unwrap()})
            .as_object()
            .cloned()
            .unwrap();
        if let Some(extra) = extra.as_object() {
            a.extend(extra.clone());
        }
        a
    }

    #[tokio::test]
    async fn finds_matches_with_line_numbers() {
        let dir = project();
        let a = search_args(&dir, json!({}));
        let result = run(&a).await.unwrap();
        assert!(result.success);
        // Non-UTF-8 file is skipped; lowercase "todo" does not match
        assert_eq!(result.data["match_count"], 2);
        let first = &result.data["matches"][0];
        assert!(first["file"].as_str().unwrap().ends_with("notes.md"));
        assert_eq!(first["line"], 1);
        assert_eq!(completed(&a, &result), "Found 2 matches for: TODO");
    }

    #[tokio::test]
    async fn case_insensitive_and_file_filter() {
        let dir = project();
        let result = run(&search_args(&dir, json!({"case_insensitive": true, "file_pattern": "*.rs"})))
            .await
            .unwrap();
        assert_eq!(result.data["match_count"], 2);
        assert_eq!(result.data["matches"][1]["line"], 3);
    }

    #[tokio::test]
    async fn max_results_caps_output() {
        let dir = project();
        let result = run(&search_args(&dir, json!({"case_insensitive": true, "max_results": 1})))
            .await
            .unwrap();
        assert_eq!(result.data["match_count"], 1);
    }

    #[tokio::test]
    async fn context_lines_attached() {
        let dir = project();
        let result = run(&search_args(&dir, json!({"file_pattern": "*.rs", "context_lines": 1})))
            .await
            .unwrap();
        let m = &result.data["matches"][0];
        assert_eq!(m["before"], json!([]));
        assert_eq!(m["after"], json!(["fn a() {}"]));
    }

    #[tokio::test]
    async fn invalid_regex_is_rejected() {
        let dir = project();
        let err = run(&search_args(&dir, json!({"pattern": "(unclosed"}))).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
