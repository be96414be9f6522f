//! Argument extraction shared by every capability.
//!
//! Models are loose with JSON types (numbers as strings, "true" as a string),
//! so the optional accessors accept both spellings.

use std::path::PathBuf;

use quill_core::error::ToolError;
use serde_json::{Map, Value};

pub type Args = Map<String, Value>;

pub fn required_str<'a>(args: &'a Args, name: &str) -> Result<&'a str, ToolError> {
    match args.get(name) {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(ToolError::InvalidArguments(format!(
            "'{name}' must be a string, got {other}"
        ))),
        None => Err(ToolError::InvalidArguments(format!(
            "Missing '{name}' argument"
        ))),
    }
}

pub fn optional_str<'a>(args: &'a Args, name: &str) -> Option<&'a str> {
    args.get(name).and_then(Value::as_str).filter(|s| !s.is_empty())
}

pub fn optional_bool(args: &Args, name: &str) -> Option<bool> {
    match args.get(name)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

pub fn optional_u64(args: &Args, name: &str) -> Option<u64> {
    match args.get(name)? {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f.max(0.0) as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Display form of an argument for narration. Never fails.
pub fn display(args: &Args, name: &str) -> String {
    match args.get(name) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Resolve a possibly-relative path against the working directory.
pub fn resolve_path(path: &str) -> Result<PathBuf, ToolError> {
    std::path::absolute(path).map_err(|source| ToolError::Io {
        path: path.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> Args {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn required_str_reports_missing_and_wrong_type() {
        let a = args(json!({"path": 3}));
        assert!(required_str(&a, "path").unwrap_err().to_string().contains("must be a string"));
        assert!(required_str(&a, "command").unwrap_err().to_string().contains("Missing 'command'"));
    }

    #[test]
    fn lenient_scalars() {
        let a = args(json!({"a": "true", "b": false, "n": "25", "m": 7, "f": 2.9}));
        assert_eq!(optional_bool(&a, "a"), Some(true));
        assert_eq!(optional_bool(&a, "b"), Some(false));
        assert_eq!(optional_bool(&a, "missing"), None);
        assert_eq!(optional_u64(&a, "n"), Some(25));
        assert_eq!(optional_u64(&a, "m"), Some(7));
        assert_eq!(optional_u64(&a, "f"), Some(2));
    }

    #[test]
    fn display_handles_any_shape() {
        let a = args(json!({"s": "ls -la", "n": 42, "z": null}));
        assert_eq!(display(&a, "s"), "ls -la");
        assert_eq!(display(&a, "n"), "42");
        assert_eq!(display(&a, "z"), "");
        assert_eq!(display(&a, "missing"), "");
    }

    #[test]
    fn relative_paths_become_absolute() {
        let resolved = resolve_path("some/file.txt").unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("some/file.txt"));
    }
}
