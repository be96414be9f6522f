//! Directory walking shared by `grep` and `glob`.
//!
//! Walks respect `.gitignore` (even outside a git repository) and skip
//! hidden entries, the way ripgrep and fd do.

use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use ignore::overrides::OverrideBuilder;
use quill_core::error::ToolError;

/// Files under `root`, sorted by path, optionally filtered by a gitignore-style glob.
///
/// Stops after `limit` files when one is given.
pub fn files(root: &Path, glob: Option<&str>, limit: Option<usize>) -> Result<Vec<PathBuf>, ToolError> {
    let mut builder = WalkBuilder::new(root);
    builder
        .hidden(true)
        .follow_links(false)
        .require_git(false)
        .sort_by_file_name(|a, b| a.cmp(b));

    if let Some(pattern) = glob {
        let mut overrides = OverrideBuilder::new(root);
        overrides.add(pattern).map_err(|e| ToolError::InvalidArguments(format!("invalid glob '{pattern}': {e}")))?;
        let overrides = overrides
            .build()
            .map_err(|e| ToolError::InvalidArguments(format!("invalid glob '{pattern}': {e}")))?;
        builder.overrides(overrides);
    }

    let mut out = Vec::new();
    for entry in builder.build() {
        let Ok(entry) = entry else {
            continue;
        };
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        // A whitelisting glob bypasses the walker's own hidden filter.
        if is_hidden(entry.path().strip_prefix(root).unwrap_or(entry.path())) {
            continue;
        }
        out.push(entry.into_path());
        if limit.is_some_and(|l| out.len() >= l) {
            break;
        }
    }
    Ok(out)
}

fn is_hidden(relative: &Path) -> bool {
    relative
        .components()
        .any(|c| c.as_os_str().to_string_lossy().starts_with('.'))
}

/// Run a blocking walk off the async runtime.
pub async fn blocking<T, F>(f: F) -> Result<T, ToolError>
where
    F: FnOnce() -> Result<T, ToolError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ToolError::ExecutionFailed(format!("search task failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("src/nested")).unwrap();
        std::fs::create_dir_all(root.join("target")).unwrap();
        std::fs::write(root.join("src/main.rs"), "fn main() {}").unwrap();
        std::fs::write(root.join("src/nested/util.rs"), "pub fn util() {}").unwrap();
        std::fs::write(root.join("README.md"), "# readme").unwrap();
        std::fs::write(root.join(".hidden.rs"), "secret").unwrap();
        std::fs::write(root.join("target/build.rs"), "ignored").unwrap();
        std::fs::write(root.join(".gitignore"), "target/\n").unwrap();
        dir
    }

    #[test]
    fn respects_gitignore_and_hidden() {
        let dir = tree();
        let found = files(dir.path(), None, None).unwrap();
        let names: Vec<_> = found.iter().map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf()).collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("README.md"),
                PathBuf::from("src/main.rs"),
                PathBuf::from("src/nested/util.rs"),
            ]
        );
    }

    #[test]
    fn glob_filters_at_any_depth() {
        let dir = tree();
        let found = files(dir.path(), Some("*.rs"), None).unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|p| p.extension().is_some_and(|e| e == "rs")));
    }

    #[test]
    fn limit_stops_early() {
        let dir = tree();
        assert_eq!(files(dir.path(), None, Some(1)).unwrap().len(), 1);
    }

    #[test]
    fn bad_glob_is_invalid_argument() {
        let dir = tree();
        assert!(matches!(files(dir.path(), Some("src/[oops"), None), Err(ToolError::InvalidArguments(_))));
    }
}
