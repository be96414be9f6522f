//! Pull-request queries through the GitHub CLI (`gh`).

use quill_core::data;
use quill_core::error::ToolError;
use quill_core::tool::{ParamType, ToolParameter, ToolResult, ToolSpec};
use serde_json::{Map, Value, json};

use crate::args::{self, Args};
use crate::process;

const VIEW_FIELDS: &str =
    "number,title,body,author,state,url,additions,deletions,baseRefName,headRefName,createdAt,updatedAt";
const CHECK_FIELDS: &str = "name,state,conclusion,description";

pub const SPEC: ToolSpec = ToolSpec {
    name: "github_pr",
    description: "Interact with GitHub Pull Requests using the gh CLI. Supports viewing PR details, diffs, changed files, comments, and CI status.",
    parameters: &[
        ToolParameter {
            name: "action",
            param_type: ParamType::String,
            description: "The action to perform: \"view\" (PR metadata), \"diff\" (full diff), \"files\" (changed files), \"comments\" (review comments), \"checks\" (CI status)",
            required: true,
        },
        ToolParameter {
            name: "pr_number",
            param_type: ParamType::Integer,
            description: "The PR number. If omitted, uses the current branch's PR.",
            required: false,
        },
        ToolParameter {
            name: "repo",
            param_type: ParamType::String,
            description: "Repository in owner/repo format. Defaults to current repository.",
            required: false,
        },
    ],
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    View,
    Diff,
    Files,
    Comments,
    Checks,
}

impl Action {
    fn parse(s: &str) -> Result<Self, ToolError> {
        match s {
            "view" => Ok(Self::View),
            "diff" => Ok(Self::Diff),
            "files" => Ok(Self::Files),
            "comments" => Ok(Self::Comments),
            "checks" => Ok(Self::Checks),
            other => Err(ToolError::InvalidArguments(format!(
                "Unknown action: {other}. Valid actions are: view, diff, files, comments, checks"
            ))),
        }
    }

    /// Full `gh` argument vector for this action.
    fn gh_args(self, pr_number: Option<u64>, repo: Option<&str>) -> Vec<String> {
        let mut argv: Vec<String> = match self {
            Self::Diff => vec!["pr".into(), "diff".into()],
            Self::Checks => vec!["pr".into(), "checks".into()],
            _ => vec!["pr".into(), "view".into()],
        };
        if let Some(n) = pr_number {
            argv.push(n.to_string());
        }
        if let Some(repo) = repo {
            argv.extend(["--repo".to_string(), repo.to_string()]);
        }
        let fields = match self {
            Self::View => Some(VIEW_FIELDS),
            Self::Files => Some("files"),
            Self::Comments => Some("comments,reviews"),
            Self::Checks => Some(CHECK_FIELDS),
            Self::Diff => None,
        };
        if let Some(fields) = fields {
            argv.extend(["--json".to_string(), fields.to_string()]);
        }
        argv
    }
}

pub async fn run(args: &Args) -> Result<ToolResult, ToolError> {
    let action = Action::parse(args::required_str(args, "action")?)?;
    let pr_number = args::optional_u64(args, "pr_number");
    let repo = args::optional_str(args, "repo");

    let gh_installed = process::run("gh", &["--version"], None)
        .await
        .is_ok_and(|out| out.success);
    if !gh_installed {
        return Ok(ToolResult::failure(
            Map::new(),
            "GitHub CLI (gh) is not installed. Install it from https://cli.github.com/",
        ));
    }

    let argv = action.gh_args(pr_number, repo);
    let argv: Vec<&str> = argv.iter().map(String::as_str).collect();
    let out = process::run("gh", &argv, None).await?;

    // `gh pr checks` exits non-zero when any check failed but still prints JSON.
    let usable = out.success || (action == Action::Checks && !out.stdout.is_empty());
    if !usable {
        let error = if out.stderr.is_empty() {
            format!("gh exited with status {}", out.exit_code.unwrap_or(-1))
        } else {
            out.stderr
        };
        return Ok(ToolResult::failure(Map::new(), error));
    }

    let data = match action {
        Action::Diff => data! { "diff" => out.stdout },
        Action::View => shape_view(&parse(&out.stdout)?),
        Action::Files => shape_files(&parse(&out.stdout)?),
        Action::Comments => shape_comments(&parse(&out.stdout)?),
        Action::Checks => shape_checks(&parse(&out.stdout)?),
    };
    Ok(ToolResult::ok(data))
}

fn parse(stdout: &str) -> Result<Value, ToolError> {
    serde_json::from_str(stdout).map_err(|e| ToolError::Parse {
        what: "gh output".into(),
        reason: e.to_string(),
    })
}

/// `author` is an object with a login; flatten it to the login.
fn login(author: &Value) -> Value {
    author.get("login").cloned().unwrap_or_else(|| author.clone())
}

fn shape_view(pr: &Value) -> Map<String, Value> {
    data! {
        "pr" => json!({
            "number": pr["number"],
            "title": pr["title"],
            "body": pr["body"],
            "author": login(&pr["author"]),
            "state": pr["state"],
            "url": pr["url"],
            "additions": pr["additions"],
            "deletions": pr["deletions"],
            "base": pr["baseRefName"],
            "head": pr["headRefName"],
            "createdAt": pr["createdAt"],
            "updatedAt": pr["updatedAt"],
        }),
    }
}

fn shape_files(raw: &Value) -> Map<String, Value> {
    let files: Vec<Value> = raw["files"]
        .as_array()
        .map(|files| {
            files
                .iter()
                .map(|f| json!({"path": f["path"], "additions": f["additions"], "deletions": f["deletions"]}))
                .collect()
        })
        .unwrap_or_default();
    let total = |key: &str| files.iter().filter_map(|f| f[key].as_u64()).sum::<u64>();

    data! {
        "count" => files.len(),
        "totalAdditions" => total("additions"),
        "totalDeletions" => total("deletions"),
        "files" => files,
    }
}

fn shape_comments(raw: &Value) -> Map<String, Value> {
    let list = |key: &str, shape: &dyn Fn(&Value) -> Value| -> Vec<Value> {
        raw[key]
            .as_array()
            .map(|items| items.iter().map(shape).collect())
            .unwrap_or_default()
    };
    let comments = list("comments", &|c| {
        json!({"author": login(&c["author"]), "body": c["body"], "createdAt": c["createdAt"]})
    });
    let reviews = list("reviews", &|r| {
        json!({"author": login(&r["author"]), "state": r["state"], "body": r["body"], "createdAt": r["submittedAt"]})
    });

    data! {
        "commentCount" => comments.len(),
        "reviewCount" => reviews.len(),
        "comments" => comments,
        "reviews" => reviews,
    }
}

fn shape_checks(raw: &Value) -> Map<String, Value> {
    let checks: Vec<Value> = raw
        .as_array()
        .map(|checks| {
            checks
                .iter()
                .map(|c| json!({"name": c["name"], "state": c["state"], "conclusion": c["conclusion"], "description": c["description"]}))
                .collect()
        })
        .unwrap_or_default();
    let count = |pred: &dyn Fn(&Value) -> bool| checks.iter().filter(|c| pred(c)).count();

    let summary = json!({
        "total": checks.len(),
        "passed": count(&|c| c["conclusion"] == "success"),
        "failed": count(&|c| c["conclusion"] == "failure"),
        "pending": count(&|c| c["state"] == "pending" || c["state"] == "queued"),
    });
    data! { "checks" => checks, "summary" => summary }
}

fn pr_label(args: &Args) -> String {
    match args::optional_u64(args, "pr_number") {
        Some(n) => format!("PR #{n}"),
        None => "current PR".to_string(),
    }
}

pub fn running(args: &Args) -> String {
    format!("Fetching {} for {}", args::display(args, "action"), pr_label(args))
}

pub fn completed(args: &Args, result: &ToolResult) -> String {
    let action = args::display(args, "action");
    if result.success {
        format!("Fetched {action} for {}", pr_label(args))
    } else {
        format!("Failed to fetch {action} for {}", pr_label(args))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_argument_vectors() {
        assert_eq!(
            Action::Diff.gh_args(Some(42), Some("octo/repo")),
            vec!["pr", "diff", "42", "--repo", "octo/repo"]
        );
        assert_eq!(Action::Files.gh_args(None, None), vec!["pr", "view", "--json", "files"]);
        assert_eq!(
            Action::Checks.gh_args(Some(7), None),
            vec!["pr", "checks", "7", "--json", CHECK_FIELDS]
        );
        assert_eq!(Action::View.gh_args(None, None).last().map(String::as_str), Some(VIEW_FIELDS));
    }

    #[tokio::test]
    async fn unknown_action_is_invalid() {
        let a = json!({"action": "merge"}).as_object().cloned().unwrap();
        let err = run(&a).await.unwrap_err();
        assert!(err.to_string().contains("Unknown action: merge"));
    }

    #[test]
    fn view_flattens_author_and_refs() {
        let raw = json!({
            "number": 12, "title": "Fix it", "body": "", "author": {"login": "octocat"},
            "state": "OPEN", "url": "https://github.com/o/r/pull/12", "additions": 3, "deletions": 1,
            "baseRefName": "main", "headRefName": "fix", "createdAt": "2025-01-01T00:00:00Z",
            "updatedAt": "2025-01-02T00:00:00Z"
        });
        let data = shape_view(&raw);
        assert_eq!(data["pr"]["author"], "octocat");
        assert_eq!(data["pr"]["base"], "main");
        assert_eq!(data["pr"]["head"], "fix");
    }

    #[test]
    fn files_are_totalled() {
        let raw = json!({"files": [
            {"path": "a.rs", "additions": 10, "deletions": 2},
            {"path": "b.rs", "additions": 5, "deletions": 0}
        ]});
        let data = shape_files(&raw);
        assert_eq!(data["count"], 2);
        assert_eq!(data["totalAdditions"], 15);
        assert_eq!(data["totalDeletions"], 2);
    }

    #[test]
    fn comments_and_reviews_counted() {
        let raw = json!({
            "comments": [{"author": {"login": "a"}, "body": "nit", "createdAt": "t1"}],
            "reviews": [
                {"author": {"login": "b"}, "state": "APPROVED", "body": "", "submittedAt": "t2"},
                {"author": {"login": "c"}, "state": "COMMENTED", "body": "hm", "submittedAt": "t3"}
            ]
        });
        let data = shape_comments(&raw);
        assert_eq!(data["commentCount"], 1);
        assert_eq!(data["reviewCount"], 2);
        assert_eq!(data["reviews"][0]["createdAt"], "t2");
    }

    #[test]
    fn checks_summary() {
        let raw = json!([
            {"name": "build", "state": "completed", "conclusion": "success", "description": ""},
            {"name": "lint", "state": "completed", "conclusion": "failure", "description": ""},
            {"name": "e2e", "state": "queued", "conclusion": null, "description": ""}
        ]);
        let data = shape_checks(&raw);
        assert_eq!(data["summary"], json!({"total": 3, "passed": 1, "failed": 1, "pending": 1}));
    }

    #[test]
    fn narration_labels() {
        let a = json!({"action": "diff", "pr_number": 9}).as_object().cloned().unwrap();
        assert_eq!(running(&a), "Fetching diff for PR #9");
        let b = json!({"action": "checks"}).as_object().cloned().unwrap();
        assert_eq!(
            completed(&b, &ToolResult::failure(Map::new(), "x")),
            "Failed to fetch checks for current PR"
        );
    }
}
