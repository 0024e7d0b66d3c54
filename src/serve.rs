//! Line-delimited JSON tool server
//!
//! Each input line is one request:
//!
//! ```text
//! {"id": 1, "tool": "git-file-diff", "arguments": {"file_path": "a.txt", "commits_back": 1}}
//! ```
//!
//! and produces exactly one output line:
//!
//! ```text
//! {"id": 1, "content": "<rendered text>", "is_error": false}
//! ```
//!
//! The repository is opened fresh for every request, so no object cache
//! outlives a single query. Failures become `is_error` responses and never
//! stop the loop; only end of input or an I/O error on the streams does.

use crate::areas::repository::Repository;
use crate::commands::list_history::DEFAULT_HISTORY_LIMIT;
use crate::errors::GitError;
use crate::report;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

pub const TOOL_LOG: &str = "git-log";
pub const TOOL_CHANGED_FILES: &str = "git-changed-files";
pub const TOOL_FILE_DIFF: &str = "git-file-diff";
pub const TOOL_FILE_HISTORY: &str = "git-file-history";

#[derive(Debug, Clone, Deserialize)]
pub struct ToolRequest {
    #[serde(default)]
    pub id: Value,
    pub tool: String,
    #[serde(default)]
    pub arguments: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    pub id: Value,
    pub content: String,
    pub is_error: bool,
}

impl ToolResponse {
    fn ok(id: Value, content: String) -> Self {
        ToolResponse {
            id,
            content,
            is_error: false,
        }
    }

    fn error(id: Value, content: String) -> Self {
        ToolResponse {
            id,
            content,
            is_error: true,
        }
    }
}

/// Serve requests from `reader` until end of input.
pub async fn run<R, W>(repository_path: &Path, reader: R, mut writer: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    colored::control::set_override(false);
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<ToolRequest>(&line) {
            Ok(request) => dispatch(repository_path, request).await,
            Err(e) => {
                tracing::warn!(error = %e, "malformed request");
                ToolResponse::error(Value::Null, format!("Invalid request: {e}"))
            }
        };

        let mut encoded = serde_json::to_string(&response).map_err(std::io::Error::other)?;
        encoded.push('\n');
        writer.write_all(encoded.as_bytes()).await?;
        writer.flush().await?;
    }

    Ok(())
}

/// Run one tool call against a freshly opened repository.
#[tracing::instrument(skip(repository_path, request), fields(tool = %request.tool))]
pub async fn dispatch(repository_path: &Path, request: ToolRequest) -> ToolResponse {
    let id = request.id.clone();

    let repository = match Repository::open(repository_path) {
        Ok(repository) => repository,
        Err(e) => return ToolResponse::error(id, format!("Error opening repository: {e}")),
    };

    let result = match request.tool.as_str() {
        TOOL_LOG => git_log(&repository, &request),
        TOOL_CHANGED_FILES => git_changed_files(&repository, &request),
        TOOL_FILE_DIFF => git_file_diff(&repository, &request),
        TOOL_FILE_HISTORY => git_file_history(&repository, &request).await,
        other => Err(format!("Unknown tool: {other}")),
    };

    match result {
        Ok(content) => ToolResponse::ok(id, content),
        Err(content) => {
            tracing::debug!(%content, "tool call failed");
            ToolResponse::error(id, content)
        }
    }
}

fn number_argument(request: &ToolRequest, name: &str) -> Result<Option<usize>, String> {
    match request.arguments.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .or_else(|| value.as_f64().filter(|n| *n >= 0.0 && n.fract() == 0.0).map(|n| n as u64))
            .map(|n| Some(n as usize))
            .ok_or_else(|| format!("Argument {name} must be a non-negative integer")),
    }
}

fn required_number(request: &ToolRequest, name: &str) -> Result<usize, String> {
    number_argument(request, name)?.ok_or_else(|| format!("Missing required argument: {name}"))
}

fn required_path(request: &ToolRequest, name: &str) -> Result<PathBuf, String> {
    request
        .arguments
        .get(name)
        .and_then(Value::as_str)
        .filter(|path| !path.is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| format!("Missing required argument: {name}"))
}

fn describe(context: &str, e: GitError) -> String {
    format!("{context}: {e}")
}

fn git_log(repository: &Repository, request: &ToolRequest) -> Result<String, String> {
    let limit = number_argument(request, "limit")?.unwrap_or(DEFAULT_HISTORY_LIMIT);

    repository
        .list_history(limit)
        .map(|commits| report::render_history(&commits))
        .map_err(|e| describe("Error getting commit history", e))
}

fn git_changed_files(repository: &Repository, request: &ToolRequest) -> Result<String, String> {
    let commits_back = required_number(request, "commits_back")?;

    repository
        .list_changed_files(commits_back)
        .map(|changes| report::render_changed_files(&changes, commits_back))
        .map_err(|e| describe("Error getting changes", e))
}

fn git_file_diff(repository: &Repository, request: &ToolRequest) -> Result<String, String> {
    let path = required_path(request, "file_path")?;
    let commits_back = required_number(request, "commits_back")?;

    repository
        .file_diff(&path, commits_back)
        .map(|diff| report::render_file_diff(&diff))
        .map_err(|e| describe("Error getting changes", e))
}

async fn git_file_history(repository: &Repository, request: &ToolRequest) -> Result<String, String> {
    let path = required_path(request, "file_path")?;

    repository
        .file_history(&path, None)
        .await
        .map(|revisions| report::render_file_history(&path, &revisions))
        .map_err(|e| describe("Error iterating commits", e))
}
