//! Text and JSON rendering of command results
//!
//! Text output is colored through `colored`; whether escape codes are
//! actually emitted is decided once by the binary (terminal detection or
//! `colored::control::set_override`).

use crate::artifacts::diff::line_diff::{DEFAULT_CONTEXT_LINES, Hunk, LineEdit};
use crate::artifacts::diff::myers::Edit;
use crate::artifacts::diff::tree_diff::{ChangeKind, ChangeSet, TreeChange};
use crate::artifacts::objects::entry_mode::{EntryMode, FileMode};
use crate::commands::CommitSummary;
use crate::commands::file_diff::{FileDiff, FilePatch};
use crate::commands::file_history::FileRevision;
use colored::Colorize;
use serde::Serialize;
use std::fmt::Write;
use std::path::Path;

const SEPARATOR: &str = "----------------------------------------";
const NO_NEWLINE_MARKER: &str = "\\ No newline at end of file";
const MEDIUM_DATE_FORMAT: &str = "%a %b %-d %H:%M:%S %Y %z";
const DEFAULT_FILE_MODE: EntryMode = EntryMode::File(FileMode::Regular);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

pub fn render_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string_pretty(value)
}

pub fn render_history(commits: &[CommitSummary]) -> String {
    let mut out = String::from("Git History:\n\n");

    for commit in commits {
        let _ = writeln!(out, "{} {}", "Commit:".bold(), commit.oid.to_string().yellow());
        let _ = writeln!(out, "Author: {}", commit.author);
        let _ = writeln!(out, "Date: {}", commit.date);
        let _ = writeln!(out, "Message: {}", commit.summary);
        let _ = writeln!(out, "{SEPARATOR}");
    }

    out
}

fn colored_kind(kind: ChangeKind) -> colored::ColoredString {
    match kind {
        ChangeKind::Added => kind.as_str().green(),
        ChangeKind::Modified => kind.as_str().yellow(),
        ChangeKind::Deleted => kind.as_str().red(),
    }
}

pub fn render_changed_files<'c>(
    changes: impl IntoIterator<Item = (&'c std::path::PathBuf, &'c TreeChange)>,
    commits_back: usize,
) -> String {
    let mut out = format!("Files changed in the last {commits_back} commits:\n\n");

    for (path, change) in changes {
        let _ = writeln!(out, "[{}] {}", colored_kind(change.kind()), path.display());
    }

    out
}

/// Flat list of changed paths, for JSON output
#[derive(Debug, Serialize)]
pub struct ChangedFile<'c> {
    pub path: &'c Path,
    pub kind: ChangeKind,
}

pub fn changed_file_list(changes: &ChangeSet) -> Vec<ChangedFile<'_>> {
    changes
        .iter()
        .map(|(path, change)| ChangedFile {
            path,
            kind: change.kind(),
        })
        .collect()
}

pub fn render_file_diff(diff: &FileDiff) -> String {
    match diff {
        FileDiff::Changed(patch) => render_patch(patch),
        FileDiff::Unchanged { path } => {
            format!("No changes found for file: {}\n", path.display())
        }
    }
}

pub fn render_patch(patch: &FilePatch) -> String {
    let path = patch.path.display();
    let mut out = String::new();

    let _ = writeln!(out, "{}", format!("diff --git a/{path} b/{path}").bold());
    match (patch.kind, patch.old_mode, patch.new_mode) {
        (ChangeKind::Added, _, new_mode) => {
            let mode = new_mode.unwrap_or(DEFAULT_FILE_MODE);
            let _ = writeln!(out, "{}", format!("new file mode {mode}").bold());
        }
        (ChangeKind::Deleted, old_mode, _) => {
            let mode = old_mode.unwrap_or(DEFAULT_FILE_MODE);
            let _ = writeln!(out, "{}", format!("deleted file mode {mode}").bold());
        }
        (ChangeKind::Modified, Some(old_mode), Some(new_mode)) if old_mode != new_mode => {
            let _ = writeln!(out, "{}", format!("old mode {old_mode}").bold());
            let _ = writeln!(out, "{}", format!("new mode {new_mode}").bold());
        }
        (ChangeKind::Modified, ..) => {}
    }

    if patch.binary {
        let _ = writeln!(out, "Binary files a/{path} and b/{path} differ");
        return out;
    }

    // an empty file added or deleted has no hunks and no file headers
    let hunks = Hunk::build(&patch.edits, DEFAULT_CONTEXT_LINES);
    if hunks.is_empty() {
        return out;
    }

    let old_name = match patch.kind {
        ChangeKind::Added => "/dev/null".to_string(),
        _ => format!("a/{path}"),
    };
    let new_name = match patch.kind {
        ChangeKind::Deleted => "/dev/null".to_string(),
        _ => format!("b/{path}"),
    };
    let _ = writeln!(out, "{}", format!("--- {old_name}").bold());
    let _ = writeln!(out, "{}", format!("+++ {new_name}").bold());

    for hunk in hunks {
        let _ = writeln!(out, "{}", hunk.header().cyan());
        for edit in &hunk.edits {
            render_edit(&mut out, edit);
        }
    }

    out
}

fn render_edit(out: &mut String, edit: &LineEdit) {
    let line = format!("{}{}", edit.symbol(), edit.value().to_text());
    let line = match edit {
        Edit::Insert { .. } => line.green(),
        Edit::Delete { .. } => line.red(),
        Edit::Equal { .. } => line.normal(),
    };
    let _ = writeln!(out, "{line}");

    if !edit.value().has_terminator() {
        let _ = writeln!(out, "{NO_NEWLINE_MARKER}");
    }
}

pub fn render_file_history(path: &Path, revisions: &[FileRevision]) -> String {
    if revisions.is_empty() {
        return format!("No history found for file: {}\n", path.display());
    }

    let mut out = String::new();
    for revision in revisions {
        let commit = &revision.commit;
        let _ = writeln!(out, "{}", format!("commit {}", commit.oid).yellow());
        let _ = writeln!(out, "Author: {} <{}>", commit.author, commit.email);
        let _ = writeln!(out, "Date:   {}", commit.timestamp.format(MEDIUM_DATE_FORMAT));
        let _ = writeln!(out);
        for line in commit.message.trim_end().lines() {
            let _ = writeln!(out, "    {line}");
        }
        let _ = writeln!(out);
        out.push_str(&render_patch(&revision.patch));
        let _ = writeln!(out);
    }

    out
}
