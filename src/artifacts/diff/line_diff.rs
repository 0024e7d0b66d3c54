//! Line-level content diff
//!
//! Blob content is split into lines that keep their exact terminator: every
//! line but possibly the last ends in `\n`, and a last line without one is a
//! distinct value (`a` and `a\n` never compare equal). Concatenating the
//! Equal and Delete lines of a diff therefore rebuilds the old content byte
//! for byte, and Equal plus Insert rebuilds the new content.

use crate::artifacts::diff::myers::{DiffAlgorithm, Edit, MyersDiff};
use bytes::Bytes;
use serde::{Serialize, Serializer};

/// Number of unchanged lines shown around each change
pub const DEFAULT_CONTEXT_LINES: usize = 3;

/// One line of blob content, sharing the blob's buffer
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Line {
    text: Bytes,
}

impl Line {
    pub fn new(text: impl Into<Bytes>) -> Self {
        Line { text: text.into() }
    }

    /// Raw bytes, including the terminator when present
    pub fn as_bytes(&self) -> &[u8] {
        &self.text
    }

    /// Content without the trailing `\n`
    pub fn content(&self) -> &[u8] {
        self.text.strip_suffix(b"\n").unwrap_or(&self.text)
    }

    pub fn has_terminator(&self) -> bool {
        self.text.ends_with(b"\n")
    }

    /// Content without the terminator, lossily decoded for display
    pub fn to_text(&self) -> String {
        String::from_utf8_lossy(self.content()).into_owned()
    }
}

impl Serialize for Line {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&String::from_utf8_lossy(&self.text))
    }
}

pub type LineEdit = Edit<Line>;

/// Split `content` after every `\n`. The slices share `content`'s buffer.
pub fn split_lines(content: &Bytes) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut start = 0;

    for (i, byte) in content.iter().enumerate() {
        if *byte == b'\n' {
            lines.push(Line::new(content.slice(start..=i)));
            start = i + 1;
        }
    }
    if start < content.len() {
        lines.push(Line::new(content.slice(start..)));
    }

    lines
}

pub fn diff_lines(old: &Bytes, new: &Bytes) -> Vec<LineEdit> {
    let old_lines = split_lines(old);
    let new_lines = split_lines(new);

    MyersDiff::new(&old_lines, &new_lines).diff()
}

/// Rebuild one side of a diff: `old` from Equal+Delete, new from Equal+Insert.
pub fn reconstruct(edits: &[LineEdit], old: bool) -> Vec<u8> {
    edits
        .iter()
        .filter(|edit| match edit {
            Edit::Equal { .. } => true,
            Edit::Delete { .. } => old,
            Edit::Insert { .. } => !old,
        })
        .flat_map(|edit| edit.value().as_bytes().iter().copied())
        .collect()
}

/// A run of edits with its surrounding context, as shown in unified diffs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    pub old_start: usize,
    pub old_len: usize,
    pub new_start: usize,
    pub new_len: usize,
    pub edits: Vec<LineEdit>,
}

impl Hunk {
    /// Group `edits` into hunks, keeping `context` unchanged lines around
    /// every change and merging hunks whose context would overlap.
    pub fn build(edits: &[LineEdit], context: usize) -> Vec<Hunk> {
        let changes: Vec<usize> = edits
            .iter()
            .enumerate()
            .filter(|(_, edit)| !edit.is_equal())
            .map(|(i, _)| i)
            .collect();
        let Some(&first) = changes.first() else {
            return Vec::new();
        };

        let mut ranges = Vec::new();
        let mut start = first.saturating_sub(context);
        let mut end = (first + context + 1).min(edits.len());
        for &change in &changes[1..] {
            if change.saturating_sub(context) <= end {
                end = (change + context + 1).min(edits.len());
            } else {
                ranges.push((start, end));
                start = change.saturating_sub(context);
                end = (change + context + 1).min(edits.len());
            }
        }
        ranges.push((start, end));

        // line numbers (1-based) of the first edit in each range
        let mut hunks = Vec::with_capacity(ranges.len());
        let (mut old_line, mut new_line, mut cursor) = (1, 1, 0);
        for (start, end) in ranges {
            for edit in &edits[cursor..start] {
                match edit {
                    Edit::Equal { .. } => {
                        old_line += 1;
                        new_line += 1;
                    }
                    Edit::Delete { .. } => old_line += 1,
                    Edit::Insert { .. } => new_line += 1,
                }
            }

            let slice = &edits[start..end];
            let old_len = slice.iter().filter(|e| !matches!(e, Edit::Insert { .. })).count();
            let new_len = slice.iter().filter(|e| !matches!(e, Edit::Delete { .. })).count();

            hunks.push(Hunk {
                old_start: if old_len == 0 { old_line - 1 } else { old_line },
                old_len,
                new_start: if new_len == 0 { new_line - 1 } else { new_line },
                new_len,
                edits: slice.to_vec(),
            });

            old_line += old_len;
            new_line += new_len;
            cursor = end;
        }

        hunks
    }

    pub fn header(&self) -> String {
        format!(
            "@@ -{} +{} @@",
            Self::format_range(self.old_start, self.old_len),
            Self::format_range(self.new_start, self.new_len)
        )
    }

    fn format_range(start: usize, len: usize) -> String {
        if len == 1 {
            start.to_string()
        } else {
            format!("{start},{len}")
        }
    }
}
