//! Git commit object
//!
//! Commits represent snapshots of the repository at specific points in time.
//! They contain:
//! - A tree object ID (directory snapshot)
//! - Parent commit ID(s) (for history)
//! - Author and committer information
//! - Commit message
//!
//! ## Format
//!
//! Payload (after the `commit <size>\0` header):
//! ```text
//! tree <tree-id>
//! parent <parent-id>
//! author <name> <email> <timestamp> <timezone>
//! committer <name> <email> <timestamp> <timezone>
//! [other headers, continuation lines start with a space]
//!
//! <commit message>
//! ```

use crate::artifacts::objects::object::Unpackable;
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::{GitError, Result};
use bytes::Bytes;
use chrono::{DateTime, FixedOffset};

/// Author or committer information
///
/// Contains name, email, and timestamp with timezone information.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Author {
    name: String,
    email: String,
    timestamp: DateTime<FixedOffset>,
}

impl Author {
    pub fn new(name: String, email: String, timestamp: DateTime<FixedOffset>) -> Self {
        Author {
            name,
            email,
            timestamp,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    /// Format timestamp in human-readable form
    ///
    /// # Returns
    ///
    /// String like "Mon Jan 1 12:34:56 2024 +0000"
    pub fn readable_timestamp(&self) -> String {
        self.timestamp
            .format("%a %b %-d %H:%M:%S %Y %z")
            .to_string()
    }

    /// Calendar date in the author's own timezone, `YYYY-MM-DD`
    pub fn short_date(&self) -> String {
        self.timestamp.format("%Y-%m-%d").to_string()
    }

    pub fn timestamp(&self) -> DateTime<FixedOffset> {
        self.timestamp
    }
}

fn parse_timezone(timezone: &str) -> Option<FixedOffset> {
    let (sign, digits) = match timezone.as_bytes().first()? {
        b'+' => (1, &timezone[1..]),
        b'-' => (-1, &timezone[1..]),
        _ => return None,
    };
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let hours = digits[..2].parse::<i32>().ok()?;
    let minutes = digits[2..].parse::<i32>().ok()?;
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

impl TryFrom<&str> for Author {
    type Error = String;

    fn try_from(value: &str) -> std::result::Result<Self, Self::Error> {
        // Format: "name <email> timestamp timezone"
        // Split from right to get timezone and timestamp first
        let parts: Vec<&str> = value.rsplitn(3, ' ').collect();
        if parts.len() < 3 {
            return Err("invalid author format".to_string());
        }

        let offset = parse_timezone(parts[0]).ok_or("invalid timezone")?;
        let timestamp = parts[1]
            .parse::<i64>()
            .map_err(|_| "invalid timestamp".to_string())?;
        let name_email_part = parts[2];

        let email_start = name_email_part
            .find('<')
            .ok_or("invalid author format: missing '<'")?;
        let email_end = name_email_part
            .rfind('>')
            .filter(|&end| end > email_start)
            .ok_or("invalid author format: missing '>'")?;

        let name = name_email_part[..email_start].trim().to_string();
        let email = name_email_part[email_start + 1..email_end].to_string();
        let timestamp = DateTime::from_timestamp(timestamp, 0)
            .ok_or("timestamp out of range")?
            .with_timezone(&offset);

        Ok(Author::new(name, email, timestamp))
    }
}

/// Git commit object
///
/// Immutable once decoded; the store hands out shared references.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Commit {
    /// This commit's own id
    oid: ObjectId,
    /// Parent commit IDs (empty for the root commit, several for merges)
    parents: Vec<ObjectId>,
    /// Tree object ID representing the directory snapshot
    tree_oid: ObjectId,
    author: Author,
    committer: Author,
    message: String,
}

impl Commit {
    pub fn oid(&self) -> &ObjectId {
        &self.oid
    }

    /// First line of the commit message
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }

    /// Everything after the summary line, without the separating blank line
    pub fn body(&self) -> &str {
        match self.message.split_once('\n') {
            Some((_, rest)) => rest.trim_start_matches('\n'),
            None => "",
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn tree_oid(&self) -> &ObjectId {
        &self.tree_oid
    }

    /// First parent, the one followed by first-parent traversal
    pub fn parent(&self) -> Option<&ObjectId> {
        self.parents.first()
    }

    pub fn parents(&self) -> &[ObjectId] {
        &self.parents
    }

    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn author(&self) -> &Author {
        &self.author
    }

    pub fn committer(&self) -> &Author {
        &self.committer
    }
}

impl Unpackable for Commit {
    fn deserialize(oid: &ObjectId, payload: Bytes) -> Result<Self> {
        let content = String::from_utf8_lossy(&payload);
        let (headers, message) = match content.split_once("\n\n") {
            Some((headers, message)) => (headers, message),
            None => (content.trim_end_matches('\n'), ""),
        };

        let mut tree_oid = None;
        let mut parents = Vec::new();
        let mut author = None;
        let mut committer = None;

        for line in headers.lines() {
            // continuation of a multi-line header (gpgsig, mergetag)
            if line.starts_with(' ') {
                continue;
            }

            let (key, value) = line.split_once(' ').unwrap_or((line, ""));
            match key {
                "tree" => tree_oid = Some(parse_header_oid(oid, "tree", value)?),
                "parent" => parents.push(parse_header_oid(oid, "parent", value)?),
                "author" => {
                    author = Some(
                        Author::try_from(value)
                            .map_err(|reason| GitError::corrupt(oid, format!("author: {reason}")))?,
                    )
                }
                "committer" => {
                    committer = Some(Author::try_from(value).map_err(|reason| {
                        GitError::corrupt(oid, format!("committer: {reason}"))
                    })?)
                }
                _ => {}
            }
        }

        let tree_oid =
            tree_oid.ok_or_else(|| GitError::corrupt(oid, "invalid commit: missing tree line"))?;
        let author =
            author.ok_or_else(|| GitError::corrupt(oid, "invalid commit: missing author line"))?;
        let committer = committer.unwrap_or_else(|| author.clone());

        Ok(Commit {
            oid: oid.clone(),
            parents,
            tree_oid,
            author,
            committer,
            message: message.to_string(),
        })
    }
}

fn parse_header_oid(oid: &ObjectId, header: &str, value: &str) -> Result<ObjectId> {
    ObjectId::try_parse(value.trim())
        .map_err(|e| GitError::corrupt(oid, format!("invalid {header} line: {e}")))
}
