//! Ancestor-encoded issue identifiers.
//!
//! An [`IssueId`] is an ordered list of segments. The last segment is the
//! issue's own local id; the preceding segments are the local ids of the
//! ancestors it was created under, root first. The dotted string form
//! (`root.child.grandchild`) is only used at the serialization and
//! directory-name boundaries.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Separator between segments in the textual form.
pub const SEGMENT_SEPARATOR: char = '.';

/// Unique identifier for an issue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IssueId {
    segments: Vec<String>,
}

impl IssueId {
    /// Parse a dotted identifier, validating every segment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidId`] when the input is empty or a segment is
    /// empty or contains characters other than ASCII alphanumerics, `-` and `_`.
    pub fn parse(input: &str) -> Result<Self> {
        let segments = input
            .split(SEGMENT_SEPARATOR)
            .map(|segment| validate_segment(input, segment).map(|()| segment.to_string()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { segments })
    }

    /// Create a root-level id from a single local segment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidId`] if the segment is not valid.
    pub fn root(segment: impl Into<String>) -> Result<Self> {
        let segment = segment.into();
        validate_segment(&segment, &segment)?;
        Ok(Self {
            segments: vec![segment],
        })
    }

    /// Create the id of a child of this issue.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidId`] if the segment is not valid.
    pub fn child(&self, segment: impl Into<String>) -> Result<Self> {
        let segment = segment.into();
        validate_segment(&segment, &segment)?;
        let mut segments = self.segments.clone();
        segments.push(segment);
        Ok(Self { segments })
    }

    /// Number of levels encoded in the id; a root issue has depth 1.
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// The id of the ancestor this issue was created under, if any.
    pub fn parent(&self) -> Option<IssueId> {
        if self.segments.len() <= 1 {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Encoded ancestors, root first, excluding this id.
    pub fn ancestors(&self) -> Vec<IssueId> {
        (1..self.segments.len())
            .map(|len| Self {
                segments: self.segments[..len].to_vec(),
            })
            .collect()
    }

    /// The issue's own local segment.
    pub fn local(&self) -> &str {
        self.segments
            .last()
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// All segments, root first.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Dotted string form, used for directory names and records.
    pub fn as_string(&self) -> String {
        self.segments.join(".")
    }
}

fn validate_segment(input: &str, segment: &str) -> Result<()> {
    if segment.is_empty() {
        return Err(Error::InvalidId {
            id: input.to_string(),
            reason: "empty segment".to_string(),
        });
    }
    if let Some(bad) = segment
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        return Err(Error::InvalidId {
            id: input.to_string(),
            reason: format!("unexpected character '{bad}'"),
        });
    }
    Ok(())
}

impl fmt::Display for IssueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_string())
    }
}

impl FromStr for IssueId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for IssueId {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<IssueId> for String {
    fn from(id: IssueId) -> Self {
        id.as_string()
    }
}
