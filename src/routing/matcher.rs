//! Path pattern matching.
//!
//! # Responsibilities
//! - Parse path patterns (`/api/auth/**`, `/api/*/members`, `/health`)
//! - Match request paths segment by segment
//! - Rank patterns by specificity
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - Empty segments are ignored, so `/api//x/` matches like `/api/x`
//! - `*` matches exactly one segment; a trailing `**` matches any suffix,
//!   including the empty one
//! - No regex to guarantee O(n) matching
//! - Paths a backend could resolve differently (dot segments, encoded
//!   separators) are detected up front and never matched

use std::cmp::Reverse;
use std::fmt;

/// Error produced when a pattern cannot be compiled.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    #[error("pattern must not be empty")]
    Empty,
    #[error("pattern `{0}` must start with `/`")]
    MissingLeadingSlash(String),
    #[error("`**` is only allowed as the last segment of `{0}`")]
    InteriorDoubleWildcard(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Any,
}

/// Compiled path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    segments: Vec<Segment>,
    trailing_wildcard: bool,
}

/// Ordering key: higher sorts as more specific.
pub type Specificity = (usize, Reverse<usize>, bool);

impl PathPattern {
    /// Compile a pattern.
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return Err(PatternError::Empty);
        }
        if !pattern.starts_with('/') {
            return Err(PatternError::MissingLeadingSlash(pattern.to_string()));
        }

        let raw: Vec<&str> = split_path(pattern).collect();
        let mut segments = Vec::with_capacity(raw.len());
        let mut trailing_wildcard = false;

        for (i, seg) in raw.iter().enumerate() {
            match *seg {
                "**" if i + 1 == raw.len() => trailing_wildcard = true,
                "**" => return Err(PatternError::InteriorDoubleWildcard(pattern.to_string())),
                "*" => segments.push(Segment::Any),
                literal => segments.push(Segment::Literal(literal.to_string())),
            }
        }

        Ok(Self {
            segments,
            trailing_wildcard,
        })
    }

    /// Returns true if `path` is covered by this pattern.
    pub fn matches(&self, path: &str) -> bool {
        let mut parts = split_path(path);

        for expected in &self.segments {
            match (expected, parts.next()) {
                (_, None) => return false,
                (Segment::Any, Some(_)) => {}
                (Segment::Literal(lit), Some(actual)) if lit == actual => {}
                (Segment::Literal(_), Some(_)) => return false,
            }
        }

        self.trailing_wildcard || parts.next().is_none()
    }

    /// Ranking used to pick the most specific of several matching patterns.
    pub fn specificity(&self) -> Specificity {
        let wildcards = self
            .segments
            .iter()
            .filter(|s| matches!(s, Segment::Any))
            .count();
        let literals = self.segments.len() - wildcards;
        (literals, Reverse(wildcards), !self.trailing_wildcard)
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() && !self.trailing_wildcard {
            return f.write_str("/");
        }
        for seg in &self.segments {
            match seg {
                Segment::Literal(lit) => write!(f, "/{lit}")?,
                Segment::Any => f.write_str("/*")?,
            }
        }
        if self.trailing_wildcard {
            f.write_str("/**")?;
        }
        Ok(())
    }
}

/// Returns true if a backend could read `path` with different segments than
/// the matcher does.
///
/// Covers `.`/`..` segments, percent-encoded or followed by `;params` too.
/// Backslashes and encoded separators or `%` also count.
pub fn is_ambiguous_path(path: &str) -> bool {
    if path.contains('\\') {
        return true;
    }
    let lower = path.to_ascii_lowercase();
    if ["%2f", "%5c", "%25"].iter().any(|enc| lower.contains(enc)) {
        return true;
    }
    lower.split('/').any(|seg| {
        let seg = seg.split_once(';').map_or(seg, |(head, _)| head);
        let seg = seg.replace("%2e", ".");
        seg == "." || seg == ".."
    })
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}
