//! Path and pattern decomposition.

use crate::error::{DispatchError, Result};

/// A segment in a path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// A literal segment that must match exactly.
    Static(String),
    /// A parameter segment (`:name`) binding one non-empty path segment.
    Param(String),
    /// A wildcard segment (`*name`) binding the rest of the path.
    Wildcard(String),
}

impl Segment {
    fn parse(part: &str) -> Self {
        if let Some(name) = part.strip_prefix(':') {
            Self::Param(name.to_string())
        } else if let Some(name) = part.strip_prefix('*') {
            Self::Wildcard(name.to_string())
        } else {
            Self::Static(part.to_string())
        }
    }
}

/// Splits a concrete path into its segments.
///
/// The leading `/` is dropped and empty segments are kept, so `/` yields no
/// segments while `/users/` yields `["users", ""]`.
#[must_use]
pub fn split_path(path: &str) -> Vec<&str> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    if trimmed.is_empty() {
        Vec::new()
    } else {
        trimmed.split('/').collect()
    }
}

/// A decomposed route pattern.
#[derive(Debug, Clone)]
pub struct PathPattern {
    /// The original pattern string.
    pattern: String,
    /// Parsed segments, ending at the first wildcard.
    segments: Vec<Segment>,
    /// Whether segments after a wildcard were dropped.
    truncated: bool,
}

impl PathPattern {
    /// Decomposes a pattern string.
    ///
    /// Pattern syntax:
    /// - `/users` - Literal path
    /// - `/users/:id` - Path with parameter
    /// - `/files/*path` - Wildcard parameter (matches rest of path)
    ///
    /// Anything after a wildcard segment is ignored.
    ///
    /// # Example
    ///
    /// ```
    /// use oxide_dispatch::{PathPattern, Segment};
    ///
    /// let pattern = PathPattern::parse("/posts/:id/*rest");
    /// assert_eq!(pattern.segments().len(), 3);
    /// assert_eq!(pattern.segments()[1], Segment::Param("id".to_string()));
    /// ```
    #[must_use]
    pub fn parse(pattern: &str) -> Self {
        let mut segments = Vec::new();
        let mut truncated = false;

        let parts = split_path(pattern);
        for (i, part) in parts.iter().enumerate() {
            let segment = Segment::parse(part);
            let is_wildcard = matches!(segment, Segment::Wildcard(_));
            segments.push(segment);
            if is_wildcard {
                truncated = i + 1 < parts.len();
                break;
            }
        }

        Self {
            pattern: pattern.to_string(),
            segments,
            truncated,
        }
    }

    /// Decomposes a pattern, rejecting the shapes [`PathPattern::parse`]
    /// silently tolerates: a wildcard before the last segment and unnamed
    /// parameters or wildcards.
    pub fn validate(pattern: &str) -> Result<Self> {
        let parsed = Self::parse(pattern);
        if parsed.truncated {
            return Err(DispatchError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: "wildcard must be the last segment".to_string(),
            });
        }
        let unnamed = parsed.segments.iter().any(|segment| match segment {
            Segment::Param(name) | Segment::Wildcard(name) => name.is_empty(),
            Segment::Static(_) => false,
        });
        if unnamed {
            return Err(DispatchError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: "parameter and wildcard segments need a name".to_string(),
            });
        }
        Ok(parsed)
    }

    /// Returns the original pattern string.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Returns the parsed segments.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Returns true if segments after a wildcard were dropped.
    #[must_use]
    pub const fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Returns the parameter and wildcard names in order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Param(name) | Segment::Wildcard(name) => Some(name.as_str()),
            Segment::Static(_) => None,
        })
    }
}
