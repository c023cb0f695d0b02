//! Path pattern grammar.
//!
//! A pattern is a `/`-separated list of segments:
//!
//! - a literal segment matches itself, case-sensitively
//! - `*` matches exactly one non-empty segment
//! - `**` matches zero or more segments, anywhere in the pattern
//!
//! A pattern that is `*`, `**` or `/**` on its own matches every path and is
//! reported as unconditional. Trailing slashes are dropped from both pattern
//! and path before comparison.

use std::fmt;

use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    One,
    Any,
}

/// A compiled path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    source: String,
    segments: Vec<Segment>,
    unconditional: bool,
}

impl PathPattern {
    /// Compile a pattern. Anything other than a whole-path wildcard must start
    /// with `/`.
    pub fn parse(pattern: &str) -> AppResult<Self> {
        let trimmed = pattern.trim();
        if matches!(trimmed, "*" | "**" | "/**") {
            return Ok(Self {
                source: trimmed.to_string(),
                segments: vec![Segment::Any],
                unconditional: true,
            });
        }
        if !trimmed.starts_with('/') {
            return Err(AppError::configuration(format!(
                "Path pattern must start with '/': '{pattern}'"
            )));
        }

        let segments = split(normalize_path(trimmed))
            .map(|segment| match segment {
                "*" => Segment::One,
                "**" => Segment::Any,
                literal => Segment::Literal(literal.to_string()),
            })
            .collect();

        Ok(Self {
            source: trimmed.to_string(),
            segments,
            unconditional: false,
        })
    }

    /// Whether this pattern allows every path.
    pub fn is_unconditional(&self) -> bool {
        self.unconditional
    }

    /// The pattern as written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Test a concrete request path against the pattern.
    pub fn matches(&self, path: &str) -> bool {
        if self.unconditional {
            return true;
        }
        let path: Vec<&str> = split(normalize_path(path)).collect();
        match_segments(&self.segments, &path)
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Drop trailing slashes, keeping the root path `/` intact.
pub fn normalize_path(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() { "/" } else { trimmed }
}

fn split(normalized: &str) -> impl Iterator<Item = &str> {
    normalized
        .strip_prefix('/')
        .unwrap_or(normalized)
        .split('/')
        .filter(|segment| !segment.is_empty())
}

fn match_segments(pattern: &[Segment], path: &[&str]) -> bool {
    match pattern.split_first() {
        None => path.is_empty(),
        Some((Segment::Any, rest)) => {
            (0..=path.len()).any(|skip| match_segments(rest, &path[skip..]))
        }
        Some((Segment::One, rest)) => !path.is_empty() && match_segments(rest, &path[1..]),
        Some((Segment::Literal(literal), rest)) => {
            path.first().is_some_and(|segment| *segment == literal.as_str())
                && match_segments(rest, &path[1..])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(pattern: &str, path: &str) -> bool {
        PathPattern::parse(pattern).unwrap().matches(path)
    }

    #[test]
    fn test_literal_segments() {
        assert!(matches("/profile", "/profile"));
        assert!(!matches("/profile", "/profile/edit"));
        assert!(!matches("/profile", "/Profile"));
    }

    #[test]
    fn test_single_segment_wildcard() {
        assert!(matches("/events/*/qr-checker", "/events/123/qr-checker"));
        assert!(!matches("/events/*/qr-checker", "/events/qr-checker"));
        assert!(!matches("/events/*/qr-checker", "/events/1/2/qr-checker"));
    }

    #[test]
    fn test_multi_segment_wildcard() {
        assert!(matches("/dorm/**", "/dorm"));
        assert!(matches("/dorm/**", "/dorm/leases"));
        assert!(matches("/dorm/**", "/dorm/leases/42/edit"));
        assert!(!matches("/dorm/**", "/dormitory"));
        assert!(matches("/a/**/z", "/a/z"));
        assert!(matches("/a/**/z", "/a/b/c/z"));
        assert!(!matches("/a/**/z", "/a/b/c"));
    }

    #[test]
    fn test_trailing_slashes_are_normalized() {
        assert!(matches("/profile/", "/profile"));
        assert!(matches("/profile", "/profile/"));
        assert_eq!(normalize_path("///"), "/");
        assert_eq!(normalize_path("/auth/"), "/auth");
    }

    #[test]
    fn test_whole_path_wildcards_are_unconditional() {
        for source in ["*", "**", "/**"] {
            let pattern = PathPattern::parse(source).unwrap();
            assert!(pattern.is_unconditional());
            assert!(pattern.matches("/"));
            assert!(pattern.matches("/anything/at/all"));
        }
        assert!(!PathPattern::parse("/events/**").unwrap().is_unconditional());
    }

    #[test]
    fn test_relative_pattern_is_rejected() {
        assert!(PathPattern::parse("profile").is_err());
    }
}
