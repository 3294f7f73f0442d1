//! Route matching logic.
//!
//! # Responsibilities
//! - Match the request path against a pattern (exact, or prefix with trailing `*`)
//! - Match the request method against the allowed set
//! - Combine conditions with AND semantics
//!
//! # Design Decisions
//! - Method matching is case-insensitive
//! - Path matching is case-sensitive
//! - `*` matches any suffix, including the empty one
//! - No regex to guarantee O(n) matching

/// Method and path of an inbound request.
#[derive(Debug, Clone, Copy)]
pub struct RequestHead<'a> {
    pub method: &'a str,
    pub path: &'a str,
}

/// Trait for matching requests against conditions.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the request matches this condition.
    fn matches(&self, head: &RequestHead<'_>) -> bool;
}

/// Matches the request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathMatcher {
    Exact(String),
    /// Pattern with the trailing `*` stripped.
    Prefix(String),
}

impl PathMatcher {
    pub fn new(pattern: &str) -> Self {
        match pattern.strip_suffix('*') {
            Some(prefix) => PathMatcher::Prefix(prefix.to_string()),
            None => PathMatcher::Exact(pattern.to_string()),
        }
    }
}

impl Matcher for PathMatcher {
    fn matches(&self, head: &RequestHead<'_>) -> bool {
        match self {
            PathMatcher::Exact(path) => head.path == path,
            PathMatcher::Prefix(prefix) => head.path.starts_with(prefix.as_str()),
        }
    }
}

/// Matches the request method against an allowed set.
#[derive(Debug, Clone)]
pub struct MethodMatcher {
    allowed: Vec<String>,
}

impl MethodMatcher {
    /// Methods are normalized to uppercase.
    pub fn new(methods: &[String]) -> Self {
        Self {
            allowed: methods.iter().map(|m| m.to_ascii_uppercase()).collect(),
        }
    }
}

impl Matcher for MethodMatcher {
    fn matches(&self, head: &RequestHead<'_>) -> bool {
        self.allowed
            .iter()
            .any(|m| m.eq_ignore_ascii_case(head.method))
    }
}
