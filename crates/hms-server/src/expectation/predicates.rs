//! Predicate matching logic for selecting an expectation.
//!
//! A predicate accepts a request when every field it sets agrees with the
//! request:
//! - method: equal, when both sides carry a known method
//! - uri: exact, or a regular expression when written as `regexp:<pattern>`
//! - headers: subset match, names compared case-insensitively
//! - body: same rule as the uri, against the decoded body

use super::types::{ConfigurationError, IncomingRequest, RequestPredicate};
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Marks a uri or body predicate as a regular expression.
pub const REGEX_PREFIX: &str = "regexp:";

/// Compiled string comparison for a uri or body predicate.
#[derive(Debug, Clone)]
pub enum TextMatcher {
    Exact(String),
    /// Anchored at both ends, so the whole value must match
    Regex { pattern: String, regex: Arc<Regex> },
}

impl TextMatcher {
    /// Compile a predicate string. `field` names the payload member for error
    /// messages.
    pub fn parse(field: &'static str, raw: &str) -> Result<Self, ConfigurationError> {
        let Some(pattern) = raw.strip_prefix(REGEX_PREFIX) else {
            return Ok(TextMatcher::Exact(raw.to_string()));
        };

        let regex = Regex::new(&format!("^(?:{pattern})$"))
            .map_err(|source| ConfigurationError::InvalidPattern { field, source })?;

        Ok(TextMatcher::Regex {
            pattern: pattern.to_string(),
            regex: Arc::new(regex),
        })
    }

    pub fn is_match(&self, value: &str) -> bool {
        match self {
            TextMatcher::Exact(expected) => expected == value,
            TextMatcher::Regex { regex, .. } => regex.is_match(value),
        }
    }

    pub fn is_regex(&self) -> bool {
        matches!(self, TextMatcher::Regex { .. })
    }
}

impl fmt::Display for TextMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextMatcher::Exact(value) => f.write_str(value),
            TextMatcher::Regex { pattern, .. } => write!(f, "{REGEX_PREFIX}{pattern}"),
        }
    }
}

impl RequestPredicate {
    /// Check whether this predicate accepts the request.
    pub fn matches(&self, request: &IncomingRequest) -> bool {
        if let (Some(expected), Some(actual)) = (self.method(), request.known_method()) {
            if expected != actual {
                return false;
            }
        }

        if !self.uri().is_match(request.uri()) {
            return false;
        }

        if !headers_contain(request.headers(), self.headers()) {
            return false;
        }

        match self.body() {
            Some(body) => body.is_match(request.body()),
            None => true,
        }
    }
}

/// Every expected header must be present in `actual` with an equal value.
/// Both maps are keyed by lowercased names.
fn headers_contain(actual: &HashMap<String, String>, expected: &HashMap<String, String>) -> bool {
    expected
        .iter()
        .all(|(name, value)| actual.get(name) == Some(value))
}
