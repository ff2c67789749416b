//! Type definitions for expectations: methods, status codes, predicates,
//! response templates and the errors raised while building or checking them.

use super::predicates::TextMatcher;
use hyper::header::{HeaderName, HeaderValue};
use hyper::StatusCode;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Mime type used when a response template does not set one.
pub const DEFAULT_MIME_TYPE: &str = "text/html";

// ============================================================================
// Methods and status codes
// ============================================================================

/// HTTP methods an expectation can be restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Options,
    Patch,
    Trace,
    Connect,
}

impl Method {
    /// Resolve a method from its wire name. Method names are case-sensitive.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "GET" => Some(Method::Get),
            "HEAD" => Some(Method::Head),
            "POST" => Some(Method::Post),
            "PUT" => Some(Method::Put),
            "DELETE" => Some(Method::Delete),
            "OPTIONS" => Some(Method::Options),
            "PATCH" => Some(Method::Patch),
            "TRACE" => Some(Method::Trace),
            "CONNECT" => Some(Method::Connect),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
            Method::Patch => "PATCH",
            Method::Trace => "TRACE",
            Method::Connect => "CONNECT",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = ConfigurationError;

    /// Lenient parse used for configuration input: surrounding whitespace and
    /// letter case are ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Method::from_name(&name.to_ascii_uppercase())
            .ok_or_else(|| ConfigurationError::InvalidMethod(name.to_string()))
    }
}

/// Status codes a response template may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Ok,
    Created,
    Accepted,
    NoContent,
    PartialContent,
    Redirect,
    NotModified,
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    RangeNotSatisfiable,
    InternalError,
}

impl Status {
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            200 => Some(Status::Ok),
            201 => Some(Status::Created),
            202 => Some(Status::Accepted),
            204 => Some(Status::NoContent),
            206 => Some(Status::PartialContent),
            301 => Some(Status::Redirect),
            304 => Some(Status::NotModified),
            400 => Some(Status::BadRequest),
            401 => Some(Status::Unauthorized),
            403 => Some(Status::Forbidden),
            404 => Some(Status::NotFound),
            409 => Some(Status::Conflict),
            416 => Some(Status::RangeNotSatisfiable),
            500 => Some(Status::InternalError),
            _ => None,
        }
    }

    pub fn code(&self) -> u16 {
        self.status_code().as_u16()
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Status::Ok => StatusCode::OK,
            Status::Created => StatusCode::CREATED,
            Status::Accepted => StatusCode::ACCEPTED,
            Status::NoContent => StatusCode::NO_CONTENT,
            Status::PartialContent => StatusCode::PARTIAL_CONTENT,
            Status::Redirect => StatusCode::MOVED_PERMANENTLY,
            Status::NotModified => StatusCode::NOT_MODIFIED,
            Status::BadRequest => StatusCode::BAD_REQUEST,
            Status::Unauthorized => StatusCode::UNAUTHORIZED,
            Status::Forbidden => StatusCode::FORBIDDEN,
            Status::NotFound => StatusCode::NOT_FOUND,
            Status::Conflict => StatusCode::CONFLICT,
            Status::RangeNotSatisfiable => StatusCode::RANGE_NOT_SATISFIABLE,
            Status::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.status_code())
    }
}

// ============================================================================
// Incoming request descriptor
// ============================================================================

/// Transport-independent view of a request, as seen by the matcher.
#[derive(Debug, Clone, Default)]
pub struct IncomingRequest {
    method: String,
    uri: String,
    /// Keys are lowercased on insert
    headers: HashMap<String, String>,
    body: String,
}

impl IncomingRequest {
    pub fn new(method: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            uri: uri.into(),
            ..Default::default()
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Raw method name as received.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The method, if it is one the matcher knows about.
    pub fn known_method(&self) -> Option<Method> {
        Method::from_name(&self.method)
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn body(&self) -> &str {
        &self.body
    }
}

// ============================================================================
// Predicate
// ============================================================================

/// Conditions a request must satisfy to select an expectation.
///
/// Every field except the uri is optional and acts as a wildcard when unset.
#[derive(Debug, Clone)]
pub struct RequestPredicate {
    method: Option<Method>,
    uri: TextMatcher,
    headers: HashMap<String, String>,
    body: Option<TextMatcher>,
    limit: Option<u32>,
}

impl RequestPredicate {
    /// Create a predicate for a uri, either literal or `regexp:<pattern>`.
    pub fn new(uri: &str) -> Result<Self, ConfigurationError> {
        let uri = uri.trim();
        if uri.is_empty() {
            return Err(ConfigurationError::MissingField("request.uri"));
        }

        Ok(Self {
            method: None,
            uri: TextMatcher::parse("request.uri", uri)?,
            headers: HashMap::new(),
            body: None,
            limit: None,
        })
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Require a header. Names are compared case-insensitively; empty names
    /// or values are ignored.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        let (name, value) = (name.trim(), value.trim());
        if !name.is_empty() && !value.is_empty() {
            self.headers
                .insert(name.to_ascii_lowercase(), value.to_string());
        }
        self
    }

    /// Require a body, either literal or `regexp:<pattern>`. An empty body
    /// leaves the predicate unconstrained.
    pub fn with_body(mut self, body: &str) -> Result<Self, ConfigurationError> {
        let body = body.trim();
        if !body.is_empty() {
            self.body = Some(TextMatcher::parse("request.body", body)?);
        }
        Ok(self)
    }

    /// Expect exactly `limit` matching requests before verification.
    pub fn with_limit(mut self, limit: i64) -> Result<Self, ConfigurationError> {
        match u32::try_from(limit) {
            Ok(limit) if limit > 0 => {
                self.limit = Some(limit);
                Ok(self)
            }
            _ => Err(ConfigurationError::InvalidLimit(limit)),
        }
    }

    pub fn method(&self) -> Option<Method> {
        self.method
    }

    pub fn uri(&self) -> &TextMatcher {
        &self.uri
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn body(&self) -> Option<&TextMatcher> {
        self.body.as_ref()
    }

    pub fn limit(&self) -> Option<u32> {
        self.limit
    }
}

// ============================================================================
// Response template
// ============================================================================

/// Response served when an expectation is selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseTemplate {
    status: Status,
    mime_type: String,
    /// Insertion-ordered; names are unique case-insensitively
    headers: Vec<(String, String)>,
    body: Option<String>,
}

impl ResponseTemplate {
    pub fn new(status: Status) -> Self {
        Self {
            status,
            mime_type: DEFAULT_MIME_TYPE.to_string(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Set the Content-Type. An empty value keeps the current one.
    pub fn with_mime_type(mut self, mime_type: &str) -> Self {
        let mime_type = mime_type.trim();
        if !mime_type.is_empty() {
            self.mime_type = mime_type.to_string();
        }
        self
    }

    /// Add a response header, replacing any header with the same name.
    /// Empty names or values are ignored.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, ConfigurationError> {
        let (name, value) = (name.trim(), value.trim());
        if name.is_empty() || value.is_empty() {
            return Ok(self);
        }

        if HeaderName::from_bytes(name.as_bytes()).is_err()
            || HeaderValue::from_str(value).is_err()
        {
            return Err(ConfigurationError::InvalidHeader {
                field: "response.headers",
                name: name.to_string(),
            });
        }

        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.to_string()));
        Ok(self)
    }

    /// Set the body. An empty body is the same as no body.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        let body = body.into();
        self.body = if body.is_empty() { None } else { Some(body) };
        self
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }
}

// ============================================================================
// Expectation
// ============================================================================

/// A stored predicate and response pair, with its call counter.
#[derive(Debug, Clone)]
pub struct Expectation {
    predicate: RequestPredicate,
    response: ResponseTemplate,
    call_count: u64,
}

impl Expectation {
    pub fn new(predicate: RequestPredicate, response: ResponseTemplate) -> Self {
        Self {
            predicate,
            response,
            call_count: 0,
        }
    }

    pub fn predicate(&self) -> &RequestPredicate {
        &self.predicate
    }

    pub fn response(&self) -> &ResponseTemplate {
        &self.response
    }

    pub fn call_count(&self) -> u64 {
        self.call_count
    }

    /// Count one matching request. The increment is kept even when it takes
    /// the count past the limit, so verification reports the overrun.
    pub(crate) fn record_call(&mut self) -> Result<(), LimitViolation> {
        self.call_count += 1;
        match self.predicate.limit {
            Some(limit) if self.call_count > u64::from(limit) => Err(LimitViolation::Exceeded {
                uri: self.predicate.uri.to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// Compare the call count against the limit. Unbounded expectations
    /// always pass.
    pub fn check_limit(&self) -> Result<(), LimitViolation> {
        let Some(limit) = self.predicate.limit else {
            return Ok(());
        };
        let expected = u64::from(limit);

        if self.call_count < expected {
            return Err(LimitViolation::TooFew {
                uri: self.predicate.uri.to_string(),
                expected,
                received: self.call_count,
            });
        }

        if self.call_count > expected {
            return Err(LimitViolation::TooMany {
                uri: self.predicate.uri.to_string(),
                expected,
                received: self.call_count,
            });
        }

        Ok(())
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Invalid expectation definition. Reported to the client, never stored.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("malformed JSON payload: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("json.{0} is required")]
    MissingField(&'static str),
    #[error("json.response.status has an invalid value \"{0}\"")]
    InvalidStatus(i64),
    #[error("json.request.method has an invalid value \"{0}\"")]
    InvalidMethod(String),
    #[error("json.request.limit must be a positive integer, got {0}")]
    InvalidLimit(i64),
    #[error("json.{field} is not a valid regular expression: {source}")]
    InvalidPattern {
        field: &'static str,
        #[source]
        source: regex::Error,
    },
    #[error("json.{field} has an invalid header \"{name}\"")]
    InvalidHeader { field: &'static str, name: String },
    #[error("json.request.uri \"{0}\" is reserved for the admin API")]
    ReservedUri(String),
}

/// An expectation's call count does not agree with its limit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LimitViolation {
    #[error("Request limit for \"{uri}\" already exceeded")]
    Exceeded { uri: String },
    #[error("Too few requests to \"{uri}\". Expected {expected} but received {received}")]
    TooFew {
        uri: String,
        expected: u64,
        received: u64,
    },
    #[error("Too many requests to \"{uri}\". Expected {expected} but received {received}")]
    TooMany {
        uri: String,
        expected: u64,
        received: u64,
    },
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Expectation index {0} out of bounds")]
    IndexOutOfBounds(usize),
}
