//! Fluent registration for in-process use.
//!
//! ```ignore
//! let server = MockServer::start(&config).await?;
//! server
//!     .when("/server/1", Method::Get)
//!     .with_header("Accept", "text/plain")
//!     .then_return("hello")?
//!     .with_header("X-Trace", "t-1")?;
//! ```
//!
//! The expectation is stored as soon as `then_return*` is called; each
//! response refinement replaces it in place. Indices are only meaningful until
//! the next verification cycle resets the registry.

use crate::expectation::{
    ConfigurationError, Expectation, Method, Registry, RegistryError, RequestPredicate,
    ResponseTemplate, Status,
};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuilderError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Request half of an expectation under construction.
#[derive(Debug)]
pub struct OngoingRequest {
    registry: Arc<Registry>,
    uri: String,
    method: Method,
    headers: Vec<(String, String)>,
    body: Option<String>,
    limit: Option<i64>,
}

impl OngoingRequest {
    pub fn new(registry: Arc<Registry>, uri: impl Into<String>, method: Method) -> Self {
        Self {
            registry,
            uri: uri.into(),
            method,
            headers: Vec::new(),
            body: None,
            limit: None,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Respond with 200 and `body`.
    pub fn then_return(self, body: impl Into<String>) -> Result<OngoingResponse, BuilderError> {
        let template = ResponseTemplate::new(Status::Ok).with_body(body);
        OngoingResponse::register(self, template)
    }

    /// Respond with `status` and no body.
    pub fn then_return_status(self, status: Status) -> Result<OngoingResponse, BuilderError> {
        OngoingResponse::register(self, ResponseTemplate::new(status))
    }

    fn predicate(&self) -> Result<RequestPredicate, ConfigurationError> {
        let mut predicate = RequestPredicate::new(&self.uri)?.with_method(self.method);
        for (name, value) in &self.headers {
            predicate = predicate.with_header(name, value);
        }
        if let Some(body) = &self.body {
            predicate = predicate.with_body(body)?;
        }
        if let Some(limit) = self.limit {
            predicate = predicate.with_limit(limit)?;
        }
        Ok(predicate)
    }
}

/// A registered expectation whose response can still be refined.
#[derive(Debug)]
pub struct OngoingResponse {
    registry: Arc<Registry>,
    predicate: RequestPredicate,
    template: ResponseTemplate,
    index: usize,
}

impl OngoingResponse {
    fn register(request: OngoingRequest, template: ResponseTemplate) -> Result<Self, BuilderError> {
        let predicate = request.predicate()?;
        let index = request
            .registry
            .append(Expectation::new(predicate.clone(), template.clone()));
        Ok(Self {
            registry: request.registry,
            predicate,
            template,
            index,
        })
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, BuilderError> {
        self.template = self.template.with_header(name, value)?;
        self.store()?;
        Ok(self)
    }

    pub fn with_mime_type(mut self, mime_type: &str) -> Result<Self, BuilderError> {
        self.template = self.template.with_mime_type(mime_type);
        self.store()?;
        Ok(self)
    }

    /// Registry index of this expectation.
    pub fn index(&self) -> usize {
        self.index
    }

    fn store(&self) -> Result<(), RegistryError> {
        self.registry.replace_at(
            self.index,
            Expectation::new(self.predicate.clone(), self.template.clone()),
        )
    }
}
