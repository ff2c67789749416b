//! Expectations: the registered request/response pairs and the engine that
//! matches requests against them.
//!
//! This module provides:
//! - `Expectation`: a predicate, a response template and a call counter
//! - `Registry`: ordered, mutex-guarded storage with matching and verification
//! - `RegistrationPayload`: the JSON schema accepted by the registration endpoint
//!
//! ## Module Structure
//!
//! - `types`: Methods, status codes, predicates, templates, errors
//! - `predicates`: Predicate matching logic
//! - `schema`: Registration payload decoding and validation
//! - `registry`: Registry, match outcomes and the verification cycle

mod predicates;
mod registry;
mod schema;
mod types;


pub use predicates::{TextMatcher, REGEX_PREFIX};
pub use registry::{MatchOutcome, Registry, Verification};
pub use schema::{RegistrationPayload, RequestSpec, ResponseSpec};
pub use types::{
    ConfigurationError, Expectation, IncomingRequest, LimitViolation, Method, RegistryError,
    RequestPredicate, ResponseTemplate, Status, DEFAULT_MIME_TYPE,
};
