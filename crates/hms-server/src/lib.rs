// Library exports for the server binary, the in-process builder and the tests

// ===== Core: expectations, matching, verification =====
pub mod expectation;

// ===== Admin dispatch and HTTP transport =====
pub mod admin_api;
pub mod server;

// ===== Convenience layers =====
pub mod builder;
pub mod config;
pub mod logging;

pub use builder::{BuilderError, OngoingRequest, OngoingResponse};
pub use config::ServerConfig;
pub use expectation::{
    ConfigurationError, Expectation, IncomingRequest, Method, Registry, RequestPredicate,
    ResponseTemplate, Status, Verification,
};
pub use server::{MockServer, ServerError, Shutdown};
