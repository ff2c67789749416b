//! Handlers for the reserved endpoints and for mocked requests.

use crate::admin_api::types::{collect_body, json_response, template_response, text_response};
use crate::config::AdminConfig;
use crate::expectation::{
    ConfigurationError, IncomingRequest, MatchOutcome, RegistrationPayload, Registry,
    TextMatcher, Verification,
};
use crate::server::Shutdown;
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Body;
use hyper::{Method, Request, Response, StatusCode};
use std::fmt::Display;
use tracing::{debug, info, warn};

/// POST /__expect - Register a new expectation
pub async fn handle_expect<B>(
    req: Request<B>,
    registry: &Registry,
    admin: &AdminConfig,
) -> Response<Full<Bytes>>
where
    B: Body,
    B::Error: Display,
{
    if req.method() != Method::POST {
        return text_response(
            StatusCode::BAD_REQUEST,
            "Error: Define a new mock rule using a POST request",
        );
    }

    let body = match collect_body(req).await {
        Ok(b) => b,
        Err(e) => {
            return text_response(
                StatusCode::BAD_REQUEST,
                format!("Failed to read from body: {e}"),
            )
        }
    };

    let parsed = RegistrationPayload::parse(&body).and_then(|expectation| {
        if let TextMatcher::Exact(path) = expectation.predicate().uri() {
            if admin.is_reserved(path) {
                return Err(ConfigurationError::ReservedUri(path.clone()));
            }
        }
        Ok(expectation)
    });

    let expectation = match parsed {
        Ok(e) => e,
        Err(e) => {
            warn!("Rejected mock rule: {}", e);
            return text_response(
                StatusCode::BAD_REQUEST,
                format!("Invalid mock rule configuration: {e}"),
            );
        }
    };

    let uri = expectation.predicate().uri().to_string();
    let index = registry.append(expectation);
    info!(index, uri = %uri, "Rule added");

    text_response(StatusCode::OK, "Rule added")
}

/// /__check - Verify all expectations, then reset
pub fn handle_check(registry: &Registry) -> Response<Full<Bytes>> {
    match registry.verify() {
        Verification::Satisfied => text_response(StatusCode::OK, "All expectations met"),
        Verification::Unsatisfied(failures) => {
            for failure in &failures {
                info!("Unmet expectation: {}", failure);
            }
            json_response(StatusCode::CONFLICT, &failures)
        }
    }
}

/// /__shutdown - Request server shutdown
pub fn handle_shutdown(shutdown: &Shutdown) -> Response<Full<Bytes>> {
    if shutdown.trigger() {
        info!("Shutdown requested");
    }
    text_response(StatusCode::ACCEPTED, "Shutting down...")
}

/// Any other path - serve the first matching expectation
pub async fn handle_mock<B>(
    req: Request<B>,
    registry: &Registry,
    shutdown: &Shutdown,
) -> Response<Full<Bytes>>
where
    B: Body,
    B::Error: Display,
{
    let mut request = IncomingRequest::new(req.method().as_str(), req.uri().path());
    for name in req.headers().keys() {
        let value = req
            .headers()
            .get_all(name)
            .iter()
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .collect::<Vec<_>>()
            .join(", ");
        request = request.with_header(name.as_str(), value);
    }

    let body = match collect_body(req).await {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            debug!("Failed to read request body: {}", e);
            return text_response(
                StatusCode::BAD_REQUEST,
                format!("Failed to read from body: {e}"),
            );
        }
    };
    let request = request.with_body(body);

    // Shutdown may have been acknowledged while the body was in flight
    if shutdown.is_requested() {
        return text_response(StatusCode::SERVICE_UNAVAILABLE, "Server is shutting down");
    }

    match registry.match_request(&request) {
        MatchOutcome::Served { response, .. } => template_response(&response),
        MatchOutcome::LimitExceeded { violation, .. } => {
            text_response(StatusCode::NOT_FOUND, violation.to_string())
        }
        MatchOutcome::Unmatched { failure } => text_response(StatusCode::NOT_FOUND, failure),
    }
}
