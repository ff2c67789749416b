//! Response helpers shared by the admin handlers and the mock responder.

use crate::expectation::{ResponseTemplate, Status};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use hyper::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use hyper::{Request, Response, StatusCode};
use serde::Serialize;
use std::fmt::Display;
use tracing::{debug, warn};

pub const MIME_PLAINTEXT: &str = "text/plain";
pub const MIME_JSON: &str = "application/json";

/// Headers describing message framing; the transport computes these itself.
const FRAMING_HEADERS: [&str; 3] = ["content-length", "transfer-encoding", "connection"];

/// Build an HTTP response with the given status and body.
///
/// This function handles the unlikely case where Response::builder() fails
/// by returning a minimal 500 error response.
pub fn build_response(status: StatusCode, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .body(Full::new(body.into()))
        .unwrap_or_else(|_| internal_error())
}

/// Build an HTTP response with headers.
pub fn build_response_with_headers(
    status: StatusCode,
    headers: impl IntoIterator<Item = (impl AsRef<str>, impl AsRef<str>)>,
    body: impl Into<Bytes>,
) -> Response<Full<Bytes>> {
    let mut builder = Response::builder().status(status);
    for (key, value) in headers {
        builder = builder.header(key.as_ref(), value.as_ref());
    }
    builder
        .body(Full::new(body.into()))
        .unwrap_or_else(|_| internal_error())
}

/// Create a plain text response
pub fn text_response(status: StatusCode, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    build_response_with_headers(status, [("Content-Type", MIME_PLAINTEXT)], body)
}

/// Create a JSON response
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let json = serde_json::to_string_pretty(body).unwrap_or_else(|_| "null".to_string());
    build_response_with_headers(status, [("Content-Type", MIME_JSON)], json)
}

/// Render a registered response template.
///
/// The mime type becomes the Content-Type; a Content-Type among the template
/// headers takes precedence. Framing headers are left to the transport.
pub fn template_response(template: &ResponseTemplate) -> Response<Full<Bytes>> {
    let body = match template.status() {
        Status::NoContent | Status::NotModified => Bytes::new(),
        _ => template
            .body()
            .map(|b| Bytes::copy_from_slice(b.as_bytes()))
            .unwrap_or_default(),
    };

    let mut response = build_response(template.status().status_code(), body);
    let headers = response.headers_mut();

    match HeaderValue::from_str(template.mime_type()) {
        Ok(value) => {
            headers.insert(CONTENT_TYPE, value);
        }
        Err(_) => warn!("Skipping invalid mime type '{}'", template.mime_type()),
    }

    for (name, value) in template.headers() {
        if FRAMING_HEADERS
            .iter()
            .any(|framing| name.eq_ignore_ascii_case(framing))
        {
            debug!("Skipping framing header '{}' in response template", name);
            continue;
        }

        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => warn!("Skipping invalid response header '{}'", name),
        }
    }

    response
}

/// Collect request body into bytes
pub async fn collect_body<B>(req: Request<B>) -> Result<Bytes, String>
where
    B: Body,
    B::Error: Display,
{
    req.into_body()
        .collect()
        .await
        .map(|c| c.to_bytes())
        .map_err(|e| format!("{e}"))
}

fn internal_error() -> Response<Full<Bytes>> {
    Response::new(Full::new(Bytes::from("Internal Server Error")))
}
