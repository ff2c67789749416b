//! Registration payload decoding.
//!
//! The payload is first decoded into loosely-typed structs (every member
//! optional, unknown members ignored) and then validated into an
//! [`Expectation`], so a missing member yields a precise message instead of a
//! generic serde error.

use super::types::{
    ConfigurationError, Expectation, Method, RequestPredicate, ResponseTemplate, Status,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Body of a registration request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistrationPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<RequestSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ResponseSpec>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl RegistrationPayload {
    /// Decode and validate a JSON registration body.
    pub fn parse(json: &[u8]) -> Result<Expectation, ConfigurationError> {
        let payload: RegistrationPayload = serde_json::from_slice(json)?;
        Expectation::try_from(payload)
    }
}

impl TryFrom<RegistrationPayload> for Expectation {
    type Error = ConfigurationError;

    fn try_from(payload: RegistrationPayload) -> Result<Self, Self::Error> {
        let request = payload
            .request
            .ok_or(ConfigurationError::MissingField("request"))?;
        let response = payload
            .response
            .ok_or(ConfigurationError::MissingField("response"))?;

        let predicate = RequestPredicate::try_from(request)?;
        let template = ResponseTemplate::try_from(response)?;
        Ok(Expectation::new(predicate, template))
    }
}

impl TryFrom<RequestSpec> for RequestPredicate {
    type Error = ConfigurationError;

    fn try_from(spec: RequestSpec) -> Result<Self, Self::Error> {
        let uri = spec
            .uri
            .ok_or(ConfigurationError::MissingField("request.uri"))?;
        let mut predicate = RequestPredicate::new(&uri)?;

        if let Some(method) = spec.method.filter(|m| !m.trim().is_empty()) {
            predicate = predicate.with_method(method.parse::<Method>()?);
        }

        for (name, value) in spec.headers.unwrap_or_default() {
            predicate = predicate.with_header(&name, &value);
        }

        if let Some(body) = spec.body {
            predicate = predicate.with_body(&body)?;
        }

        if let Some(limit) = spec.limit {
            predicate = predicate.with_limit(limit)?;
        }

        Ok(predicate)
    }
}

impl TryFrom<ResponseSpec> for ResponseTemplate {
    type Error = ConfigurationError;

    fn try_from(spec: ResponseSpec) -> Result<Self, Self::Error> {
        let code = spec
            .status
            .ok_or(ConfigurationError::MissingField("response.status"))?;
        let status = u16::try_from(code)
            .ok()
            .and_then(Status::from_code)
            .ok_or(ConfigurationError::InvalidStatus(code))?;

        let mut template = ResponseTemplate::new(status);

        if let Some(mime_type) = spec.mime_type {
            template = template.with_mime_type(&mime_type);
        }

        for (name, value) in spec.headers.unwrap_or_default() {
            template = template.with_header(&name, &value)?;
        }

        if let Some(body) = spec.body {
            template = template.with_body(body);
        }

        Ok(template)
    }
}
