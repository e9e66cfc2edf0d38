//! Request validation at the boundary.
//!
//! A request arrives as an untyped JSON object. It is validated exactly
//! once into a [`MetricsRequest`]; nothing partially valid reaches the
//! aggregator.

use crate::models::MetricsRequest;
use serde::Deserialize;
use serde_json::Value;

/// Errors reported for a malformed request body.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("missing required field '{0}'")]
    MissingField(&'static str),
    #[error("field '{field}' {reason}")]
    InvalidField {
        field: &'static str,
        reason: &'static str,
    },
    #[error("request body is not a JSON object: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A request payload as received, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRequest {
    #[serde(default)]
    pub regions: Option<Value>,
    #[serde(default)]
    pub threshold_ms: Option<Value>,
}

impl RawRequest {
    /// Parse a raw request from a JSON object.
    pub fn from_json_str(content: &str) -> Result<Self, RequestError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Validate into a typed request.
    ///
    /// Presence is checked for both fields before either field's type.
    pub fn validate(self) -> Result<MetricsRequest, RequestError> {
        let regions = self
            .regions
            .filter(|v| !v.is_null())
            .ok_or(RequestError::MissingField("regions"))?;
        let threshold = self
            .threshold_ms
            .filter(|v| !v.is_null())
            .ok_or(RequestError::MissingField("threshold_ms"))?;

        let regions = match regions {
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s),
                    _ => Err(RequestError::InvalidField {
                        field: "regions",
                        reason: "must contain only strings",
                    }),
                })
                .collect::<Result<Vec<_>, _>>()?,
            _ => {
                return Err(RequestError::InvalidField {
                    field: "regions",
                    reason: "must be an array of strings",
                })
            }
        };

        let threshold_ms = threshold
            .as_f64()
            .filter(|t| t.is_finite())
            .ok_or(RequestError::InvalidField {
                field: "threshold_ms",
                reason: "must be a number",
            })?;

        Ok(MetricsRequest {
            regions,
            threshold_ms,
        })
    }
}

/// Parse and validate a JSON request body in one step.
pub fn parse_request(content: &str) -> Result<MetricsRequest, RequestError> {
    RawRequest::from_json_str(content)?.validate()
}
