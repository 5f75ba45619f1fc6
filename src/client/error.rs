//! API error type and response classification.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// A non-expected HTTP response from a vendor API.
///
/// Built once per failed call by [`parse_error_response`]. `status` and
/// `raw_body` are always populated, whether or not the body parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("API error (HTTP {status}): {}", summary(.message, .detail, .code))]
pub struct ApiError {
    /// HTTP status code
    pub status: u16,
    /// Machine-readable error code, if the vendor sent one
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Additional detail text
    pub detail: String,
    /// Response body exactly as received
    pub raw_body: String,
    /// Field-level validation failures (422 overlay)
    pub field_errors: Option<Vec<FieldError>>,
}

/// One field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Dotted path of the offending field, e.g. `body.geometry.coordinates`
    pub field: String,
    pub message: String,
}

impl ApiError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            code: String::new(),
            message: message.into(),
            detail: String::new(),
            raw_body: String::new(),
            field_errors: None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    pub fn is_forbidden(&self) -> bool {
        self.status == 403
    }

    pub fn is_bad_request(&self) -> bool {
        self.status == 400
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status == 429
    }

    pub fn is_conflict(&self) -> bool {
        self.status == 409
    }

    pub fn is_validation_error(&self) -> bool {
        self.status == 422
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }
}

fn summary<'a>(message: &'a str, detail: &'a str, code: &'a str) -> &'a str {
    [message, detail, code]
        .into_iter()
        .find(|s| !s.is_empty())
        .unwrap_or("no message")
}

/// Generic error envelope. Vendors disagree on field names, so every
/// known one is optional and the first non-empty value wins.
#[derive(Debug, Default, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    code: Option<Value>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    detail: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
    /// OAuth2 token endpoints put the human-readable text here.
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    errors: Option<Vec<Value>>,
}

/// Classify a failed response into an [`ApiError`].
pub fn parse_error_response(status: u16, body: &str) -> ApiError {
    let mut err = ApiError::new(status, String::new());
    err.raw_body = body.to_string();

    let envelope = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => envelope,
        Err(_) => {
            err.message = body.trim().to_string();
            return err;
        }
    };

    if let Some(code) = envelope.code {
        err.code = scalar_text(&code);
    }

    let mut message = envelope.message.unwrap_or_default();

    match envelope.error {
        Some(Value::String(text)) if message.is_empty() => message = text,
        Some(Value::String(text)) if err.code.is_empty() => err.code = text,
        Some(Value::Object(inner)) => {
            if err.code.is_empty()
                && let Some(code) = inner.get("code").or_else(|| inner.get("type"))
            {
                err.code = scalar_text(code);
            }
            if message.is_empty()
                && let Some(Value::String(text)) = inner.get("message")
            {
                message = text.clone();
            }
        }
        _ => {}
    }

    let mut field_errors = Vec::new();
    match envelope.detail {
        Some(Value::String(text)) => err.detail = text,
        Some(Value::Array(items)) => field_errors.extend(items.iter().filter_map(detail_entry)),
        Some(other @ Value::Object(_)) => err.detail = other.to_string(),
        _ => {}
    }
    if err.detail.is_empty()
        && let Some(text) = envelope.error_description
    {
        err.detail = text;
    }
    if let Some(items) = envelope.errors {
        field_errors.extend(items.iter().filter_map(errors_entry));
    }

    if message.is_empty() {
        message = envelope.title.unwrap_or_default();
    }
    err.message = message;

    if status == 422 && !field_errors.is_empty() {
        err.field_errors = Some(field_errors);
    }

    err
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

// `{"loc": ["body", "geometry"], "msg": "field required"}`
fn detail_entry(item: &Value) -> Option<FieldError> {
    let message = item.get("msg").or_else(|| item.get("message"))?.as_str()?;
    let field = match item.get("loc") {
        Some(Value::Array(parts)) => parts.iter().map(scalar_text).collect::<Vec<_>>().join("."),
        Some(other) => scalar_text(other),
        None => String::new(),
    };
    Some(FieldError {
        field,
        message: message.to_string(),
    })
}

// `{"field": "aoi", "message": "must be a polygon"}`
fn errors_entry(item: &Value) -> Option<FieldError> {
    let message = item.get("message").or_else(|| item.get("msg"))?.as_str()?;
    let field = item
        .get("field")
        .or_else(|| item.get("path"))
        .map(scalar_text)
        .unwrap_or_default();
    Some(FieldError {
        field,
        message: message.to_string(),
    })
}
