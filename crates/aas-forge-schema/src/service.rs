//! The validation service seam.
//!
//! A service fetches the XSD once and checks XML text against it. The HTTP
//! implementation lives in [`crate::client`]; tests substitute their own.

use crate::client::GatewayError;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;

/// One raw error reported by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawError {
    /// Error text as reported
    pub message: String,
    /// 1-based line in the submitted XML, when known
    pub line: Option<u32>,
}

impl RawError {
    /// Create an error without location.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: None,
        }
    }

    /// Attach a line number.
    #[must_use]
    pub fn at_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }
}

/// What the service said about one document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServiceVerdict {
    /// Whether the service accepted the document
    pub valid: bool,
    /// Reported errors; any entry makes the verdict invalid
    pub errors: Vec<RawError>,
}

impl ServiceVerdict {
    /// A clean verdict.
    #[must_use]
    pub fn accepted() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    /// A rejecting verdict.
    #[must_use]
    pub fn rejected(errors: Vec<RawError>) -> Self {
        Self {
            valid: false,
            errors,
        }
    }

    /// Interpret a service response body.
    ///
    /// Accepted shapes: `{valid}`, `{valid:false, errors:[..]}`, a bare
    /// array of errors, or a single string. Errors are strings or objects
    /// with `message` and an optional `line` / `location`.
    #[must_use]
    pub fn from_response(body: &Value) -> Self {
        match body {
            Value::Array(items) => Self::from_errors(items.iter().filter_map(raw_error).collect()),
            Value::String(s) if s.trim().is_empty() => Self::accepted(),
            Value::String(s) => Self::rejected(vec![RawError::new(s.trim())]),
            Value::Object(map) => {
                let errors: Vec<RawError> = ["errors", "messages", "details"]
                    .iter()
                    .find_map(|key| map.get(*key).and_then(Value::as_array))
                    .map(|items| items.iter().filter_map(raw_error).collect())
                    .unwrap_or_default();
                let valid = map
                    .get("valid")
                    .and_then(Value::as_bool)
                    .unwrap_or(errors.is_empty());
                if valid && errors.is_empty() {
                    Self::accepted()
                } else {
                    Self::rejected(errors)
                }
            }
            Value::Null => Self::accepted(),
            other => Self::rejected(vec![RawError::new(other.to_string())]),
        }
    }

    fn from_errors(errors: Vec<RawError>) -> Self {
        if errors.is_empty() {
            Self::accepted()
        } else {
            Self::rejected(errors)
        }
    }
}

fn raw_error(item: &Value) -> Option<RawError> {
    match item {
        Value::String(s) if !s.trim().is_empty() => Some(RawError::new(s.trim())),
        Value::Object(map) => {
            let message = ["message", "msg", "error", "text"]
                .iter()
                .find_map(|key| map.get(*key).and_then(Value::as_str))?;
            let line = map
                .get("line")
                .and_then(line_number)
                .or_else(|| map.get("location").and_then(line_number));
            Some(RawError {
                message: message.trim().to_string(),
                line,
            })
        }
        _ => None,
    }
}

fn line_number(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s
            .split(|c: char| !c.is_ascii_digit())
            .find(|part| !part.is_empty())
            .and_then(|digits| digits.parse().ok()),
        Value::Object(map) => map.get("line").and_then(line_number),
        _ => None,
    }
}

/// A named document in a validation request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedDocument {
    /// File name shown in service diagnostics
    pub file_name: String,
    /// Document text
    pub contents: String,
}

/// Body sent to the validation service.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationRequest {
    /// Documents to check
    pub xml: Vec<NamedDocument>,
    /// Schemas to check against
    pub schema: Vec<NamedDocument>,
}

impl ValidationRequest {
    /// Build a request for a single document and schema.
    #[must_use]
    pub fn single(xml: &str, xsd: &str) -> Self {
        Self {
            xml: vec![NamedDocument {
                file_name: "aas.xml".to_string(),
                contents: xml.to_string(),
            }],
            schema: vec![NamedDocument {
                file_name: "AAS.xsd".to_string(),
                contents: xsd.to_string(),
            }],
        }
    }
}

/// An XSD validation backend.
pub trait SchemaService {
    /// Fetch the schema text to validate against.
    fn fetch_schema(&self) -> impl Future<Output = Result<String, GatewayError>> + Send;

    /// Check `xml` against `xsd`.
    fn validate(
        &self,
        xml: &str,
        xsd: &str,
    ) -> impl Future<Output = Result<ServiceVerdict, GatewayError>> + Send;
}
