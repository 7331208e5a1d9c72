//! Codec error types.

/// Errors that can occur while encoding or decoding AAS documents.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CodecError {
    /// Malformed XML or a failed XML write
    #[error("XML error: {0}")]
    Xml(String),
    /// Malformed JSON or a failed JSON write
    #[error("JSON error: {0}")]
    Json(String),
    /// The document's namespace is not a supported AAS dialect
    #[error("unsupported AAS dialect: {0}")]
    UnsupportedDialect(String),
    /// A structurally required part of the document is missing
    #[error("missing required {0}")]
    Missing(String),
    /// ZIP container error
    #[error("archive error: {0}")]
    Archive(String),
    /// Inline payload could not be decoded
    #[error("payload error: {0}")]
    Payload(String),
}

impl CodecError {
    /// Create an XML error.
    pub fn xml(message: impl Into<String>) -> Self {
        Self::Xml(message.into())
    }

    /// Create a JSON error.
    pub fn json(message: impl Into<String>) -> Self {
        Self::Json(message.into())
    }

    /// Create an archive error.
    pub fn archive(message: impl Into<String>) -> Self {
        Self::Archive(message.into())
    }
}

impl From<zip::result::ZipError> for CodecError {
    fn from(e: zip::result::ZipError) -> Self {
        Self::Archive(e.to_string())
    }
}
