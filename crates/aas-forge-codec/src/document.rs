//! Decoded documents and format sniffing.

use crate::error::CodecError;
use crate::xml::Dialect;
use aas_forge_core::{ConceptDescription, Environment};
use std::fmt;

/// Encoding a document was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// AAS XML in the given dialect
    Xml(Dialect),
    /// AAS JSON
    Json,
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Xml(dialect) => write!(f, "XML ({dialect})"),
            Self::Json => f.write_str("JSON"),
        }
    }
}

/// Result of decoding an AAS document.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    /// Shell and submodels
    pub environment: Environment,
    /// Submodel identifiers referenced by the shell
    pub submodel_refs: Vec<String>,
    /// Concept descriptions found in the document
    pub concept_descriptions: Vec<ConceptDescription>,
    /// Encoding the document was read from
    pub format: SourceFormat,
}

/// Decode either encoding, choosing by the first significant character.
///
/// # Errors
///
/// Returns the decoder's error for malformed input.
pub fn decode_auto(input: &[u8]) -> Result<Decoded, CodecError> {
    // Skips whitespace and a UTF-8 byte order mark.
    let first = input
        .iter()
        .copied()
        .find(|b| !(b.is_ascii_whitespace() || matches!(b, 0xEF | 0xBB | 0xBF)));
    match first {
        Some(b'{' | b'[') => crate::json::decode_json(input),
        Some(b'<') => crate::xml::decode_xml(input),
        _ => Err(CodecError::Missing("AAS document content".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(decode_auto(b"   "), Err(CodecError::Missing(_))));
    }

    #[test]
    fn json_is_sniffed() {
        let decoded = decode_auto(b" {\"submodels\": []}").unwrap();
        assert_eq!(decoded.format, SourceFormat::Json);
    }
}
