//! Part-name and inline payload encoding.
//!
//! - Package part names follow OPC rules: absolute, `/`-separated, with
//!   every segment percent-encoded
//! - Inline binaries (Blob values, attachments in JSON) are standard base64
//!
//! # References
//!
//! - ISO/IEC 29500-2 (Open Packaging Conventions), part naming
//! - IDTA 01005: Specification of the Asset Administration Shell Part 5 (AASX)

use crate::error::CodecError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

/// Characters that must be percent-encoded inside a part-name segment.
const PART_SEGMENT_ESCAPE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'?')
    .add(b'[')
    .add(b']')
    .add(b'{')
    .add(b'}')
    .add(b'\\');

/// Normalize a package path: forward slashes, exactly one leading `/`.
///
/// # Examples
///
/// ```
/// use aas_forge_codec::encoding::normalize_part_path;
///
/// assert_eq!(normalize_part_path("aasx/files/manual.pdf"), "/aasx/files/manual.pdf");
/// assert_eq!(normalize_part_path("\\aasx\\files\\a.png"), "/aasx/files/a.png");
/// ```
#[must_use]
pub fn normalize_part_path(path: &str) -> String {
    let path = path.trim().replace('\\', "/");
    format!("/{}", path.trim_start_matches('/'))
}

/// Encode a package path as an OPC part name.
///
/// # Examples
///
/// ```
/// use aas_forge_codec::encoding::encode_part_name;
///
/// assert_eq!(encode_part_name("aasx/files/My Manual.pdf"), "/aasx/files/My%20Manual.pdf");
/// ```
#[must_use]
pub fn encode_part_name(path: &str) -> String {
    normalize_part_path(path)
        .split('/')
        .map(|segment| utf8_percent_encode(segment, PART_SEGMENT_ESCAPE).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// Decode an OPC part name back to a package path.
///
/// # Errors
///
/// Returns error if the decoded bytes are not UTF-8.
pub fn decode_part_name(encoded: &str) -> Result<String, CodecError> {
    percent_decode_str(encoded)
        .decode_utf8()
        .map(|s| normalize_part_path(&s))
        .map_err(|e| CodecError::Payload(e.to_string()))
}

/// Encode binary content as base64.
#[must_use]
pub fn encode_payload(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode base64 content, ignoring embedded whitespace.
///
/// # Errors
///
/// Returns error if the input is not valid base64.
pub fn decode_payload(text: &str) -> Result<Vec<u8>, CodecError> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD
        .decode(compact)
        .map_err(|e| CodecError::Payload(e.to_string()))
}
