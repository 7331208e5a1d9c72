//! # AAS-Forge Codec
//!
//! Bidirectional mapping between the in-memory element tree and the
//! serialized Asset Administration Shell encodings.
//!
//! ## Encodings
//!
//! - **XML**: writes AAS 3.1; reads 1.0 (`aasenv`), 3.0 and 3.1
//! - **JSON**: the `assetAdministrationShells` / `submodels` /
//!   `conceptDescriptions` envelope, plus template shapes on input
//! - **AASX**: OPC package holding both encodings and attachments
//!
//! Element ordering inside an XML element is schema-relevant: kind-specific
//! content precedes `semanticId`, which precedes qualifiers and embedded
//! data specifications.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod document;
pub mod encoding;
pub mod error;
pub mod json;
pub mod package;
pub mod xml;

pub use document::{decode_auto, Decoded, SourceFormat};
pub use error::CodecError;
pub use json::{decode_json, encode_json, to_json_value};
pub use package::{read_aasx, write_aasx, AasxPackage};
pub use xml::{decode_xml, detect_dialect, encode_xml, upgrade_namespace, Dialect};
