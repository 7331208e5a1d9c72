//! AAS XML encoding.
//!
//! Writes the AAS 3.1 dialect and reads the 1.0, 3.0 and 3.1 dialects.
//!
//! ## Dialects
//!
//! ```xml
//! <!-- 1.0: aasenv root, elements wrapped in submodelElement -->
//! <aas:aasenv xmlns:aas="http://www.admin-shell.io/aas/1/0">
//!   <aas:submodelElement><aas:property>...</aas:property></aas:submodelElement>
//! </aas:aasenv>
//!
//! <!-- 3.x: environment root, typed elements directly -->
//! <environment xmlns="https://admin-shell.io/aas/3/1">
//!   <submodelElements><property>...</property></submodelElements>
//! </environment>
//! ```

pub(crate) mod dom;
mod reader;
mod writer;

pub use reader::decode_xml;
pub use writer::encode_xml;

use std::fmt;

/// Namespace URIs of the supported dialects.
pub mod namespace {
    /// AAS 1.0 (legacy).
    pub const AAS_1_0: &str = "http://www.admin-shell.io/aas/1/0";
    /// AAS 3.0.
    pub const AAS_3_0: &str = "https://admin-shell.io/aas/3/0";
    /// AAS 3.1, the dialect written by this crate.
    pub const AAS_3_1: &str = "https://admin-shell.io/aas/3/1";
    /// XML Schema instance.
    pub const XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";
}

/// Data specification template identifier for IEC 61360 content.
pub const IEC61360_TEMPLATE: &str =
    "https://admin-shell.io/DataSpecificationTemplates/DataSpecificationIec61360/3";

/// Qualifier type carrying an element's cardinality.
pub const CARDINALITY_QUALIFIER: &str = "SMT/Cardinality";

/// Qualifier types read as cardinality, including older template spellings.
pub(crate) const CARDINALITY_TYPES: [&str; 3] =
    [CARDINALITY_QUALIFIER, "Cardinality", "Multiplicity"];

/// MIME type written for a File or Blob that declares none.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Content type written for a File or Blob: the MIME type of pending
/// inline data, else the declared one, else [`DEFAULT_CONTENT_TYPE`].
pub(crate) fn effective_content_type<'a>(
    inline: Option<&'a str>,
    declared: Option<&'a str>,
) -> &'a str {
    inline
        .filter(|m| !m.is_empty())
        .or(declared.filter(|c| !c.is_empty()))
        .unwrap_or(DEFAULT_CONTENT_TYPE)
}

/// Historical AAS XML dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// AAS 1.0, `aasenv` root
    V1_0,
    /// AAS 3.0
    V3_0,
    /// AAS 3.1
    V3_1,
}

impl Dialect {
    /// Identify a dialect from a namespace URI.
    #[must_use]
    pub fn from_namespace(uri: &str) -> Option<Self> {
        if uri.contains("admin-shell.io/aas/1/0") {
            Some(Self::V1_0)
        } else if uri.contains("admin-shell.io/aas/3/0") {
            Some(Self::V3_0)
        } else if uri.contains("admin-shell.io/aas/3/1") {
            Some(Self::V3_1)
        } else {
            None
        }
    }

    /// Canonical namespace URI.
    #[must_use]
    pub fn namespace(self) -> &'static str {
        match self {
            Self::V1_0 => namespace::AAS_1_0,
            Self::V3_0 => namespace::AAS_3_0,
            Self::V3_1 => namespace::AAS_3_1,
        }
    }

    /// Whether documents in this dialect can be checked against the 3.1 schema.
    #[must_use]
    pub fn is_schema_checkable(self) -> bool {
        !matches!(self, Self::V1_0)
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V1_0 => f.write_str("AAS 1.0"),
            Self::V3_0 => f.write_str("AAS 3.0"),
            Self::V3_1 => f.write_str("AAS 3.1"),
        }
    }
}

/// Detect the dialect of an XML document from its text.
///
/// Looks at namespace declarations only; the document is not parsed.
#[must_use]
pub fn detect_dialect(xml: &str) -> Option<Dialect> {
    xml.match_indices("xmlns")
        .filter_map(|(start, _)| {
            let rest = &xml[start..];
            let open = rest.find(&['"', '\''][..])?;
            let quote = rest[open..].chars().next()?;
            let value = &rest[open + 1..];
            let close = value.find(quote)?;
            Dialect::from_namespace(&value[..close])
        })
        .next()
}

/// Rewrite the AAS 3.0 namespace to 3.1.
///
/// Used only to check 3.0 documents against the 3.1 schema; the original
/// text stays the source of truth for export. This is a compatibility
/// heuristic, not a migration.
#[must_use]
pub fn upgrade_namespace(xml: &str) -> String {
    xml.replace(namespace::AAS_3_0, namespace::AAS_3_1)
}
