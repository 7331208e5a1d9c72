//! Value type normalization.
//!
//! Maps between the IEC 61360 semantic data types, the XML Schema scalar
//! types used as AAS `valueType`, and checks literals against a chosen
//! XSD type.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Canonical XML Schema scalar types accepted as `valueType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum XsdType {
    /// `xs:string`
    String,
    /// `xs:boolean`
    Boolean,
    /// `xs:decimal`
    Decimal,
    /// `xs:integer`
    Integer,
    /// `xs:double`
    Double,
    /// `xs:float`
    Float,
    /// `xs:date`
    Date,
    /// `xs:time`
    Time,
    /// `xs:dateTime`
    DateTime,
    /// `xs:anyURI`
    AnyUri,
    /// `xs:base64Binary`
    Base64Binary,
    /// `xs:hexBinary`
    HexBinary,
    /// `xs:duration`
    Duration,
    /// `xs:byte`
    Byte,
    /// `xs:short`
    Short,
    /// `xs:int`
    Int,
    /// `xs:long`
    Long,
    /// `xs:unsignedByte`
    UnsignedByte,
    /// `xs:unsignedShort`
    UnsignedShort,
    /// `xs:unsignedInt`
    UnsignedInt,
    /// `xs:unsignedLong`
    UnsignedLong,
}

impl XsdType {
    /// Every canonical type, in declaration order.
    pub const ALL: [Self; 21] = [
        Self::String,
        Self::Boolean,
        Self::Decimal,
        Self::Integer,
        Self::Double,
        Self::Float,
        Self::Date,
        Self::Time,
        Self::DateTime,
        Self::AnyUri,
        Self::Base64Binary,
        Self::HexBinary,
        Self::Duration,
        Self::Byte,
        Self::Short,
        Self::Int,
        Self::Long,
        Self::UnsignedByte,
        Self::UnsignedShort,
        Self::UnsignedInt,
        Self::UnsignedLong,
    ];

    /// The canonical `xs:`-prefixed name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "xs:string",
            Self::Boolean => "xs:boolean",
            Self::Decimal => "xs:decimal",
            Self::Integer => "xs:integer",
            Self::Double => "xs:double",
            Self::Float => "xs:float",
            Self::Date => "xs:date",
            Self::Time => "xs:time",
            Self::DateTime => "xs:dateTime",
            Self::AnyUri => "xs:anyURI",
            Self::Base64Binary => "xs:base64Binary",
            Self::HexBinary => "xs:hexBinary",
            Self::Duration => "xs:duration",
            Self::Byte => "xs:byte",
            Self::Short => "xs:short",
            Self::Int => "xs:int",
            Self::Long => "xs:long",
            Self::UnsignedByte => "xs:unsignedByte",
            Self::UnsignedShort => "xs:unsignedShort",
            Self::UnsignedInt => "xs:unsignedInt",
            Self::UnsignedLong => "xs:unsignedLong",
        }
    }

    fn is_signed_integer(self) -> bool {
        matches!(
            self,
            Self::Integer | Self::Byte | Self::Short | Self::Int | Self::Long
        )
    }

    fn is_unsigned_integer(self) -> bool {
        matches!(
            self,
            Self::UnsignedByte | Self::UnsignedShort | Self::UnsignedInt | Self::UnsignedLong
        )
    }

    fn is_floating(self) -> bool {
        matches!(self, Self::Decimal | Self::Double | Self::Float)
    }
}

impl fmt::Display for XsdType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for XsdType {
    type Err = UnknownType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        normalize_value_type(Some(s)).ok_or_else(|| UnknownType(s.to_string()))
    }
}

/// IEC 61360 data types as used in `dataSpecificationIec61360`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IecDataType {
    /// `DATE`
    Date,
    /// `STRING`
    String,
    /// `STRING_TRANSLATABLE`
    StringTranslatable,
    /// `INTEGER_MEASURE`
    IntegerMeasure,
    /// `INTEGER_COUNT`
    IntegerCount,
    /// `INTEGER_CURRENCY`
    IntegerCurrency,
    /// `REAL_MEASURE`
    RealMeasure,
    /// `REAL_COUNT`
    RealCount,
    /// `REAL_CURRENCY`
    RealCurrency,
    /// `BOOLEAN`
    Boolean,
    /// `IRI`
    Iri,
    /// `IRDI`
    Irdi,
    /// `RATIONAL`
    Rational,
    /// `RATIONAL_MEASURE`
    RationalMeasure,
    /// `TIME`
    Time,
    /// `TIMESTAMP`
    Timestamp,
    /// `FILE`
    File,
    /// `HTML`
    Html,
    /// `BLOB`
    Blob,
}

impl IecDataType {
    /// Every IEC 61360 data type.
    pub const ALL: [Self; 19] = [
        Self::Date,
        Self::String,
        Self::StringTranslatable,
        Self::IntegerMeasure,
        Self::IntegerCount,
        Self::IntegerCurrency,
        Self::RealMeasure,
        Self::RealCount,
        Self::RealCurrency,
        Self::Boolean,
        Self::Iri,
        Self::Irdi,
        Self::Rational,
        Self::RationalMeasure,
        Self::Time,
        Self::Timestamp,
        Self::File,
        Self::Html,
        Self::Blob,
    ];

    /// The tag as it appears in serialized documents.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Date => "DATE",
            Self::String => "STRING",
            Self::StringTranslatable => "STRING_TRANSLATABLE",
            Self::IntegerMeasure => "INTEGER_MEASURE",
            Self::IntegerCount => "INTEGER_COUNT",
            Self::IntegerCurrency => "INTEGER_CURRENCY",
            Self::RealMeasure => "REAL_MEASURE",
            Self::RealCount => "REAL_COUNT",
            Self::RealCurrency => "REAL_CURRENCY",
            Self::Boolean => "BOOLEAN",
            Self::Iri => "IRI",
            Self::Irdi => "IRDI",
            Self::Rational => "RATIONAL",
            Self::RationalMeasure => "RATIONAL_MEASURE",
            Self::Time => "TIME",
            Self::Timestamp => "TIMESTAMP",
            Self::File => "FILE",
            Self::Html => "HTML",
            Self::Blob => "BLOB",
        }
    }
}

impl fmt::Display for IecDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IecDataType {
    type Err = UnknownType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownType(s.to_string()))
    }
}

/// A type tag outside the closed vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown type tag: {0}")]
pub struct UnknownType(pub String);

/// Normalize a raw `valueType` to its canonical XSD type.
///
/// Accepts names with or without the `xs:` prefix, in any case. Anything
/// outside the canonical set yields `None`.
///
/// # Examples
///
/// ```
/// use aas_forge_core::types::{normalize_value_type, XsdType};
///
/// assert_eq!(normalize_value_type(Some("XS:STRING")), Some(XsdType::String));
/// assert_eq!(normalize_value_type(Some("dateTime")), Some(XsdType::DateTime));
/// assert_eq!(normalize_value_type(Some("xs:nonsense")), None);
/// ```
#[must_use]
pub fn normalize_value_type(raw: Option<&str>) -> Option<XsdType> {
    let raw = raw?.trim();
    let bare = match raw.get(..3) {
        Some(prefix) if prefix.eq_ignore_ascii_case("xs:") => &raw[3..],
        _ => raw,
    };
    if bare.is_empty() {
        return None;
    }
    XsdType::ALL
        .into_iter()
        .find(|t| t.as_str()[3..].eq_ignore_ascii_case(bare))
}

/// Derive a value type from an IEC 61360 data type.
#[must_use]
pub fn derive_value_type_from_iec(iec: Option<IecDataType>) -> Option<XsdType> {
    match iec? {
        IecDataType::Boolean => Some(XsdType::Boolean),
        IecDataType::IntegerMeasure | IecDataType::IntegerCount | IecDataType::IntegerCurrency => {
            Some(XsdType::Integer)
        }
        IecDataType::RealMeasure | IecDataType::RealCount | IecDataType::RealCurrency => {
            Some(XsdType::Decimal)
        }
        IecDataType::Date => Some(XsdType::Date),
        IecDataType::Time => Some(XsdType::Time),
        IecDataType::Timestamp => Some(XsdType::DateTime),
        IecDataType::Blob => Some(XsdType::Base64Binary),
        IecDataType::Iri => Some(XsdType::AnyUri),
        IecDataType::String
        | IecDataType::StringTranslatable
        | IecDataType::Irdi
        | IecDataType::Html
        | IecDataType::Rational
        | IecDataType::RationalMeasure => Some(XsdType::String),
        IecDataType::File => None,
    }
}

/// Resolve the effective value type: explicit type first, IEC-derived second.
#[must_use]
pub fn resolve_value_type(
    value_type: Option<XsdType>,
    data_type: Option<IecDataType>,
) -> Option<XsdType> {
    value_type.or_else(|| derive_value_type_from_iec(data_type))
}

fn signed_integer_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^-?\d+$").expect("valid regex"))
}

fn unsigned_integer_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d+$").expect("valid regex"))
}

fn decimal_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?$").expect("valid regex")
    })
}

/// Check a literal against an XSD type.
///
/// The empty literal is always accepted; presence is checked separately.
/// Types without a lexical rule here pass unchecked.
///
/// # Examples
///
/// ```
/// use aas_forge_core::types::{is_valid_value_for_xsd_type, XsdType};
///
/// assert!(is_valid_value_for_xsd_type(XsdType::Integer, "12"));
/// assert!(!is_valid_value_for_xsd_type(XsdType::Integer, "1.2"));
/// assert!(!is_valid_value_for_xsd_type(XsdType::Boolean, "yes"));
/// assert!(is_valid_value_for_xsd_type(XsdType::Boolean, ""));
/// ```
#[must_use]
pub fn is_valid_value_for_xsd_type(value_type: XsdType, literal: &str) -> bool {
    if literal.is_empty() {
        return true;
    }
    if value_type == XsdType::Boolean {
        return literal.eq_ignore_ascii_case("true")
            || literal.eq_ignore_ascii_case("false")
            || literal == "1"
            || literal == "0";
    }
    if value_type.is_signed_integer() {
        return signed_integer_pattern().is_match(literal);
    }
    if value_type.is_unsigned_integer() {
        return unsigned_integer_pattern().is_match(literal);
    }
    if value_type.is_floating() {
        return decimal_pattern().is_match(literal);
    }
    true
}
