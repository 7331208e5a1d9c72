//! Structural validation.
//!
//! Checks an environment against the AAS structural rules that can be
//! decided without an XML schema: idShort syntax and uniqueness, presence
//! of required values, and value/type consistency. All issues are
//! collected in one pass; nothing short-circuits.

use crate::model::{ElementContent, Shell, Submodel, SubmodelElement};
use crate::types::{is_valid_value_for_xsd_type, resolve_value_type, XsdType};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::OnceLock;

/// Separator used when rendering issue paths.
pub const PATH_SEPARATOR: &str = " > ";

/// Category of a structural issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueKind {
    /// idShort does not match the required pattern
    InvalidIdShort,
    /// Two siblings share an idShort
    DuplicateIdShort,
    /// A required property has no resolvable value type
    MissingValueType,
    /// A literal does not satisfy its value type
    InvalidValue,
    /// A required element is empty
    MissingValue,
}

/// A single structural problem, located by idShort path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Category
    pub kind: IssueKind,
    /// idShorts from the submodel down to the offending element
    pub path: Vec<String>,
    /// Human-readable message
    pub message: String,
}

impl Issue {
    /// The path rendered as `Submodel > Parent > Element`.
    #[must_use]
    pub fn path_display(&self) -> String {
        self.path.join(PATH_SEPARATOR)
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path_display(), self.message)
    }
}

/// Outcome of structural validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ValidationReport {
    /// True when no issues were found
    pub valid: bool,
    /// Issues in document order
    pub issues: Vec<Issue>,
}

fn id_short_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([a-zA-Z]|[a-zA-Z][a-zA-Z0-9_-]*[a-zA-Z0-9])$").expect("valid regex")
    })
}

/// Whether `id_short` is a legal idShort.
///
/// # Examples
///
/// ```
/// use aas_forge_core::validate::is_valid_id_short;
///
/// assert!(is_valid_id_short("Abc_1"));
/// assert!(is_valid_id_short("A"));
/// assert!(!is_valid_id_short("1abc"));
/// assert!(!is_valid_id_short("abc_"));
/// ```
#[must_use]
pub fn is_valid_id_short(id_short: &str) -> bool {
    id_short_pattern().is_match(id_short)
}

/// Validate a shell and its submodels.
#[must_use]
pub fn validate(shell: &Shell, submodels: &[Submodel]) -> ValidationReport {
    let mut validator = Validator::default();

    if !shell.id_short.is_empty() {
        validator.check_id_short(&[], &shell.id_short);
    }

    for submodel in submodels {
        let path = vec![submodel.id_short.clone()];
        if !submodel.id_short.is_empty() {
            validator.check_id_short(&[], &submodel.id_short);
        }
        validator.walk(&path, &submodel.elements);
    }

    let issues = validator.issues;
    tracing::debug!(
        submodels = submodels.len(),
        issues = issues.len(),
        "Structural validation finished"
    );
    ValidationReport {
        valid: issues.is_empty(),
        issues,
    }
}

#[derive(Default)]
struct Validator {
    issues: Vec<Issue>,
}

impl Validator {
    fn push(&mut self, kind: IssueKind, path: Vec<String>, message: String) {
        self.issues.push(Issue {
            kind,
            path,
            message,
        });
    }

    fn check_id_short(&mut self, parent: &[String], id_short: &str) {
        if !is_valid_id_short(id_short) {
            let mut path = parent.to_vec();
            path.push(id_short.to_string());
            self.push(
                IssueKind::InvalidIdShort,
                path,
                format!(
                    "idShort \"{id_short}\" must start with a letter, end with a letter or digit \
                     and contain only letters, digits, '_' or '-'"
                ),
            );
        }
    }

    fn walk(&mut self, parent: &[String], elements: &[SubmodelElement]) {
        let mut siblings = HashSet::new();
        for element in elements {
            let mut path = parent.to_vec();
            path.push(element.id_short.clone());

            if !is_valid_id_short(&element.id_short) {
                self.check_id_short(parent, &element.id_short);
            } else if !siblings.insert(element.id_short.as_str()) {
                self.push(
                    IssueKind::DuplicateIdShort,
                    path.clone(),
                    format!("idShort \"{}\" is used by more than one sibling", element.id_short),
                );
            }

            self.check_element(&path, element);

            for group in element.nested_groups() {
                self.walk(&path, group);
            }
        }
    }

    fn check_element(&mut self, path: &[String], element: &SubmodelElement) {
        let required = element.cardinality.is_required();
        match &element.content {
            ElementContent::Property { value_type, value } => {
                let resolved = resolve_value_type(*value_type, element.data_type);
                match resolved {
                    None if required => self.push(
                        IssueKind::MissingValueType,
                        path.to_vec(),
                        "Property has no value type and none can be derived from its data type"
                            .to_string(),
                    ),
                    Some(t) => self.check_literal(path, t, value, "value"),
                    None => {}
                }
                if required && value.trim().is_empty() {
                    self.missing(path, "Required property has no value");
                }
            }
            ElementContent::File {
                value, file_data, ..
            } => {
                if required && value.trim().is_empty() && file_data.is_none() {
                    self.missing(path, "Required file has neither a path nor an attachment");
                }
            }
            ElementContent::MultiLanguageProperty { value } => {
                if required && value.values().all(|t| t.trim().is_empty()) {
                    self.missing(path, "Required multi-language property has no text");
                }
            }
            ElementContent::Collection { children } | ElementContent::List { children } => {
                if required && children.is_empty() {
                    self.missing(path, "Required container has no child elements");
                }
            }
            ElementContent::Range {
                value_type,
                min,
                max,
            } => {
                if let Some(t) = resolve_value_type(*value_type, element.data_type) {
                    if let Some(min) = min {
                        self.check_literal(path, t, min, "min");
                    }
                    if let Some(max) = max {
                        self.check_literal(path, t, max, "max");
                    }
                }
            }
            _ => {}
        }
    }

    fn check_literal(&mut self, path: &[String], value_type: XsdType, literal: &str, field: &str) {
        if !is_valid_value_for_xsd_type(value_type, literal.trim()) {
            self.push(
                IssueKind::InvalidValue,
                path.to_vec(),
                format!("{field} \"{literal}\" is not a valid {value_type}"),
            );
        }
    }

    fn missing(&mut self, path: &[String], message: &str) {
        self.push(IssueKind::MissingValue, path.to_vec(), message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Cardinality, FileData};
    use crate::types::IecDataType;

    fn nameplate(elements: Vec<SubmodelElement>) -> Vec<Submodel> {
        let mut sm = Submodel::new("Nameplate", "https://ex/sm/nameplate");
        sm.elements = elements;
        vec![sm]
    }

    fn shell() -> Shell {
        Shell::new("Motor1", "https://ex/aas/1")
    }

    #[test]
    fn id_short_pattern_cases() {
        for ok in ["Abc_1", "A", "a-b", "Zz9"] {
            assert!(is_valid_id_short(ok), "{ok} should be valid");
        }
        for bad in ["1abc", "abc_", "-abc", "", "a b", "a.b"] {
            assert!(!is_valid_id_short(bad), "{bad} should be invalid");
        }
    }

    #[test]
    fn filled_property_passes() {
        let sms = nameplate(vec![SubmodelElement::property(
            "SerialNumber",
            Some(XsdType::String),
            "SN-42",
        )]);
        let report = validate(&shell(), &sms);
        assert!(report.valid, "{:?}", report.issues);
    }

    #[test]
    fn required_empty_property_yields_one_issue() {
        let mut sms = nameplate(vec![SubmodelElement::property(
            "SerialNumber",
            Some(XsdType::String),
            "",
        )]);
        let report = validate(&shell(), &sms);
        assert!(!report.valid);
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].kind, IssueKind::MissingValue);
        assert_eq!(report.issues[0].path_display(), "Nameplate > SerialNumber");

        sms[0].elements[0].content = ElementContent::Property {
            value_type: Some(XsdType::String),
            value: "SN-1".to_string(),
        };
        assert!(validate(&shell(), &sms).valid);
    }

    #[test]
    fn optional_empty_elements_pass() {
        let sms = nameplate(vec![
            SubmodelElement::property("Note", None, "").with_cardinality(Cardinality::ZeroToOne),
            SubmodelElement::collection("Extras", vec![])
                .with_cardinality(Cardinality::ZeroToMany),
        ]);
        assert!(validate(&shell(), &sms).valid);
    }

    #[test]
    fn missing_type_is_resolved_from_iec() {
        let mut prop = SubmodelElement::property("Weight", None, "12.5");
        let sms = nameplate(vec![prop.clone()]);
        let report = validate(&shell(), &sms);
        assert_eq!(report.issues[0].kind, IssueKind::MissingValueType);

        prop.data_type = Some(IecDataType::RealMeasure);
        assert!(validate(&shell(), &nameplate(vec![prop])).valid);
    }

    #[test]
    fn type_mismatch_is_reported() {
        let sms = nameplate(vec![SubmodelElement::property(
            "Count",
            Some(XsdType::Integer),
            "1.2",
        )]);
        let report = validate(&shell(), &sms);
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].kind, IssueKind::InvalidValue);
    }

    #[test]
    fn recursion_collects_all_issues() {
        let sms = nameplate(vec![SubmodelElement::collection(
            "1Bad",
            vec![
                SubmodelElement::property("Empty", Some(XsdType::String), ""),
                SubmodelElement::multi_language("Title", [("en", "  ")]),
            ],
        )]);
        let report = validate(&shell(), &sms);
        let paths: Vec<_> = report.issues.iter().map(Issue::path_display).collect();
        assert_eq!(
            paths,
            [
                "Nameplate > 1Bad",
                "Nameplate > 1Bad > Empty",
                "Nameplate > 1Bad > Title",
            ]
        );
    }

    #[test]
    fn file_attachment_satisfies_presence() {
        let mut file = SubmodelElement::file("Manual", "");
        assert_eq!(validate(&shell(), &nameplate(vec![file.clone()])).issues.len(), 1);

        file.content = ElementContent::File {
            value: String::new(),
            content_type: None,
            file_data: Some(FileData {
                bytes: b"%PDF".to_vec(),
                mime_type: "application/pdf".to_string(),
                file_name: "manual.pdf".to_string(),
            }),
        };
        assert!(validate(&shell(), &nameplate(vec![file])).valid);
    }

    #[test]
    fn duplicate_siblings_are_reported() {
        let sms = nameplate(vec![
            SubmodelElement::property("A", Some(XsdType::String), "x"),
            SubmodelElement::property("A", Some(XsdType::String), "y"),
        ]);
        let report = validate(&shell(), &sms);
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].kind, IssueKind::DuplicateIdShort);
    }

    #[test]
    fn range_bounds_are_type_checked() {
        let range = SubmodelElement::new(
            "Temp",
            ElementContent::Range {
                value_type: Some(XsdType::Int),
                min: Some("-20".to_string()),
                max: Some("high".to_string()),
            },
        );
        let report = validate(&shell(), &nameplate(vec![range]));
        assert_eq!(report.issues.len(), 1);
        assert!(report.issues[0].message.starts_with("max"));
    }

    #[test]
    fn bad_shell_id_short_is_reported() {
        let shell = Shell::new("Motor 1", "https://ex/aas/1");
        let report = validate(&shell, &[]);
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].path, ["Motor 1"]);
    }
}
