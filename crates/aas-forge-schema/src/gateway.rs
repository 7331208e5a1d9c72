//! Schema validation gateway and the validate-then-export pipeline.
//!
//! Runs strictly in sequence: build XML, fetch schema, call the validator,
//! interpret the result. Any boundary failure becomes an invalid report.

use crate::client::GatewayError;
use crate::hints::{dedup_by_message, hint_for, line_in_message, path_for_line};
use crate::service::{SchemaService, ServiceVerdict};
use aas_forge_codec::{
    detect_dialect, encode_xml, upgrade_namespace, write_aasx, CodecError, Dialect,
};
use aas_forge_core::validate::PATH_SEPARATOR;
use aas_forge_core::{
    collect_concept_descriptions, validate, ConceptDescription, Environment, ExportBlocked,
    ExportGate, ValidationReport,
};
use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;
use tokio::sync::OnceCell;

/// How a document was checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    /// Sent to the validator as is
    Full,
    /// AAS 1.0 document accepted without calling the validator
    Compatibility,
    /// AAS 3.0 namespace rewritten to 3.1 before validation
    UpgradedNamespace,
}

/// One schema violation, enriched where possible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaIssue {
    /// Validator message
    pub message: String,
    /// 1-based line in the submitted XML
    pub line: Option<u32>,
    /// Suggested fix for a known violation pattern
    pub hint: Option<String>,
    /// Guessed idShort path of the offending element
    pub path: Vec<String>,
}

impl SchemaIssue {
    fn failure(error: &GatewayError) -> Self {
        Self {
            message: error.to_string(),
            line: None,
            hint: None,
            path: Vec::new(),
        }
    }

    /// Path joined for display.
    #[must_use]
    pub fn path_display(&self) -> String {
        self.path.join(PATH_SEPARATOR)
    }
}

/// Outcome of schema validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaReport {
    /// True only when the validator confirmed the document
    pub valid: bool,
    /// How the document was checked
    pub mode: ValidationMode,
    /// Violations and failures
    pub issues: Vec<SchemaIssue>,
}

impl SchemaReport {
    fn clean(mode: ValidationMode) -> Self {
        Self {
            valid: true,
            mode,
            issues: Vec::new(),
        }
    }

    fn failed(mode: ValidationMode, error: &GatewayError) -> Self {
        tracing::error!(error = %error, "Schema validation failed");
        Self {
            valid: false,
            mode,
            issues: vec![SchemaIssue::failure(error)],
        }
    }
}

/// Calls a [`SchemaService`] with a bounded wait and interprets the answer.
pub struct SchemaGateway<S> {
    service: S,
    timeout: Duration,
    schema: OnceCell<String>,
}

impl<S: SchemaService> SchemaGateway<S> {
    /// Create a gateway bounding each service call by `timeout`.
    pub fn new(service: S, timeout: Duration) -> Self {
        Self {
            service,
            timeout,
            schema: OnceCell::new(),
        }
    }

    /// The underlying service.
    pub fn service(&self) -> &S {
        &self.service
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, GatewayError>>,
    ) -> Result<T, GatewayError> {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| GatewayError::Timeout(self.timeout))?
    }

    async fn schema(&self) -> Result<&str, GatewayError> {
        self.schema
            .get_or_try_init(|| self.bounded(self.service.fetch_schema()))
            .await
            .map(String::as_str)
    }

    /// Validate XML text against the AAS schema.
    ///
    /// AAS 1.0 documents are accepted in compatibility mode without a
    /// service call. AAS 3.0 documents are validated with their namespace
    /// rewritten to 3.1; this is a compatibility heuristic, not a migration.
    pub async fn validate_xml(&self, xml: &str) -> SchemaReport {
        let (mode, text) = match detect_dialect(xml) {
            Some(dialect) if !dialect.is_schema_checkable() => {
                tracing::warn!(%dialect, "Document accepted in compatibility mode");
                return SchemaReport::clean(ValidationMode::Compatibility);
            }
            Some(Dialect::V3_0) => (ValidationMode::UpgradedNamespace, upgrade_namespace(xml)),
            _ => (ValidationMode::Full, xml.to_string()),
        };

        let xsd = match self.schema().await {
            Ok(xsd) => xsd,
            Err(e) => return SchemaReport::failed(mode, &e),
        };

        let verdict = match self.bounded(self.service.validate(&text, xsd)).await {
            Ok(verdict) => verdict,
            Err(e) => return SchemaReport::failed(mode, &e),
        };

        let report = interpret(mode, &text, verdict);
        tracing::debug!(
            valid = report.valid,
            issues = report.issues.len(),
            ?mode,
            "Schema validation finished"
        );
        report
    }

    /// Validate `env` structurally and against the schema, and record the
    /// combined verdict in `gate`.
    ///
    /// # Errors
    ///
    /// Returns error if the environment cannot be encoded.
    pub async fn verify(
        &self,
        env: &Environment,
        gate: &mut ExportGate,
    ) -> Result<Verified, CodecError> {
        let structural = validate(&env.shell, &env.submodels);
        let concepts = collect_concept_descriptions(&env.submodels);
        let xml = encode_xml(env, &concepts)?;
        let schema = self.validate_xml(&xml).await;

        gate.record(env, structural.issues.len() + schema.issues.len());
        tracing::info!(
            structural = structural.issues.len(),
            schema = schema.issues.len(),
            "Validated environment"
        );

        Ok(Verified {
            structural,
            schema,
            xml,
            concepts,
        })
    }
}

fn interpret(mode: ValidationMode, xml: &str, verdict: ServiceVerdict) -> SchemaReport {
    if verdict.valid && verdict.errors.is_empty() {
        return SchemaReport::clean(mode);
    }

    let mut issues: Vec<SchemaIssue> = dedup_by_message(verdict.errors, |e| e.message.as_str())
        .into_iter()
        .map(|e| {
            let line = e.line.or_else(|| line_in_message(&e.message));
            SchemaIssue {
                hint: hint_for(&e.message).map(str::to_string),
                path: line.map(|l| path_for_line(xml, l)).unwrap_or_default(),
                line,
                message: e.message,
            }
        })
        .collect();

    if issues.is_empty() {
        issues.push(SchemaIssue {
            message: "the validator rejected the document without details".to_string(),
            line: None,
            hint: None,
            path: Vec::new(),
        });
    }

    SchemaReport {
        valid: false,
        mode,
        issues,
    }
}

/// Result of the combined structural and schema validation.
#[derive(Debug, Clone)]
pub struct Verified {
    /// Structural validation result
    pub structural: ValidationReport,
    /// Schema validation result
    pub schema: SchemaReport,
    /// The XML that was validated
    pub xml: String,
    /// Concept descriptions embedded in the XML
    pub concepts: Vec<ConceptDescription>,
}

impl Verified {
    /// True when neither validation reported a problem.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.structural.valid && self.schema.valid
    }
}

/// Why an export did not produce a package.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// The gate refused the export
    #[error("export blocked: {0}")]
    Blocked(#[from] ExportBlocked),
    /// Packaging failed
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Package `env` as AASX if `gate` holds a clean verdict for exactly this
/// content.
///
/// # Errors
///
/// Returns [`ExportError::Blocked`] when the environment was never
/// validated, changed since validation, or failed it.
pub fn export_aasx(
    env: &Environment,
    attachments: &BTreeMap<String, Vec<u8>>,
    gate: &ExportGate,
) -> Result<Vec<u8>, ExportError> {
    gate.check(env)?;
    let concepts = collect_concept_descriptions(&env.submodels);
    let bytes = write_aasx(env, &concepts, attachments)?;
    tracing::info!(shell = %env.shell.id, bytes = bytes.len(), "Exported AASX package");
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::RawError;

    #[test]
    fn clean_verdict_has_no_issues() {
        let report = interpret(ValidationMode::Full, "", ServiceVerdict::accepted());
        assert!(report.valid);
        assert!(report.issues.is_empty());
    }

    #[test]
    fn rejection_without_details_is_still_invalid() {
        let report = interpret(ValidationMode::Full, "", ServiceVerdict::rejected(vec![]));
        assert!(!report.valid);
        assert_eq!(report.issues.len(), 1);
    }

    #[test]
    fn duplicate_messages_collapse_and_keep_their_line() {
        let xml = "<environment>\n<submodel>\n<idShort>Nameplate</idShort>\n<value/>\n</submodel>\n</environment>";
        let report = interpret(
            ValidationMode::Full,
            xml,
            ServiceVerdict::rejected(vec![
                RawError::new("Element 'value': [facet 'minLength'] too short").at_line(4),
                RawError::new("Element  'value':  [facet 'minLength'] too short"),
            ]),
        );
        assert_eq!(report.issues.len(), 1);
        let issue = &report.issues[0];
        assert_eq!(issue.line, Some(4));
        assert_eq!(issue.path, vec!["Nameplate"]);
        assert!(issue.hint.is_some());
    }
}
