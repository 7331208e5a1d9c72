//! Export gating.
//!
//! Export is allowed only for the exact content that was last validated
//! cleanly. Staleness is tracked explicitly through the environment
//! fingerprint rather than by resetting flags on every edit.

use crate::model::Environment;

/// Why an export was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExportBlocked {
    /// No validation has been recorded
    #[error("the environment has not been validated")]
    NeverValidated,
    /// The environment changed since the last validation
    #[error("the environment changed since it was last validated")]
    Stale,
    /// The last validation found problems
    #[error("the last validation reported {0} issue(s)")]
    Invalid(usize),
}

#[derive(Debug, Clone, Copy)]
struct Verdict {
    fingerprint: u64,
    issues: usize,
}

/// Remembers the last validation verdict and the content it applied to.
#[derive(Debug, Clone, Default)]
pub struct ExportGate {
    last: Option<Verdict>,
}

impl ExportGate {
    /// Create a gate with no recorded verdict.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of validating `env`.
    ///
    /// `issues` is the combined count of structural and schema issues.
    pub fn record(&mut self, env: &Environment, issues: usize) {
        let fingerprint = env.fingerprint();
        tracing::debug!(fingerprint, issues, "Recorded validation verdict");
        self.last = Some(Verdict { fingerprint, issues });
    }

    /// Forget the recorded verdict.
    pub fn invalidate(&mut self) {
        self.last = None;
    }

    /// Check whether `env` may be exported.
    ///
    /// # Errors
    ///
    /// Returns the reason the export is blocked.
    pub fn check(&self, env: &Environment) -> Result<(), ExportBlocked> {
        let verdict = self.last.ok_or(ExportBlocked::NeverValidated)?;
        if verdict.fingerprint != env.fingerprint() {
            return Err(ExportBlocked::Stale);
        }
        if verdict.issues > 0 {
            return Err(ExportBlocked::Invalid(verdict.issues));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Shell, Submodel, SubmodelElement};
    use crate::types::XsdType;

    fn env(serial: &str) -> Environment {
        let mut sm = Submodel::new("Nameplate", "https://ex/sm/1");
        sm.elements = vec![SubmodelElement::property(
            "SerialNumber",
            Some(XsdType::String),
            serial,
        )];
        Environment::new(Shell::new("Motor1", "https://ex/aas/1"), vec![sm])
    }

    #[test]
    fn export_requires_a_verdict() {
        let gate = ExportGate::new();
        assert_eq!(gate.check(&env("SN-1")), Err(ExportBlocked::NeverValidated));
    }

    #[test]
    fn edits_make_the_verdict_stale() {
        let mut gate = ExportGate::new();
        gate.record(&env("SN-1"), 0);
        assert_eq!(gate.check(&env("SN-1")), Ok(()));
        assert_eq!(gate.check(&env("SN-2")), Err(ExportBlocked::Stale));
    }

    #[test]
    fn invalid_verdict_blocks() {
        let mut gate = ExportGate::new();
        gate.record(&env(""), 1);
        assert_eq!(gate.check(&env("")), Err(ExportBlocked::Invalid(1)));
        gate.invalidate();
        assert_eq!(gate.check(&env("")), Err(ExportBlocked::NeverValidated));
    }
}
