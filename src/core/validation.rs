//! Typed argument validation
//!
//! Rules are evaluated in order and every failure is collected, so the
//! caller sees all problems with a request at once.

use crate::domain::{Component, GatewayError, Result, ValidationError, Violation};

/// Collects `(predicate, field, message)` rule results
///
/// # Examples
///
/// ```
/// use fhirgate::core::validation::Validator;
/// use fhirgate::domain::Component;
///
/// let count = Some(0u32);
/// let err = Validator::new()
///     .require("patient", "must not be blank", !"".trim().is_empty())
///     .require("count", "must be positive", count.map_or(true, |c| c > 0))
///     .finish(Component::Coordination)
///     .unwrap_err();
/// assert_eq!(err.violations().len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct Validator {
    violations: Vec<Violation>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a violation for `field` unless `predicate` holds
    pub fn require(mut self, field: &str, message: &str, predicate: bool) -> Self {
        if !predicate {
            self.violations.push(Violation::new(field, message));
        }
        self
    }

    /// Runs a fallible check, recording its error message on failure
    pub fn check<T, E: std::fmt::Display>(
        mut self,
        field: &str,
        result: std::result::Result<T, E>,
    ) -> Self {
        if let Err(e) = result {
            self.violations.push(Violation::new(field, e.to_string()));
        }
        self
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Ok if every rule held, otherwise one validation error carrying all
    /// violations
    pub fn finish(self, component: Component) -> Result<()> {
        if self.violations.is_empty() {
            return Ok(());
        }

        Err(GatewayError::invalid(
            component,
            ValidationError {
                violations: self.violations,
            },
        ))
    }
}
