//! Field-level validation errors shared by the form validators.

use thiserror::Error;

/// A single invalid form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Form field name as the UI knows it (`scheduledTime`, `email`, ...).
    pub field: &'static str,
    /// Message shown inline under the field.
    pub message: String,
}

impl FieldError {
    /// Creates a field error.
    #[must_use]
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// One or more invalid fields.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", summarize(.0))]
pub struct ValidationError(pub Vec<FieldError>);

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationError {
    /// A single-field error.
    #[must_use]
    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        Self(vec![FieldError::new(field, message)])
    }

    /// Whether `field` is among the invalid fields.
    #[must_use]
    pub fn has_field(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }

    /// Message for `field`, if it is invalid.
    #[must_use]
    pub fn message_for(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }
}

/// Collects field errors and turns them into a result.
#[derive(Debug, Default)]
pub(crate) struct Collector(Vec<FieldError>);

impl Collector {
    pub(crate) fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError::new(field, message));
    }

    pub(crate) fn finish(self) -> Result<(), ValidationError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(ValidationError(self.0))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_fields() {
        let err = ValidationError(vec![
            FieldError::new("email", "Invalid email"),
            FieldError::new("password", "Too short"),
        ]);
        assert_eq!(err.to_string(), "email: Invalid email; password: Too short");
    }

    #[test]
    fn lookup_by_field() {
        let err = ValidationError::single("notes", "Too long");
        assert!(err.has_field("notes"));
        assert_eq!(err.message_for("notes"), Some("Too long"));
        assert_eq!(err.message_for("email"), None);
    }

    #[test]
    fn empty_collector_is_ok() {
        assert!(Collector::default().finish().is_ok());
    }
}
