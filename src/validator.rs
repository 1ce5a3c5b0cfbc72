use serde::Serialize;
use std::fmt;

/// One problem found while decoding or validating a request.
///
/// `location` names the failing field as `<source>.<wire name>` (for example
/// `query.enum`), `kind` is the failing operator (`required`, `oneof`, ...) or
/// `decode` for conversion failures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    pub location: String,
    pub field: String,
    pub kind: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(
        location: impl Into<String>,
        field: impl Into<String>,
        kind: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        ValidationIssue {
            location: location.into(),
            field: field.into(),
            kind: kind.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.location, self.message)
    }
}

/// Join issues into a single human readable line.
pub fn summarize(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
