//! Diagnostics returned by provider operations
//!
//! Every resource and data-source operation either returns its model or a
//! list of diagnostics explaining what went wrong.

use std::fmt;

use serde::Serialize;

use crate::error::ProviderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub summary: String,
    pub detail: String,
    /// Attribute path the diagnostic refers to, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => "Error",
            Severity::Warning => "Warning",
        };
        match &self.attribute {
            Some(attribute) => write!(f, "{}: {} ({})", severity, self.summary, attribute)?,
            None => write!(f, "{}: {}", severity, self.summary)?,
        }
        if !self.detail.is_empty() {
            write!(f, "\n  {}", self.detail)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// A single error diagnostic
    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        let mut diagnostics = Self::new();
        diagnostics.add_error(summary, detail);
        diagnostics
    }

    pub fn append(&mut self, other: Diagnostics) {
        self.0.extend(other.0);
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    pub fn add_error(&mut self, summary: impl Into<String>, detail: impl Into<String>) {
        self.push(Diagnostic {
            severity: Severity::Error,
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
        });
    }

    pub fn add_attribute_error(
        &mut self,
        attribute: impl Into<String>,
        summary: impl Into<String>,
        detail: impl Into<String>,
    ) {
        self.push(Diagnostic {
            severity: Severity::Error,
            summary: summary.into(),
            detail: detail.into(),
            attribute: Some(attribute.into()),
        });
    }

    pub fn add_warning(&mut self, summary: impl Into<String>, detail: impl Into<String>) {
        self.push(Diagnostic {
            severity: Severity::Warning,
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
        });
    }

    pub fn has_errors(&self) -> bool {
        self.0.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }

    /// Ok when there are no errors, the diagnostics otherwise
    pub fn into_result(self) -> Result<(), Diagnostics> {
        if self.has_errors() { Err(self) } else { Ok(()) }
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, diagnostic) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", diagnostic)?;
        }
        Ok(())
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl From<ProviderError> for Diagnostics {
    fn from(e: ProviderError) -> Self {
        Diagnostics::error(summary_for(&e), e.to_string())
    }
}

fn summary_for(e: &ProviderError) -> &'static str {
    match e {
        ProviderError::NotFound { .. } => "Resource not found",
        ProviderError::Sync { .. } => "Error syncing template",
        ProviderError::Delete { .. } => "Error deleting cluster",
        ProviderError::Export { .. } => "Error exporting template",
        ProviderError::Template(_) => "Invalid template",
        ProviderError::Timeout { .. } => "Timed out waiting for cluster",
        ProviderError::Cancelled { .. } => "Operation cancelled",
        ProviderError::InvalidConfig(_) => "Invalid provider configuration",
        ProviderError::Kubeconfig(_) => "Kubeconfig error",
        _ => "Omni API error",
    }
}

/// Convert an error into diagnostics with a caller-chosen summary
pub(crate) trait WithSummary<T> {
    fn summary(self, summary: &str) -> Result<T, Diagnostics>;
}

impl<T, E: fmt::Display> WithSummary<T> for Result<T, E> {
    fn summary(self, summary: &str) -> Result<T, Diagnostics> {
        self.map_err(|e| Diagnostics::error(summary, e.to_string()))
    }
}
