//! Diagnostics
//!
//! Non-fatal notes collected while building a session. None of these stop the
//! pipeline; they exist so callers can see what was overwritten or dropped.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::node::NodeId;

// =============================================================================
// Diagnostic Codes
// =============================================================================

/// Diagnostic code for categorizing notes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticCode {
    /// A later declaration replaced an earlier one with the same name
    Redefinition,
    /// include/import without schemaLocation or location
    MissingLocation,
    /// Reference left unresolved by a lenient resolver
    UnresolvedReference,
    /// External reference to a namespace no loaded fragment provides
    UnfetchedReference,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Redefinition => "I001",
            Self::MissingLocation => "W001",
            Self::UnresolvedReference => "W002",
            Self::UnfetchedReference => "I002",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::Redefinition | Self::UnfetchedReference => Severity::Info,
            Self::MissingLocation | Self::UnresolvedReference => Severity::Warning,
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

// =============================================================================
// Diagnostic Item
// =============================================================================

/// A single diagnostic item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticItem {
    /// Target namespace the note belongs to
    pub namespace: String,
    pub code: DiagnosticCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<NodeId>,
}

impl DiagnosticItem {
    pub fn new(namespace: impl Into<String>, code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            code,
            message: message.into(),
            node: None,
        }
    }

    pub fn at(mut self, node: NodeId) -> Self {
        self.node = Some(node);
        self
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }
}

impl fmt::Display for DiagnosticItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {} ({})",
            self.code,
            self.code.severity(),
            self.message,
            self.namespace
        )?;
        if let Some(node) = self.node {
            write!(f, " at {}", node)?;
        }
        Ok(())
    }
}

// =============================================================================
// Diagnostics Collection
// =============================================================================

/// Collection of diagnostics from a build
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    items: Vec<DiagnosticItem>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: DiagnosticItem) {
        self.items.push(item);
    }

    pub fn redefinition(&mut self, namespace: &str, bucket: impl fmt::Display, name: &str, node: NodeId) {
        self.push(
            DiagnosticItem::new(
                namespace,
                DiagnosticCode::Redefinition,
                format!("{} '{}' redefined, later declaration wins", bucket, name),
            )
            .at(node),
        );
    }

    pub fn missing_location(&mut self, namespace: &str, node: NodeId) {
        self.push(
            DiagnosticItem::new(
                namespace,
                DiagnosticCode::MissingLocation,
                "include/import without a location was dropped",
            )
            .at(node),
        );
    }

    pub fn unresolved_reference(&mut self, namespace: &str, node: NodeId, attribute: &str, name: &str) {
        self.push(
            DiagnosticItem::new(
                namespace,
                DiagnosticCode::UnresolvedReference,
                format!("{}=\"{}\" could not be resolved", attribute, name),
            )
            .at(node),
        );
    }

    pub fn unfetched_reference(&mut self, namespace: &str, target: &str, location: &str) {
        self.push(DiagnosticItem::new(
            namespace,
            DiagnosticCode::UnfetchedReference,
            format!("'{}' ({}) is not loaded", location, target),
        ));
    }

    pub fn with_code(&self, code: DiagnosticCode) -> impl Iterator<Item = &DiagnosticItem> {
        self.items.iter().filter(move |i| i.code == code)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &DiagnosticItem> {
        self.items.iter().filter(|i| i.severity() == Severity::Warning)
    }

    pub fn all(&self) -> &[DiagnosticItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for item in &self.items {
            writeln!(f, "{}", item)?;
        }
        if !self.is_empty() {
            writeln!(f, "\n{} note(s), {} warning(s)", self.len(), self.warning_count())?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a DiagnosticItem;
    type IntoIter = std::slice::Iter<'a, DiagnosticItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_severity() {
        assert_eq!(DiagnosticCode::Redefinition.severity(), Severity::Info);
        assert_eq!(DiagnosticCode::MissingLocation.severity(), Severity::Warning);
    }

    #[test]
    fn test_diagnostics_collection() {
        let mut diags = Diagnostics::new();
        diags.unfetched_reference("urn:a", "urn:b", "b.xsd");
        diags.unresolved_reference("urn:a", NodeId::from_index(3), "type", "tns:Gone");

        assert_eq!(diags.len(), 2);
        assert_eq!(diags.warning_count(), 1);
        assert_eq!(diags.with_code(DiagnosticCode::UnfetchedReference).count(), 1);
        assert!(diags.to_string().contains("tns:Gone"));
    }
}
