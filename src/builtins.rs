//! Built-in Types
//!
//! Primitive types that are implicitly known in a namespace and must never be
//! materialized in a registry. The XML Schema namespace ships with the XSD
//! datatype vocabulary; extra namespaces can be registered from configuration.

use std::collections::{BTreeMap, BTreeSet};

/// The XML Schema namespace
pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// XSD 1.0 built-in datatypes plus the two ur-types
pub const XSD_BUILTIN_TYPES: &[&str] = &[
    "anyType",
    "anySimpleType",
    "string",
    "boolean",
    "decimal",
    "float",
    "double",
    "duration",
    "dateTime",
    "time",
    "date",
    "gYearMonth",
    "gYear",
    "gMonthDay",
    "gDay",
    "gMonth",
    "hexBinary",
    "base64Binary",
    "anyURI",
    "QName",
    "NOTATION",
    "normalizedString",
    "token",
    "language",
    "NMTOKEN",
    "NMTOKENS",
    "Name",
    "NCName",
    "ID",
    "IDREF",
    "IDREFS",
    "ENTITY",
    "ENTITIES",
    "integer",
    "nonPositiveInteger",
    "negativeInteger",
    "long",
    "int",
    "short",
    "byte",
    "nonNegativeInteger",
    "unsignedLong",
    "unsignedInt",
    "unsignedShort",
    "unsignedByte",
    "positiveInteger",
];

/// Lookup table of built-in type names keyed by namespace
#[derive(Debug, Clone, Default)]
pub struct BuiltinTypes {
    by_namespace: BTreeMap<String, BTreeSet<String>>,
}

impl BuiltinTypes {
    /// An empty table; nothing is suppressed
    pub fn empty() -> Self {
        Self::default()
    }

    /// Table holding the XSD datatypes
    pub fn xsd() -> Self {
        let mut table = Self::empty();
        table.extend(XSD_NAMESPACE, XSD_BUILTIN_TYPES.iter().copied());
        table
    }

    pub fn extend<I, S>(&mut self, namespace: &str, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.by_namespace
            .entry(namespace.to_string())
            .or_default()
            .extend(names.into_iter().map(Into::into));
    }

    pub fn contains(&self, namespace: &str, name: &str) -> bool {
        self.by_namespace
            .get(namespace)
            .map(|names| names.contains(name))
            .unwrap_or(false)
    }

    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.by_namespace.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xsd_table() {
        let table = BuiltinTypes::xsd();
        assert!(table.contains(XSD_NAMESPACE, "string"));
        assert!(table.contains(XSD_NAMESPACE, "anyType"));
        assert!(!table.contains(XSD_NAMESPACE, "Person"));
        assert!(!table.contains("urn:a", "string"));
    }

    #[test]
    fn test_extend_namespace() {
        let mut table = BuiltinTypes::empty();
        table.extend("urn:wsdl", ["arrayType"]);
        assert!(table.contains("urn:wsdl", "arrayType"));
        assert_eq!(table.namespaces().collect::<Vec<_>>(), vec!["urn:wsdl"]);
    }
}
