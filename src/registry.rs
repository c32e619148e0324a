//! Schema Registry
//!
//! Per-namespace aggregate of classified declarations. A registry is created
//! empty when its namespace is first seen, filled by the classifier, and
//! absorbs later fragments of the same namespace through [`SchemaRegistry::merge`].

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use tracing::debug;

use crate::error::Result;
use crate::node::{DeclarationArena, DeclarationKind, NodeId};

/// The six typed buckets of a registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Bucket {
    ComplexTypes,
    SimpleTypes,
    Elements,
    Groups,
    Attributes,
    AttributeGroups,
}

impl Bucket {
    pub const ALL: [Bucket; 6] = [
        Bucket::ComplexTypes,
        Bucket::SimpleTypes,
        Bucket::Elements,
        Bucket::Groups,
        Bucket::Attributes,
        Bucket::AttributeGroups,
    ];

    /// Bucket a declaration kind belongs in, if any
    pub fn for_kind(kind: &DeclarationKind) -> Option<Self> {
        match kind {
            DeclarationKind::ComplexType => Some(Self::ComplexTypes),
            DeclarationKind::SimpleType => Some(Self::SimpleTypes),
            DeclarationKind::Element => Some(Self::Elements),
            DeclarationKind::Group => Some(Self::Groups),
            DeclarationKind::Attribute => Some(Self::Attributes),
            DeclarationKind::AttributeGroup => Some(Self::AttributeGroups),
            DeclarationKind::Schema
            | DeclarationKind::Include
            | DeclarationKind::Import
            | DeclarationKind::Annotation
            | DeclarationKind::Other(_) => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ComplexTypes => "complexTypes",
            Self::SimpleTypes => "simpleTypes",
            Self::Elements => "elements",
            Self::Groups => "groups",
            Self::Attributes => "attributes",
            Self::AttributeGroups => "attributeGroups",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An include/import target that still has to be fetched
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExternalReference {
    pub namespace: String,
    pub location: String,
}

/// Options controlling [`SchemaRegistry::merge_with`]
#[derive(Debug, Clone)]
pub struct MergeOptions {
    /// Drop source references whose (namespace, location) the target already has
    pub dedup_external_references: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            dedup_external_references: true,
        }
    }
}

/// What a merge changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// False when the namespaces differed and nothing happened
    pub merged: bool,
    /// Keys present in both registries, replaced by the source's entry
    pub redefined: Vec<(Bucket, String)>,
    pub added: usize,
    pub external_references_added: usize,
}

/// Declarations of one target namespace
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    target_namespace: String,
    /// Document roots that contributed to this registry, first one is primary
    roots: Vec<NodeId>,
    /// Prefix table of the first document (`""` is the default namespace)
    prefixes: BTreeMap<String, String>,
    complex_types: BTreeMap<String, NodeId>,
    simple_types: BTreeMap<String, NodeId>,
    elements: BTreeMap<String, NodeId>,
    groups: BTreeMap<String, NodeId>,
    attributes: BTreeMap<String, NodeId>,
    attribute_groups: BTreeMap<String, NodeId>,
    external_references: Vec<ExternalReference>,
}

impl SchemaRegistry {
    /// Create an empty registry
    pub fn new(target_namespace: impl Into<String>) -> Self {
        Self {
            target_namespace: target_namespace.into(),
            ..Self::default()
        }
    }

    /// Create an empty registry for a parsed document root.
    ///
    /// The namespace comes from the root's `targetNamespace` attribute, falling
    /// back to the namespace the parser assigned. `xmlns` attributes seed the
    /// prefix table.
    pub fn for_document(arena: &DeclarationArena, root: NodeId) -> Result<Self> {
        let node = arena.get(root)?;
        let target_namespace = node
            .attr("targetNamespace")
            .unwrap_or(&node.namespace)
            .to_string();

        let prefixes = node
            .attributes
            .iter()
            .filter_map(|(key, uri)| {
                if key == "xmlns" {
                    Some((String::new(), uri.clone()))
                } else {
                    key.strip_prefix("xmlns:").map(|p| (p.to_string(), uri.clone()))
                }
            })
            .collect();

        Ok(Self {
            target_namespace,
            roots: vec![root],
            prefixes,
            ..Self::default()
        })
    }

    pub fn target_namespace(&self) -> &str {
        &self.target_namespace
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn prefixes(&self) -> &BTreeMap<String, String> {
        &self.prefixes
    }

    /// Resolve a prefix through the first document's table
    pub fn namespace_for_prefix(&self, prefix: &str) -> Option<&str> {
        self.prefixes.get(prefix).map(String::as_str)
    }

    pub fn bucket(&self, bucket: Bucket) -> &BTreeMap<String, NodeId> {
        match bucket {
            Bucket::ComplexTypes => &self.complex_types,
            Bucket::SimpleTypes => &self.simple_types,
            Bucket::Elements => &self.elements,
            Bucket::Groups => &self.groups,
            Bucket::Attributes => &self.attributes,
            Bucket::AttributeGroups => &self.attribute_groups,
        }
    }

    fn bucket_mut(&mut self, bucket: Bucket) -> &mut BTreeMap<String, NodeId> {
        match bucket {
            Bucket::ComplexTypes => &mut self.complex_types,
            Bucket::SimpleTypes => &mut self.simple_types,
            Bucket::Elements => &mut self.elements,
            Bucket::Groups => &mut self.groups,
            Bucket::Attributes => &mut self.attributes,
            Bucket::AttributeGroups => &mut self.attribute_groups,
        }
    }

    pub fn complex_types(&self) -> &BTreeMap<String, NodeId> {
        &self.complex_types
    }

    pub fn simple_types(&self) -> &BTreeMap<String, NodeId> {
        &self.simple_types
    }

    pub fn elements(&self) -> &BTreeMap<String, NodeId> {
        &self.elements
    }

    pub fn groups(&self) -> &BTreeMap<String, NodeId> {
        &self.groups
    }

    pub fn attributes(&self) -> &BTreeMap<String, NodeId> {
        &self.attributes
    }

    pub fn attribute_groups(&self) -> &BTreeMap<String, NodeId> {
        &self.attribute_groups
    }

    pub fn external_references(&self) -> &[ExternalReference] {
        &self.external_references
    }

    /// Look a name up in one bucket
    pub fn lookup(&self, bucket: Bucket, name: &str) -> Option<NodeId> {
        self.bucket(bucket).get(name).copied()
    }

    /// Insert a declaration, returning the entry it replaced
    pub fn insert(&mut self, bucket: Bucket, name: impl Into<String>, node: NodeId) -> Option<NodeId> {
        self.bucket_mut(bucket).insert(name.into(), node)
    }

    pub fn push_external_reference(&mut self, reference: ExternalReference) {
        self.external_references.push(reference);
    }

    /// Total number of declarations across all buckets
    pub fn declaration_count(&self) -> usize {
        Bucket::ALL.iter().map(|b| self.bucket(*b).len()).sum()
    }

    /// Merge a fragment of the same namespace into this registry.
    ///
    /// Source entries win on key conflicts. A namespace mismatch is a no-op.
    pub fn merge(&mut self, source: SchemaRegistry) -> &mut Self {
        self.merge_with(source, &MergeOptions::default());
        self
    }

    /// [`merge`](Self::merge) with explicit options, reporting what changed
    pub fn merge_with(&mut self, source: SchemaRegistry, options: &MergeOptions) -> MergeReport {
        let mut report = MergeReport::default();
        if self.target_namespace != source.target_namespace {
            debug!(
                target_ns = %self.target_namespace,
                source_ns = %source.target_namespace,
                "namespace mismatch, merge skipped"
            );
            return report;
        }
        report.merged = true;

        let SchemaRegistry {
            roots,
            complex_types,
            simple_types,
            elements,
            groups,
            attributes,
            attribute_groups,
            external_references,
            // Later documents may rebind prefixes; keep the first table
            prefixes: _,
            target_namespace: _,
        } = source;

        for (bucket, entries) in [
            (Bucket::ComplexTypes, complex_types),
            (Bucket::SimpleTypes, simple_types),
            (Bucket::Elements, elements),
            (Bucket::Groups, groups),
            (Bucket::Attributes, attributes),
            (Bucket::AttributeGroups, attribute_groups),
        ] {
            let target = self.bucket_mut(bucket);
            for (name, node) in entries {
                match target.insert(name.clone(), node) {
                    Some(_) => report.redefined.push((bucket, name)),
                    None => report.added += 1,
                }
            }
        }

        let mut seen: HashSet<ExternalReference> = if options.dedup_external_references {
            self.external_references.iter().cloned().collect()
        } else {
            HashSet::new()
        };
        for reference in external_references {
            if options.dedup_external_references && !seen.insert(reference.clone()) {
                continue;
            }
            self.external_references.push(reference);
            report.external_references_added += 1;
        }

        for root in roots {
            if !self.roots.contains(&root) {
                self.roots.push(root);
            }
        }

        debug!(
            target_ns = %self.target_namespace,
            added = report.added,
            redefined = report.redefined.len(),
            "merged registry fragment"
        );
        report
    }

    /// Serializable view of this registry
    pub fn summary(&self) -> RegistrySummary {
        RegistrySummary {
            target_namespace: self.target_namespace.clone(),
            complex_types: self.complex_types.keys().cloned().collect(),
            simple_types: self.simple_types.keys().cloned().collect(),
            elements: self.elements.keys().cloned().collect(),
            groups: self.groups.keys().cloned().collect(),
            attributes: self.attributes.keys().cloned().collect(),
            attribute_groups: self.attribute_groups.keys().cloned().collect(),
            external_references: self.external_references.clone(),
        }
    }
}

/// Names per bucket plus pending external references
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrySummary {
    pub target_namespace: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub complex_types: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub simple_types: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub elements: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attribute_groups: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub external_references: Vec<ExternalReference>,
}
