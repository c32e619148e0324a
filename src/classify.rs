//! Declaration Classification
//!
//! Routes the direct children of a schema document into the typed buckets of a
//! [`SchemaRegistry`], or records include/import directives as external
//! references. Classification never recurses and never fails: unknown kinds
//! are skipped so schema extensions pass through untouched.

use tracing::{debug, trace, warn};

use crate::builtins::BuiltinTypes;
use crate::error::Result;
use crate::node::{DeclarationArena, DeclarationKind, NodeId};
use crate::registry::{Bucket, ExternalReference, SchemaRegistry};

/// Outcome of classifying a single node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Inserted into a bucket; `replaced` holds the entry it overwrote
    Declared {
        bucket: Bucket,
        name: String,
        replaced: Option<NodeId>,
    },
    /// Include/import recorded as an external reference
    ExternalReference(ExternalReference),
    /// Include/import without any location attribute
    MissingLocation,
    /// Implicitly known primitive, never materialized
    Builtin,
    /// No bucket for this kind (annotation, nested schema, unknown tags, unnamed declarations)
    Ignored,
}

/// Routes declaration nodes into registry buckets
#[derive(Debug, Clone)]
pub struct Classifier {
    builtins: BuiltinTypes,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(BuiltinTypes::xsd())
    }
}

impl Classifier {
    pub fn new(builtins: BuiltinTypes) -> Self {
        Self { builtins }
    }

    pub fn builtins(&self) -> &BuiltinTypes {
        &self.builtins
    }

    /// Classify one node into `registry`
    pub fn classify(
        &self,
        registry: &mut SchemaRegistry,
        arena: &DeclarationArena,
        id: NodeId,
    ) -> Result<Classification> {
        let node = arena.get(id)?;

        if let Some(name) = node.name.as_deref() {
            if node.namespace == registry.target_namespace() && self.builtins.contains(&node.namespace, name) {
                trace!(%id, name, "built-in type suppressed");
                return Ok(Classification::Builtin);
            }
        }

        let classification = match &node.kind {
            DeclarationKind::Include | DeclarationKind::Import => {
                let location = node.attr("schemaLocation").or_else(|| node.attr("location"));
                match location {
                    Some(location) => {
                        let namespace = node
                            .attr("namespace")
                            .or_else(|| node.attr("targetNamespace"))
                            .unwrap_or(registry.target_namespace());
                        let reference = ExternalReference {
                            namespace: namespace.to_string(),
                            location: location.to_string(),
                        };
                        registry.push_external_reference(reference.clone());
                        Classification::ExternalReference(reference)
                    }
                    None => {
                        warn!(%id, kind = %node.kind, "directive without location dropped");
                        Classification::MissingLocation
                    }
                }
            }
            DeclarationKind::ComplexType
            | DeclarationKind::SimpleType
            | DeclarationKind::Element
            | DeclarationKind::Group
            | DeclarationKind::Attribute
            | DeclarationKind::AttributeGroup => {
                let (Some(bucket), Some(name)) = (Bucket::for_kind(&node.kind), node.name.as_deref())
                else {
                    return Ok(Classification::Ignored);
                };
                let replaced = registry.insert(bucket, name, id);
                Classification::Declared {
                    bucket,
                    name: name.to_string(),
                    replaced,
                }
            }
            DeclarationKind::Schema | DeclarationKind::Annotation | DeclarationKind::Other(_) => {
                Classification::Ignored
            }
        };

        debug!(%id, kind = %node.kind, ?classification, "classified");
        Ok(classification)
    }

    /// Classify every direct child of `root`, in document order
    pub fn classify_children(
        &self,
        registry: &mut SchemaRegistry,
        arena: &DeclarationArena,
        root: NodeId,
    ) -> Result<Vec<(NodeId, Classification)>> {
        let mut outcomes = Vec::new();
        for &child in arena.children(root)? {
            outcomes.push((child, self.classify(registry, arena, child)?));
        }
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::XSD_NAMESPACE;
    use crate::node::DeclarationNode;

    fn setup() -> (DeclarationArena, SchemaRegistry, Classifier) {
        (
            DeclarationArena::new(),
            SchemaRegistry::new("urn:a"),
            Classifier::default(),
        )
    }

    #[test]
    fn test_declarations_land_in_matching_bucket() {
        let (mut arena, mut registry, classifier) = setup();
        let cases = [
            (DeclarationKind::ComplexType, Bucket::ComplexTypes),
            (DeclarationKind::SimpleType, Bucket::SimpleTypes),
            (DeclarationKind::Element, Bucket::Elements),
            (DeclarationKind::Group, Bucket::Groups),
            (DeclarationKind::Attribute, Bucket::Attributes),
            (DeclarationKind::AttributeGroup, Bucket::AttributeGroups),
        ];

        for (kind, bucket) in cases {
            let id = arena.alloc(DeclarationNode::new(kind, "urn:a").named("Thing"));
            classifier.classify(&mut registry, &arena, id).unwrap();
            assert_eq!(registry.lookup(bucket, "Thing"), Some(id));
        }
        assert_eq!(registry.declaration_count(), 6);
    }

    #[test]
    fn test_classification_is_idempotent() {
        let (mut arena, mut registry, classifier) = setup();
        let id = arena.alloc(DeclarationNode::new(DeclarationKind::Element, "urn:a").named("Order"));

        classifier.classify(&mut registry, &arena, id).unwrap();
        let once = registry.summary();
        let second = classifier.classify(&mut registry, &arena, id).unwrap();

        assert_eq!(registry.summary(), once);
        assert_eq!(
            second,
            Classification::Declared {
                bucket: Bucket::Elements,
                name: "Order".into(),
                replaced: Some(id),
            }
        );
    }

    #[test]
    fn test_last_write_wins_within_document() {
        let (mut arena, mut registry, classifier) = setup();
        let first = arena.alloc(DeclarationNode::new(DeclarationKind::ComplexType, "urn:a").named("Foo"));
        let second = arena.alloc(DeclarationNode::new(DeclarationKind::ComplexType, "urn:a").named("Foo"));

        classifier.classify(&mut registry, &arena, first).unwrap();
        classifier.classify(&mut registry, &arena, second).unwrap();

        assert_eq!(registry.lookup(Bucket::ComplexTypes, "Foo"), Some(second));
    }

    #[test]
    fn test_builtin_suppressed() {
        let (mut arena, _, classifier) = setup();
        let mut registry = SchemaRegistry::new(XSD_NAMESPACE);
        let id = arena.alloc(DeclarationNode::new(DeclarationKind::SimpleType, XSD_NAMESPACE).named("string"));

        let outcome = classifier.classify(&mut registry, &arena, id).unwrap();

        assert_eq!(outcome, Classification::Builtin);
        assert!(registry.simple_types().is_empty());
    }

    #[test]
    fn test_builtin_in_foreign_registry_is_kept() {
        let (mut arena, mut registry, classifier) = setup();
        let id = arena.alloc(DeclarationNode::new(DeclarationKind::SimpleType, XSD_NAMESPACE).named("string"));

        classifier.classify(&mut registry, &arena, id).unwrap();
        assert_eq!(registry.lookup(Bucket::SimpleTypes, "string"), Some(id));
    }

    #[test]
    fn test_builtin_name_outside_xsd_namespace_is_kept() {
        let (mut arena, mut registry, classifier) = setup();
        let id = arena.alloc(DeclarationNode::new(DeclarationKind::SimpleType, "urn:a").named("string"));

        classifier.classify(&mut registry, &arena, id).unwrap();
        assert_eq!(registry.lookup(Bucket::SimpleTypes, "string"), Some(id));
    }

    #[test]
    fn test_import_namespace_precedence() {
        let (mut arena, mut registry, classifier) = setup();
        let explicit = arena.alloc(
            DeclarationNode::new(DeclarationKind::Import, "urn:a")
                .with_attr("namespace", "urn:ns")
                .with_attr("targetNamespace", "urn:tns")
                .with_attr("schemaLocation", "one.xsd"),
        );
        let target_only = arena.alloc(
            DeclarationNode::new(DeclarationKind::Import, "urn:a")
                .with_attr("targetNamespace", "urn:tns")
                .with_attr("location", "two.xsd"),
        );
        let inherited = arena.alloc(
            DeclarationNode::new(DeclarationKind::Include, "urn:a").with_attr("schemaLocation", "three.xsd"),
        );

        for id in [explicit, target_only, inherited] {
            classifier.classify(&mut registry, &arena, id).unwrap();
        }

        let refs: Vec<_> = registry
            .external_references()
            .iter()
            .map(|r| (r.namespace.as_str(), r.location.as_str()))
            .collect();
        assert_eq!(
            refs,
            vec![("urn:ns", "one.xsd"), ("urn:tns", "two.xsd"), ("urn:a", "three.xsd")]
        );
    }

    #[test]
    fn test_schema_location_preferred_over_location() {
        let (mut arena, mut registry, classifier) = setup();
        let id = arena.alloc(
            DeclarationNode::new(DeclarationKind::Include, "urn:a")
                .with_attr("location", "generic.xsd")
                .with_attr("schemaLocation", "specific.xsd"),
        );
        classifier.classify(&mut registry, &arena, id).unwrap();
        assert_eq!(registry.external_references()[0].location, "specific.xsd");
    }

    #[test]
    fn test_directive_without_location_dropped() {
        let (mut arena, mut registry, classifier) = setup();
        let id = arena.alloc(DeclarationNode::new(DeclarationKind::Import, "urn:a").with_attr("namespace", "urn:b"));

        let outcome = classifier.classify(&mut registry, &arena, id).unwrap();
        assert_eq!(outcome, Classification::MissingLocation);
        assert!(registry.external_references().is_empty());
    }

    #[test]
    fn test_unknown_kinds_ignored() {
        let (mut arena, mut registry, classifier) = setup();
        let annotation = arena.alloc(DeclarationNode::new(DeclarationKind::Annotation, "urn:a").named("doc"));
        let other = arena.alloc(DeclarationNode::new(DeclarationKind::from_tag("notation"), "urn:a").named("gif"));
        let unnamed = arena.alloc(DeclarationNode::new(DeclarationKind::ComplexType, "urn:a"));

        for id in [annotation, other, unnamed] {
            assert_eq!(
                classifier.classify(&mut registry, &arena, id).unwrap(),
                Classification::Ignored
            );
        }
        assert_eq!(registry.declaration_count(), 0);
    }
}
