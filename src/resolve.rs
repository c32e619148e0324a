//! Type Reference Resolution
//!
//! The default post-processing hook. Resolves qualified-name references
//! (`type`, `base`, `ref`, `itemType`, `memberTypes`, `substitutionGroup`)
//! to their definitions in the session's registries.
//!
//! Prefixes are looked up in the `xmlns` bindings of the document root the
//! node was reached from, so every fragment resolves with its own bindings
//! even after merging. Unprefixed names use the default namespace binding when
//! one exists, otherwise the node's own namespace.

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::builtins::BuiltinTypes;
use crate::error::{Result, SchemaError};
use crate::graph::{PostProcess, WalkContext};
use crate::node::{DeclarationKind, DeclarationNode, NodeId};
use crate::registry::Bucket;

/// Namespace of the `xml:` prefix, bound in every document
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Where a reference ended up
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Resolution {
    Declared {
        namespace: String,
        bucket: Bucket,
        node: NodeId,
    },
    Builtin {
        namespace: String,
        name: String,
    },
}

impl Resolution {
    pub fn node(&self) -> Option<NodeId> {
        match self {
            Self::Declared { node, .. } => Some(*node),
            Self::Builtin { .. } => None,
        }
    }
}

/// A reference attribute that could not be resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedReference {
    pub node: NodeId,
    pub attribute: String,
    pub name: String,
    pub reason: String,
}

/// Post-processing hook resolving QName references
#[derive(Debug, Clone)]
pub struct TypeResolver {
    builtins: BuiltinTypes,
    /// Fail the walk on the first unresolved reference
    strict: bool,
    resolved: BTreeMap<(NodeId, String), Vec<Resolution>>,
    unresolved: Vec<UnresolvedReference>,
}

impl Default for TypeResolver {
    fn default() -> Self {
        Self::new(BuiltinTypes::xsd(), true)
    }
}

impl TypeResolver {
    pub fn new(builtins: BuiltinTypes, strict: bool) -> Self {
        Self {
            builtins,
            strict,
            resolved: BTreeMap::new(),
            unresolved: Vec::new(),
        }
    }

    /// Resolutions recorded for one attribute of a node (`memberTypes` may hold several)
    pub fn resolution(&self, node: NodeId, attribute: &str) -> Option<&[Resolution]> {
        self.resolved
            .get(&(node, attribute.to_string()))
            .map(Vec::as_slice)
    }

    pub fn resolutions(&self) -> impl Iterator<Item = (NodeId, &str, &Resolution)> {
        self.resolved
            .iter()
            .flat_map(|((node, attr), list)| list.iter().map(move |r| (*node, attr.as_str(), r)))
    }

    /// References skipped in non-strict mode
    pub fn unresolved(&self) -> &[UnresolvedReference] {
        &self.unresolved
    }

    fn resolve_attribute(
        &mut self,
        id: NodeId,
        node: &DeclarationNode,
        attribute: &str,
        buckets: &[Bucket],
        ctx: &WalkContext<'_>,
    ) -> Result<()> {
        let Some(value) = node.attr(attribute) else {
            return Ok(());
        };

        for qname in value.split_whitespace() {
            match self.resolve_qname(id, node, attribute, qname, buckets, ctx) {
                Ok(resolution) => {
                    debug!(%id, attribute, qname, ?resolution, "resolved");
                    self.resolved
                        .entry((id, attribute.to_string()))
                        .or_default()
                        .push(resolution);
                }
                Err(err) if !self.strict => {
                    warn!(%id, attribute, qname, error = %err, "unresolved reference");
                    self.unresolved.push(UnresolvedReference {
                        node: id,
                        attribute: attribute.to_string(),
                        name: qname.to_string(),
                        reason: err.to_string(),
                    });
                }
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    fn resolve_qname(
        &self,
        id: NodeId,
        node: &DeclarationNode,
        attribute: &str,
        qname: &str,
        buckets: &[Bucket],
        ctx: &WalkContext<'_>,
    ) -> Result<Resolution> {
        let document = ctx.arena.get(ctx.root)?;

        let (namespace, local) = match qname.split_once(':') {
            Some(("xml", local)) => (XML_NAMESPACE, local),
            Some((prefix, local)) => {
                let namespace = document
                    .namespace_binding(prefix)
                    .ok_or_else(|| SchemaError::UnknownPrefix {
                        node: id,
                        prefix: prefix.to_string(),
                    })?;
                (namespace, local)
            }
            None => (
                document.namespace_binding("").unwrap_or(&node.namespace),
                qname,
            ),
        };

        if self.builtins.contains(namespace, local) {
            return Ok(Resolution::Builtin {
                namespace: namespace.to_string(),
                name: local.to_string(),
            });
        }

        ctx.registries
            .get(namespace)
            .and_then(|registry| {
                buckets.iter().find_map(|&bucket| {
                    registry.lookup(bucket, local).map(|target| Resolution::Declared {
                        namespace: namespace.to_string(),
                        bucket,
                        node: target,
                    })
                })
            })
            .ok_or_else(|| SchemaError::UnresolvedReference {
                node: id,
                attribute: attribute.to_string(),
                name: qname.to_string(),
            })
    }
}

/// Bucket searched by a `ref` attribute on a node of this kind
fn ref_bucket(kind: &DeclarationKind) -> Option<Bucket> {
    match kind {
        DeclarationKind::Element => Some(Bucket::Elements),
        DeclarationKind::Attribute => Some(Bucket::Attributes),
        DeclarationKind::Group => Some(Bucket::Groups),
        DeclarationKind::AttributeGroup => Some(Bucket::AttributeGroups),
        _ => None,
    }
}

const TYPE_BUCKETS: &[Bucket] = &[Bucket::ComplexTypes, Bucket::SimpleTypes];
const SIMPLE_BUCKETS: &[Bucket] = &[Bucket::SimpleTypes];
const ELEMENT_BUCKETS: &[Bucket] = &[Bucket::Elements];

impl PostProcess for TypeResolver {
    fn post_process(&mut self, id: NodeId, ctx: &WalkContext<'_>) -> Result<()> {
        let node = ctx.arena.get(id)?;

        self.resolve_attribute(id, node, "type", TYPE_BUCKETS, ctx)?;
        self.resolve_attribute(id, node, "base", TYPE_BUCKETS, ctx)?;
        self.resolve_attribute(id, node, "itemType", SIMPLE_BUCKETS, ctx)?;
        self.resolve_attribute(id, node, "memberTypes", SIMPLE_BUCKETS, ctx)?;
        self.resolve_attribute(id, node, "substitutionGroup", ELEMENT_BUCKETS, ctx)?;
        if let Some(bucket) = ref_bucket(&node.kind) {
            self.resolve_attribute(id, node, "ref", &[bucket], ctx)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::XSD_NAMESPACE;
    use crate::graph::post_process;
    use crate::node::DeclarationArena;
    use crate::registry::SchemaRegistry;

    fn document(arena: &mut DeclarationArena) -> NodeId {
        arena.alloc(
            DeclarationNode::new(DeclarationKind::Schema, "urn:a")
                .with_attr("targetNamespace", "urn:a")
                .with_attr("xmlns:tns", "urn:a")
                .with_attr("xmlns:xs", XSD_NAMESPACE),
        )
    }

    fn registries_for(arena: &DeclarationArena, root: NodeId, declare: &[(Bucket, &str, NodeId)]) -> BTreeMap<String, SchemaRegistry> {
        let mut registry = SchemaRegistry::for_document(arena, root).unwrap();
        for (bucket, name, node) in declare {
            registry.insert(*bucket, *name, *node);
        }
        let mut map = BTreeMap::new();
        map.insert("urn:a".to_string(), registry);
        map
    }

    #[test]
    fn test_resolves_declared_and_builtin_types() {
        let mut arena = DeclarationArena::new();
        let root = document(&mut arena);
        let person = arena
            .alloc_child(root, DeclarationNode::new(DeclarationKind::ComplexType, "urn:a").named("Person"))
            .unwrap();
        let element = arena
            .alloc_child(
                root,
                DeclarationNode::new(DeclarationKind::Element, "urn:a")
                    .named("person")
                    .with_attr("type", "tns:Person"),
            )
            .unwrap();
        let name = arena
            .alloc_child(
                person,
                DeclarationNode::new(DeclarationKind::Element, "urn:a")
                    .named("name")
                    .with_attr("type", "xs:string"),
            )
            .unwrap();

        let registries = registries_for(&arena, root, &[(Bucket::ComplexTypes, "Person", person)]);
        let mut resolver = TypeResolver::default();
        post_process(&mut arena, &registries["urn:a"], &registries, &mut resolver).unwrap();

        assert_eq!(
            resolver.resolution(element, "type"),
            Some(
                &[Resolution::Declared {
                    namespace: "urn:a".into(),
                    bucket: Bucket::ComplexTypes,
                    node: person,
                }][..]
            )
        );
        assert_eq!(
            resolver.resolution(name, "type"),
            Some(
                &[Resolution::Builtin {
                    namespace: XSD_NAMESPACE.into(),
                    name: "string".into(),
                }][..]
            )
        );
    }

    #[test]
    fn test_ref_uses_kind_specific_bucket() {
        let mut arena = DeclarationArena::new();
        let root = document(&mut arena);
        let group = arena
            .alloc_child(root, DeclarationNode::new(DeclarationKind::Group, "urn:a").named("Common"))
            .unwrap();
        let group_ref = arena
            .alloc_child(root, DeclarationNode::new(DeclarationKind::Group, "urn:a").with_attr("ref", "tns:Common"))
            .unwrap();

        let registries = registries_for(&arena, root, &[(Bucket::Groups, "Common", group)]);
        let mut resolver = TypeResolver::default();
        post_process(&mut arena, &registries["urn:a"], &registries, &mut resolver).unwrap();

        let resolved = resolver.resolution(group_ref, "ref").unwrap();
        assert_eq!(resolved[0].node(), Some(group));
    }

    #[test]
    fn test_strict_mode_propagates_unresolved() {
        let mut arena = DeclarationArena::new();
        let root = document(&mut arena);
        let dangling = arena
            .alloc_child(
                root,
                DeclarationNode::new(DeclarationKind::Element, "urn:a").with_attr("type", "tns:Missing"),
            )
            .unwrap();

        let registries = registries_for(&arena, root, &[]);
        let mut resolver = TypeResolver::default();
        let err = post_process(&mut arena, &registries["urn:a"], &registries, &mut resolver).unwrap_err();

        match err {
            SchemaError::UnresolvedReference { node, attribute, name } => {
                assert_eq!(node, dangling);
                assert_eq!(attribute, "type");
                assert_eq!(name, "tns:Missing");
            }
            other => panic!("Expected UnresolvedReference, got {:?}", other),
        }
    }

    #[test]
    fn test_lenient_mode_records_and_continues() {
        let mut arena = DeclarationArena::new();
        let root = document(&mut arena);
        arena
            .alloc_child(
                root,
                DeclarationNode::new(DeclarationKind::Element, "urn:a").with_attr("type", "bogus:Thing"),
            )
            .unwrap();
        let later = arena
            .alloc_child(
                root,
                DeclarationNode::new(DeclarationKind::Attribute, "urn:a").with_attr("type", "xs:int"),
            )
            .unwrap();

        let registries = registries_for(&arena, root, &[]);
        let mut resolver = TypeResolver::new(BuiltinTypes::xsd(), false);
        post_process(&mut arena, &registries["urn:a"], &registries, &mut resolver).unwrap();

        assert_eq!(resolver.unresolved().len(), 1);
        assert!(resolver.unresolved()[0].reason.contains("bogus"));
        assert!(resolver.resolution(later, "type").is_some());
    }

    #[test]
    fn test_member_types_list() {
        let mut arena = DeclarationArena::new();
        let root = document(&mut arena);
        let code = arena
            .alloc_child(root, DeclarationNode::new(DeclarationKind::SimpleType, "urn:a").named("Code"))
            .unwrap();
        let union = arena
            .alloc_child(
                code,
                DeclarationNode::new(DeclarationKind::from_tag("union"), "urn:a")
                    .with_attr("memberTypes", "xs:int  tns:Code"),
            )
            .unwrap();

        let registries = registries_for(&arena, root, &[(Bucket::SimpleTypes, "Code", code)]);
        let mut resolver = TypeResolver::default();
        post_process(&mut arena, &registries["urn:a"], &registries, &mut resolver).unwrap();

        let members = resolver.resolution(union, "memberTypes").unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(members[1].node(), Some(code));
    }
}
