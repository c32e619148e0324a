//! Declaration Nodes
//!
//! Parsed schema declarations live in a [`DeclarationArena`] and refer to each
//! other by [`NodeId`]. Child edges are plain ids, so one node can hang under
//! several parents and a descendant can point back at an ancestor (circular
//! type definitions, group references, extension chains).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Result, SchemaError};

/// Stable identity of a node in the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(usize);

impl NodeId {
    pub fn from_index(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Kind tag of a declaration, as emitted by the upstream parser
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeclarationKind {
    Schema,
    Include,
    Import,
    ComplexType,
    SimpleType,
    Element,
    Group,
    Attribute,
    AttributeGroup,
    Annotation,
    /// Any tag the vocabulary doesn't know (sequence, restriction, extensions...)
    Other(String),
}

impl DeclarationKind {
    /// Map a local element name (`complexType`, `xs:element` stripped to `element`) to a kind
    pub fn from_tag(tag: &str) -> Self {
        let local = tag.rsplit(':').next().unwrap_or(tag);
        match local {
            "schema" => Self::Schema,
            "include" => Self::Include,
            "import" => Self::Import,
            "complexType" => Self::ComplexType,
            "simpleType" => Self::SimpleType,
            "element" => Self::Element,
            "group" => Self::Group,
            "attribute" => Self::Attribute,
            "attributeGroup" => Self::AttributeGroup,
            "annotation" => Self::Annotation,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_tag(&self) -> &str {
        match self {
            Self::Schema => "schema",
            Self::Include => "include",
            Self::Import => "import",
            Self::ComplexType => "complexType",
            Self::SimpleType => "simpleType",
            Self::Element => "element",
            Self::Group => "group",
            Self::Attribute => "attribute",
            Self::AttributeGroup => "attributeGroup",
            Self::Annotation => "annotation",
            Self::Other(tag) => tag,
        }
    }
}

impl fmt::Display for DeclarationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// A single parsed declaration
#[derive(Debug, Clone)]
pub struct DeclarationNode {
    pub kind: DeclarationKind,
    pub name: Option<String>,
    /// Target namespace of the document this node was parsed from
    pub namespace: String,
    pub attributes: BTreeMap<String, String>,
    pub children: Vec<NodeId>,
    /// Set by the graph walker once the post-processing hook has run
    pub processed: bool,
}

impl DeclarationNode {
    pub fn new(kind: DeclarationKind, namespace: impl Into<String>) -> Self {
        Self {
            kind,
            name: None,
            namespace: namespace.into(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
            processed: false,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Namespace bound to `prefix` by this node's `xmlns` attributes (`""` is the default namespace)
    pub fn namespace_binding(&self, prefix: &str) -> Option<&str> {
        if prefix.is_empty() {
            self.attr("xmlns")
        } else {
            self.attr(&format!("xmlns:{}", prefix))
        }
    }
}

/// Owner of every declaration node in a session
#[derive(Debug, Clone, Default)]
pub struct DeclarationArena {
    nodes: Vec<DeclarationNode>,
}

impl DeclarationArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a detached node and return its id
    pub fn alloc(&mut self, node: DeclarationNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// Add a node and append it to `parent`'s children
    pub fn alloc_child(&mut self, parent: NodeId, node: DeclarationNode) -> Result<NodeId> {
        self.get(parent)?;
        let id = self.alloc(node);
        self.nodes[parent.index()].children.push(id);
        Ok(id)
    }

    /// Append an edge to an existing node. Creating shared subtrees and cycles is allowed.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.get(child)?;
        self.get_mut(parent)?.children.push(child);
        Ok(())
    }

    pub fn get(&self, id: NodeId) -> Result<&DeclarationNode> {
        self.nodes.get(id.index()).ok_or(SchemaError::UnknownNode(id))
    }

    pub fn get_mut(&mut self, id: NodeId) -> Result<&mut DeclarationNode> {
        self.nodes.get_mut(id.index()).ok_or(SchemaError::UnknownNode(id))
    }

    pub fn children(&self, id: NodeId) -> Result<&[NodeId]> {
        Ok(&self.get(id)?.children)
    }

    pub fn is_processed(&self, id: NodeId) -> bool {
        self.nodes.get(id.index()).map(|n| n.processed).unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_tag() {
        assert_eq!(DeclarationKind::from_tag("complexType"), DeclarationKind::ComplexType);
        assert_eq!(DeclarationKind::from_tag("xs:import"), DeclarationKind::Import);
        assert_eq!(
            DeclarationKind::from_tag("sequence"),
            DeclarationKind::Other("sequence".into())
        );
    }

    #[test]
    fn test_shared_child_and_back_edge() {
        let mut arena = DeclarationArena::new();
        let a = arena.alloc(DeclarationNode::new(DeclarationKind::ComplexType, "urn:a").named("A"));
        let b = arena.alloc_child(a, DeclarationNode::new(DeclarationKind::Element, "urn:a")).unwrap();
        arena.add_child(b, a).unwrap();

        assert_eq!(arena.children(a).unwrap(), &[b]);
        assert_eq!(arena.children(b).unwrap(), &[a]);
    }

    #[test]
    fn test_namespace_binding() {
        let node = DeclarationNode::new(DeclarationKind::Schema, "urn:a")
            .with_attr("xmlns", "urn:default")
            .with_attr("xmlns:p", "urn:p");

        assert_eq!(node.namespace_binding(""), Some("urn:default"));
        assert_eq!(node.namespace_binding("p"), Some("urn:p"));
        assert_eq!(node.namespace_binding("q"), None);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_node_id_keeps_full_index() {
        let past_u32 = u32::MAX as usize + 1;
        let id = NodeId::from_index(past_u32);
        assert_eq!(id.index(), past_u32);
        assert_ne!(id, NodeId::from_index(0));
    }

    #[test]
    fn test_unknown_node() {
        let mut arena = DeclarationArena::new();
        let a = arena.alloc(DeclarationNode::new(DeclarationKind::Schema, "urn:a"));
        let bogus = NodeId::from_index(42);
        assert!(matches!(arena.add_child(a, bogus), Err(SchemaError::UnknownNode(id)) if id == bogus));
    }
}
