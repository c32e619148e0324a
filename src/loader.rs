//! Fragment Loading
//!
//! Reads parsed schema documents serialized as JSON fragment trees into a
//! [`DeclarationArena`]. One file holds one document:
//!
//! ```json
//! {
//!   "kind": "schema",
//!   "attributes": { "targetNamespace": "urn:a", "xmlns:tns": "urn:a" },
//!   "children": [
//!     { "kind": "complexType", "name": "Node", "anchor": "node",
//!       "children": [ { "link": "node" } ] }
//!   ]
//! }
//! ```
//!
//! `anchor` names a node within its document; a `{ "link": "..." }` child
//! re-uses that node instead of creating a new one, which is how shared
//! subtrees and back-edges are written down. Nodes inherit the document's
//! target namespace unless they carry their own `namespace`.

use anyhow::Context;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::LoaderConfig;
use crate::error::{Result, SchemaError};
use crate::node::{DeclarationArena, DeclarationKind, DeclarationNode, NodeId};

/// Configuration for fragment loading
#[derive(Debug, Clone)]
pub struct LoadConfig {
    /// File extension of fragment documents
    pub extension: String,
    /// Skip files matching these path prefixes
    pub skip_prefixes: Vec<String>,
    /// Only load files matching these path prefixes
    pub include_prefixes: Vec<String>,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self::from(&LoaderConfig::default())
    }
}

impl From<&LoaderConfig> for LoadConfig {
    fn from(config: &LoaderConfig) -> Self {
        Self {
            extension: config.extension.clone(),
            skip_prefixes: config.skip_prefixes.clone(),
            include_prefixes: Vec::new(),
        }
    }
}

/// A document root and the file it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedDocument {
    pub path: PathBuf,
    pub root: NodeId,
}

/// Documents loaded in one pass, in path order
#[derive(Debug, Clone, Default)]
pub struct LoadedBundle {
    pub documents: Vec<LoadedDocument>,
    /// SHA-256 over the content of every loaded file
    pub bundle_hash: String,
}

impl LoadedBundle {
    pub fn roots(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.documents.iter().map(|d| d.root)
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FragmentEntry {
    Link(FragmentLink),
    Node(FragmentNode),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FragmentLink {
    link: String,
}

#[derive(Debug, Deserialize)]
struct FragmentNode {
    kind: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    namespace: Option<String>,
    #[serde(default)]
    anchor: Option<String>,
    #[serde(default)]
    attributes: BTreeMap<String, String>,
    #[serde(default)]
    children: Vec<FragmentEntry>,
}

enum ChildSlot {
    Node(NodeId),
    Link(String),
}

/// Allocates one document, deferring links until every anchor is known
struct DocumentBuilder<'a> {
    arena: &'a mut DeclarationArena,
    anchors: HashMap<String, NodeId>,
    pending: Vec<(NodeId, Vec<ChildSlot>)>,
}

impl<'a> DocumentBuilder<'a> {
    fn alloc(&mut self, fragment: FragmentNode, namespace: &str) -> Result<NodeId> {
        let name = fragment
            .name
            .or_else(|| fragment.attributes.get("name").cloned());
        let mut node = DeclarationNode::new(
            DeclarationKind::from_tag(&fragment.kind),
            fragment.namespace.unwrap_or_else(|| namespace.to_string()),
        );
        node.name = name;
        node.attributes = fragment.attributes;
        let id = self.arena.alloc(node);

        if let Some(anchor) = fragment.anchor {
            if self.anchors.insert(anchor.clone(), id).is_some() {
                return Err(SchemaError::InvalidFragment(format!(
                    "duplicate anchor '{}'",
                    anchor
                )));
            }
        }

        let mut slots = Vec::with_capacity(fragment.children.len());
        for child in fragment.children {
            match child {
                FragmentEntry::Node(child) => slots.push(ChildSlot::Node(self.alloc(child, namespace)?)),
                FragmentEntry::Link(link) => slots.push(ChildSlot::Link(link.link)),
            }
        }
        self.pending.push((id, slots));
        Ok(id)
    }

    fn link(self) -> Result<()> {
        let Self {
            arena,
            anchors,
            pending,
        } = self;

        for (parent, slots) in pending {
            let children = slots
                .into_iter()
                .map(|slot| match slot {
                    ChildSlot::Node(id) => Ok(id),
                    ChildSlot::Link(anchor) => anchors.get(&anchor).copied().ok_or_else(|| {
                        SchemaError::InvalidFragment(format!("link to unknown anchor '{}'", anchor))
                    }),
                })
                .collect::<Result<Vec<_>>>()?;
            arena.get_mut(parent)?.children = children;
        }
        Ok(())
    }
}

/// Parse one JSON document into `arena`, returning its root
pub fn load_str(arena: &mut DeclarationArena, content: &str) -> Result<NodeId> {
    let fragment: FragmentNode = serde_json::from_str(content)?;
    let namespace = fragment
        .namespace
        .clone()
        .or_else(|| fragment.attributes.get("targetNamespace").cloned())
        .unwrap_or_default();

    let mut builder = DocumentBuilder {
        arena,
        anchors: HashMap::new(),
        pending: Vec::new(),
    };
    let root = builder.alloc(fragment, &namespace)?;
    builder.link()?;

    debug!(%root, namespace = %namespace, "loaded fragment");
    Ok(root)
}

/// Load a single fragment file
pub fn load_file(arena: &mut DeclarationArena, path: &Path) -> anyhow::Result<NodeId> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    load_str(arena, &content).with_context(|| format!("Failed to load fragment {}", path.display()))
}

/// Load every fragment file below `dir`, in path order
pub fn load_from_directory(
    arena: &mut DeclarationArena,
    dir: &Path,
    config: &LoadConfig,
) -> anyhow::Result<LoadedBundle> {
    let mut hasher = Sha256::new();
    let mut documents = Vec::new();

    for entry in WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() || !has_extension(path, &config.extension) {
            continue;
        }

        let relative_path = path.strip_prefix(dir)?;
        let relative_str = relative_path.to_string_lossy();

        if !config.include_prefixes.is_empty()
            && !config.include_prefixes.iter().any(|p| relative_str.starts_with(p))
        {
            continue;
        }
        if config.skip_prefixes.iter().any(|p| relative_str.starts_with(p)) {
            continue;
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        hasher.update(content.as_bytes());

        let root = load_str(arena, &content)
            .with_context(|| format!("Failed to load fragment {}", path.display()))?;
        documents.push(LoadedDocument {
            path: path.to_path_buf(),
            root,
        });
    }

    let bundle_hash = format!("{:x}", hasher.finalize());
    info!(dir = %dir.display(), documents = documents.len(), "loaded fragment directory");

    Ok(LoadedBundle {
        documents,
        bundle_hash,
    })
}

/// Load a mix of files and directories; files are taken regardless of extension
pub fn load_paths(
    arena: &mut DeclarationArena,
    paths: &[PathBuf],
    config: &LoadConfig,
) -> anyhow::Result<LoadedBundle> {
    let mut hasher = Sha256::new();
    let mut documents = Vec::new();

    for path in paths {
        if path.is_dir() {
            let bundle = load_from_directory(arena, path, config)?;
            hasher.update(bundle.bundle_hash.as_bytes());
            documents.extend(bundle.documents);
        } else {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            hasher.update(content.as_bytes());
            let root = load_str(arena, &content)
                .with_context(|| format!("Failed to load fragment {}", path.display()))?;
            documents.push(LoadedDocument {
                path: path.clone(),
                root,
            });
        }
    }

    Ok(LoadedBundle {
        documents,
        bundle_hash: format!("{:x}", hasher.finalize()),
    })
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension().map(|ext| ext == extension).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CYCLIC: &str = r#"{
        "kind": "xs:schema",
        "attributes": { "targetNamespace": "urn:a", "xmlns:tns": "urn:a" },
        "children": [
            { "kind": "complexType", "name": "Node", "anchor": "node",
              "children": [
                { "kind": "sequence", "children": [
                    { "kind": "element", "attributes": { "name": "next", "type": "tns:Node" },
                      "children": [ { "link": "node" } ] }
                ] }
              ] }
        ]
    }"#;

    #[test]
    fn test_load_str_with_back_edge() {
        let mut arena = DeclarationArena::new();
        let root = load_str(&mut arena, CYCLIC).unwrap();

        let schema = arena.get(root).unwrap();
        assert_eq!(schema.kind, DeclarationKind::Schema);
        assert_eq!(schema.namespace, "urn:a");

        let node_type = schema.children[0];
        let seq = arena.children(node_type).unwrap()[0];
        let next = arena.children(seq).unwrap()[0];
        assert_eq!(arena.get(next).unwrap().name.as_deref(), Some("next"));
        assert_eq!(arena.get(next).unwrap().namespace, "urn:a");
        assert_eq!(arena.children(next).unwrap(), &[node_type]);
    }

    #[test]
    fn test_unknown_anchor() {
        let mut arena = DeclarationArena::new();
        let err = load_str(&mut arena, r#"{"kind":"schema","children":[{"link":"missing"}]}"#).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidFragment(msg) if msg.contains("missing")));
    }

    #[test]
    fn test_duplicate_anchor() {
        let mut arena = DeclarationArena::new();
        let content = r#"{"kind":"schema","anchor":"a","children":[{"kind":"element","anchor":"a"}]}"#;
        assert!(matches!(
            load_str(&mut arena, content),
            Err(SchemaError::InvalidFragment(_))
        ));
    }

    #[test]
    fn test_load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("target")).unwrap();
        fs::write(dir.path().join("b.json"), r#"{"kind":"schema","namespace":"urn:b"}"#).unwrap();
        fs::write(dir.path().join("a.json"), r#"{"kind":"schema","namespace":"urn:a"}"#).unwrap();
        fs::write(dir.path().join("notes.txt"), "not a fragment").unwrap();
        fs::write(dir.path().join("target/skip.json"), "{").unwrap();

        let mut arena = DeclarationArena::new();
        let bundle = load_from_directory(&mut arena, dir.path(), &LoadConfig::default()).unwrap();

        assert_eq!(bundle.documents.len(), 2);
        assert_eq!(bundle.bundle_hash.len(), 64);
        let namespaces: Vec<_> = bundle
            .roots()
            .map(|root| arena.get(root).unwrap().namespace.clone())
            .collect();
        assert_eq!(namespaces, vec!["urn:a", "urn:b"]);
    }
}
