//! Registry Session
//!
//! A [`RegistrySet`] owns the declaration arena and one [`SchemaRegistry`] per
//! target namespace for the lifetime of a schema-building session. Documents
//! are classified into fresh registries and merged into the existing one for
//! their namespace; once every document is in, the graph walker runs over each
//! registry in namespace order.
//!
//! All mutation goes through `&mut self`, so the classify → merge →
//! post-process pipeline is one exclusive phase. Hand out `&RegistrySet` to
//! readers only after post-processing.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::classify::{Classification, Classifier};
use crate::config::RegistryConfig;
use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::graph::{self, PostProcess, WalkStats};
use crate::node::{DeclarationArena, NodeId};
use crate::registry::{ExternalReference, MergeOptions, RegistrySummary, SchemaRegistry};
use crate::resolve::TypeResolver;

/// All registries of one schema-building session
#[derive(Debug, Default)]
pub struct RegistrySet {
    arena: DeclarationArena,
    registries: BTreeMap<String, SchemaRegistry>,
    classifier: Classifier,
    merge_options: MergeOptions,
    diagnostics: Diagnostics,
}

impl RegistrySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: &RegistryConfig) -> Self {
        Self {
            classifier: Classifier::new(config.builtin_types()),
            merge_options: config.merge_options(),
            ..Self::default()
        }
    }

    pub fn arena(&self) -> &DeclarationArena {
        &self.arena
    }

    /// Arena access for the parser side, before documents are added
    pub fn arena_mut(&mut self) -> &mut DeclarationArena {
        &mut self.arena
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Classify a parsed document's direct children and fold them into the
    /// registry for its target namespace, creating that registry if needed.
    pub fn add_document(&mut self, root: NodeId) -> Result<&SchemaRegistry> {
        let mut fragment = SchemaRegistry::for_document(&self.arena, root)?;
        let namespace = fragment.target_namespace().to_string();

        let outcomes = self
            .classifier
            .classify_children(&mut fragment, &self.arena, root)?;
        for (child, outcome) in outcomes {
            match outcome {
                Classification::Declared {
                    bucket,
                    name,
                    replaced: Some(_),
                } => self.diagnostics.redefinition(&namespace, bucket, &name, child),
                Classification::MissingLocation => self.diagnostics.missing_location(&namespace, child),
                _ => {}
            }
        }

        let registry = match self.registries.entry(namespace) {
            Entry::Vacant(slot) => {
                info!(
                    namespace = %slot.key(),
                    declarations = fragment.declaration_count(),
                    "registered namespace"
                );
                slot.insert(fragment)
            }
            Entry::Occupied(slot) => {
                let existing = slot.into_mut();
                let report = existing.merge_with(fragment, &self.merge_options);
                for (bucket, name) in report.redefined {
                    if let Some(node) = existing.lookup(bucket, &name) {
                        self.diagnostics
                            .redefinition(existing.target_namespace(), bucket, &name, node);
                    }
                }
                existing
            }
        };
        Ok(&*registry)
    }

    pub fn registry(&self, namespace: &str) -> Option<&SchemaRegistry> {
        self.registries.get(namespace)
    }

    pub fn registries(&self) -> impl Iterator<Item = &SchemaRegistry> {
        self.registries.values()
    }

    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.registries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.registries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registries.is_empty()
    }

    /// External references whose namespace has no registry in this session
    pub fn unfetched_references(&self) -> Vec<(&str, &ExternalReference)> {
        self.registries
            .values()
            .flat_map(|registry| {
                registry
                    .external_references()
                    .iter()
                    .map(move |reference| (registry.target_namespace(), reference))
            })
            .filter(|(_, reference)| !self.registries.contains_key(&reference.namespace))
            .collect()
    }

    /// Walk every registry, in namespace order, invoking `hook` once per reachable node.
    ///
    /// Stops at the first registry whose walk fails.
    pub fn post_process_all<H>(&mut self, hook: &mut H) -> Result<WalkStats>
    where
        H: PostProcess + ?Sized,
    {
        let Self {
            arena, registries, ..
        } = self;

        let mut total = WalkStats::default();
        for registry in registries.values() {
            let stats = graph::post_process(arena, registry, registries, hook)?;
            debug!(
                namespace = %registry.target_namespace(),
                processed = stats.processed,
                skipped = stats.skipped,
                "post-processed registry"
            );
            total.processed += stats.processed;
            total.skipped += stats.skipped;
        }
        info!(processed = total.processed, "post-processing complete");
        Ok(total)
    }

    /// Walk a single namespace's registry
    pub fn post_process_namespace<H>(&mut self, namespace: &str, hook: &mut H) -> Result<Option<WalkStats>>
    where
        H: PostProcess + ?Sized,
    {
        let Self {
            arena, registries, ..
        } = self;

        match registries.get(namespace) {
            Some(registry) => graph::post_process(arena, registry, registries, hook).map(Some),
            None => Ok(None),
        }
    }

    /// Run the default [`TypeResolver`] over the whole session.
    ///
    /// In lenient mode unresolved references become diagnostics; unfetched
    /// include/import targets are always noted.
    pub fn resolve_references(&mut self, strict: bool) -> Result<TypeResolver> {
        let unfetched: Vec<(String, String, String)> = self
            .unfetched_references()
            .into_iter()
            .map(|(ns, r)| (ns.to_string(), r.namespace.clone(), r.location.clone()))
            .collect();
        for (namespace, target, location) in unfetched {
            self.diagnostics.unfetched_reference(&namespace, &target, &location);
        }

        let mut resolver = TypeResolver::new(self.classifier.builtins().clone(), strict);
        self.post_process_all(&mut resolver)?;

        for unresolved in resolver.unresolved() {
            let namespace = self
                .arena
                .get(unresolved.node)
                .map(|n| n.namespace.clone())
                .unwrap_or_default();
            self.diagnostics
                .unresolved_reference(&namespace, unresolved.node, &unresolved.attribute, &unresolved.name);
        }
        Ok(resolver)
    }

    /// Serializable summaries of every registry
    pub fn summaries(&self) -> Vec<RegistrySummary> {
        self.registries.values().map(SchemaRegistry::summary).collect()
    }
}
