//! Exactly-once Post-processing
//!
//! Depth-first walk over the declaration graph below a registry's roots. Every
//! reachable node gets its post-processing hook invoked at most once for the
//! whole session: the traversal-local visited set stops cycles, and the
//! node's `processed` flag stops nodes already finalized by an earlier walk
//! from another registry.

use std::collections::{BTreeMap, HashSet};
use tracing::trace;

use crate::error::Result;
use crate::node::{DeclarationArena, NodeId};
use crate::registry::SchemaRegistry;

/// Read-only view handed to a hook while it runs
pub struct WalkContext<'a> {
    pub arena: &'a DeclarationArena,
    /// Document root the current node was reached from; its `xmlns` attributes
    /// are the prefix bindings in scope
    pub root: NodeId,
    /// Registry whose roots are being walked
    pub registry: &'a SchemaRegistry,
    /// Every registry of the session, keyed by target namespace
    pub registries: &'a BTreeMap<String, SchemaRegistry>,
}

/// Per-node resolution step run by the walker
pub trait PostProcess {
    fn post_process(&mut self, id: NodeId, ctx: &WalkContext<'_>) -> Result<()>;
}

impl<F> PostProcess for F
where
    F: FnMut(NodeId, &WalkContext<'_>) -> Result<()>,
{
    fn post_process(&mut self, id: NodeId, ctx: &WalkContext<'_>) -> Result<()> {
        self(id, ctx)
    }
}

/// Counters for a single walk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    /// Hook invocations
    pub processed: usize,
    /// Edges that reached an already visited or processed node
    pub skipped: usize,
}

/// Walk everything reachable from `registry`'s roots, invoking `hook` once per node.
///
/// Children are visited in their original order, pre-order. A hook error aborts
/// the walk immediately; nodes processed before the failure keep their flag.
pub fn post_process<H>(
    arena: &mut DeclarationArena,
    registry: &SchemaRegistry,
    registries: &BTreeMap<String, SchemaRegistry>,
    hook: &mut H,
) -> Result<WalkStats>
where
    H: PostProcess + ?Sized,
{
    let mut visited: HashSet<NodeId> = registry.roots().iter().copied().collect();
    let mut stats = WalkStats::default();

    for &root in registry.roots() {
        let mut stack: Vec<NodeId> = arena.children(root)?.iter().rev().copied().collect();

        while let Some(id) = stack.pop() {
            if visited.contains(&id) || arena.get(id)?.processed {
                trace!(%id, "already handled");
                stats.skipped += 1;
                continue;
            }

            let ctx = WalkContext {
                arena: &*arena,
                root,
                registry,
                registries,
            };
            hook.post_process(id, &ctx)?;

            arena.get_mut(id)?.processed = true;
            visited.insert(id);
            stats.processed += 1;
            trace!(%id, "post-processed");

            stack.extend(arena.children(id)?.iter().rev().copied());
        }
    }

    Ok(stats)
}
