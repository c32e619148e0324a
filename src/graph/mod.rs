//! Declaration Graph
//!
//! Traversal and analysis over the arena of parsed declarations.
//!
//! ## Modules
//!
//! - `walk`: exactly-once post-processing below a registry's roots
//! - `analysis`: petgraph view for recursion detection and DOT export

pub mod analysis;
pub mod walk;

pub use analysis::{DeclarationGraph, EdgeKind};
pub use walk::{post_process, PostProcess, WalkContext, WalkStats};
