//! XSD Schema Registry
//!
//! Aggregates parsed schema documents into one registry per target namespace
//! and runs an exactly-once post-processing pass over the declaration graph.
//!
//! ## Features
//!
//! - **Classification**: top-level declarations are sorted into complex types,
//!   simple types, elements, groups, attributes, and attribute groups
//! - **Merging**: documents sharing a target namespace fold into one registry,
//!   later declarations winning on name conflicts
//! - **Post-processing**: a cycle-safe walk invokes a hook once per reachable
//!   node, even when subtrees are shared between registries
//! - **Resolution**: the default hook resolves `type`/`base`/`ref` QNames
//!
//! ## Pipeline
//!
//! ```text
//! fragments/*.json ──load──▶ DeclarationArena
//!                                 │
//!                    classify + merge per namespace
//!                                 ▼
//!                  RegistrySet { urn:a → SchemaRegistry, ... }
//!                                 │
//!                       post_process(hook)
//!                                 ▼
//!                   resolved registry + diagnostics
//! ```

pub mod builtins;
pub mod classify;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod graph;
pub mod loader;
pub mod node;
pub mod registry;
pub mod resolve;
pub mod session;

pub use builtins::{BuiltinTypes, XSD_NAMESPACE};
pub use classify::{Classification, Classifier};
pub use config::RegistryConfig;
pub use diagnostics::{DiagnosticCode, DiagnosticItem, Diagnostics, Severity};
pub use error::{Result, SchemaError};
pub use graph::{post_process, DeclarationGraph, PostProcess, WalkContext, WalkStats};
pub use node::{DeclarationArena, DeclarationKind, DeclarationNode, NodeId};
pub use registry::{Bucket, ExternalReference, MergeOptions, MergeReport, RegistrySummary, SchemaRegistry};
pub use resolve::{Resolution, TypeResolver};
pub use session::RegistrySet;
