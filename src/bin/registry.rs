//! XSD Registry CLI
//!
//! Load fragment documents, aggregate them per target namespace, resolve
//! references, and report the result.

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use xsd_registry::config::OutputFormat;
use xsd_registry::loader::{self, LoadConfig, LoadedBundle};
use xsd_registry::{DeclarationGraph, DiagnosticItem, NodeId, RegistryConfig, RegistrySet, RegistrySummary, TypeResolver};

#[derive(Parser)]
#[command(name = "xsd-registry")]
#[command(about = "Aggregate parsed schema documents into per-namespace registries")]
struct Cli {
    /// Config file to load (optional)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build registries and print a JSON summary
    Build {
        /// Fragment files or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Record unresolved references as diagnostics instead of failing
        #[arg(long)]
        lenient: bool,

        /// Write the summary here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Export the declaration graph in DOT format
    Graph {
        /// Fragment files or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Leave out resolved-reference edges
        #[arg(long)]
        containment_only: bool,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// View and manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show {
        /// Output as JSON instead of TOML
        #[arg(long)]
        json: bool,
    },

    /// Initialize a new config file
    Init {
        /// Output path
        #[arg(short, long, default_value = "xsd-registry.toml")]
        output: String,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BuildSummary<'a> {
    bundle_hash: &'a str,
    documents: usize,
    resolved_references: usize,
    registries: Vec<RegistrySummary>,
    recursive_groups: Vec<Vec<NodeId>>,
    diagnostics: &'a [DiagnosticItem],
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = RegistryConfig::load_from(cli.config.as_deref())?;

    match cli.command {
        Commands::Build {
            paths,
            lenient,
            output,
        } => {
            let strict = config.resolve.strict && !lenient;
            let (set, resolver, bundle) = build(&config, &paths, strict)?;
            let graph = DeclarationGraph::build(&set, Some(&resolver))?;

            let summary = BuildSummary {
                bundle_hash: &bundle.bundle_hash,
                documents: bundle.documents.len(),
                resolved_references: resolver.resolutions().count(),
                registries: set.summaries(),
                recursive_groups: graph.recursive_groups(),
                diagnostics: set.diagnostics().all(),
            };
            let json = match config.output.format {
                OutputFormat::Pretty => serde_json::to_string_pretty(&summary)?,
                OutputFormat::Compact => serde_json::to_string(&summary)?,
            };

            match output {
                Some(path) => {
                    std::fs::write(&path, json)?;
                    info!(path = %path.display(), "wrote summary");
                }
                None => println!("{}", json),
            }
        }

        Commands::Graph {
            paths,
            containment_only,
            output,
        } => {
            let (set, resolver, _) = build(&config, &paths, false)?;
            let resolver = if containment_only { None } else { Some(&resolver) };
            let graph = DeclarationGraph::build(&set, resolver)?;
            info!(
                nodes = graph.node_count(),
                edges = graph.edge_count(),
                "declaration graph built"
            );

            let dot = graph.to_dot(set.arena());
            match output {
                Some(path) => std::fs::write(&path, dot)?,
                None => print!("{}", dot),
            }
        }

        Commands::Config { command } => match command {
            ConfigCommands::Show { json } => {
                if json {
                    println!("{}", serde_json::to_string_pretty(&config)?);
                } else {
                    println!("{}", ::toml::to_string_pretty(&config)?);
                }
            }
            ConfigCommands::Init { output } => {
                RegistryConfig::default().save(&output)?;
                println!("Created config file: {}", output);
            }
        },
    }

    Ok(())
}

/// Load, aggregate, and resolve everything under `paths`
fn build(
    config: &RegistryConfig,
    paths: &[PathBuf],
    strict: bool,
) -> anyhow::Result<(RegistrySet, TypeResolver, LoadedBundle)> {
    let mut set = RegistrySet::with_config(config);
    let bundle = loader::load_paths(set.arena_mut(), paths, &LoadConfig::from(&config.loader))?;

    for document in &bundle.documents {
        set.add_document(document.root)?;
    }
    let resolver = set.resolve_references(strict)?;

    info!(
        documents = bundle.documents.len(),
        namespaces = set.len(),
        diagnostics = set.diagnostics().len(),
        "registries built"
    );
    Ok((set, resolver, bundle))
}
