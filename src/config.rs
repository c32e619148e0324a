//! Configuration management for the registry builder
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (xsd-registry.toml)
//! - Environment variables (XSD_REGISTRY__*)
//!
//! ## Example config file (xsd-registry.toml):
//! ```toml
//! [builtins]
//! include_xsd = true
//!
//! [builtins.extra]
//! "http://schemas.xmlsoap.org/soap/encoding/" = ["Array", "Struct"]
//!
//! [merge]
//! dedup_external_references = true
//!
//! [resolve]
//! strict = false
//!
//! [loader]
//! extension = "json"
//! skip_prefixes = ["drafts/"]
//!
//! [output]
//! format = "pretty"
//! ```

use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::builtins::BuiltinTypes;
use crate::error::Result;
use crate::registry::MergeOptions;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub builtins: BuiltinsConfig,

    #[serde(default)]
    pub merge: MergeConfig,

    #[serde(default)]
    pub resolve: ResolveConfig,

    #[serde(default)]
    pub loader: LoaderConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// Built-in type suppression
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinsConfig {
    /// Seed the table with the XSD datatypes
    #[serde(default = "default_true")]
    pub include_xsd: bool,

    /// Additional built-in names per namespace
    #[serde(default)]
    pub extra: BTreeMap<String, Vec<String>>,
}

/// Fragment merging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Skip include/import entries the target already lists
    #[serde(default = "default_true")]
    pub dedup_external_references: bool,
}

/// Reference resolution during post-processing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveConfig {
    /// Abort on the first unresolved reference
    #[serde(default = "default_true")]
    pub strict: bool,
}

/// Fragment loading
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// File extension of fragment documents
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Skip files whose relative path starts with one of these
    #[serde(default = "default_skip_prefixes")]
    pub skip_prefixes: Vec<String>,
}

/// Output settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

/// Output format for JSON
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

fn default_true() -> bool {
    true
}

fn default_extension() -> String {
    "json".to_string()
}

fn default_skip_prefixes() -> Vec<String> {
    vec![
        "target/".to_string(),
        ".git/".to_string(),
    ]
}

impl Default for BuiltinsConfig {
    fn default() -> Self {
        Self {
            include_xsd: true,
            extra: BTreeMap::new(),
        }
    }
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            dedup_external_references: true,
        }
    }
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self { strict: true }
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            extension: default_extension(),
            skip_prefixes: default_skip_prefixes(),
        }
    }
}

impl RegistryConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration, layering an explicit file over the defaults
    pub fn load_from(config_path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_locations = [
            "xsd-registry.toml",
            ".xsd-registry.toml",
            "config/xsd-registry.toml",
        ];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(dirs) = directories::ProjectDirs::from("dev", "familiar", "xsd-registry") {
            let xdg_config = dirs.config_dir().join("xsd-registry.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("XSD_REGISTRY")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Built-in table described by the `[builtins]` section
    pub fn builtin_types(&self) -> BuiltinTypes {
        let mut table = if self.builtins.include_xsd {
            BuiltinTypes::xsd()
        } else {
            BuiltinTypes::empty()
        };
        for (namespace, names) in &self.builtins.extra {
            table.extend(namespace, names.iter().cloned());
        }
        table
    }

    pub fn merge_options(&self) -> MergeOptions {
        MergeOptions {
            dedup_external_references: self.merge.dedup_external_references,
        }
    }
}
