use crate::{
    registry::TargetRegistry,
    target::{cargo_linker_env_var, Linkage, TargetSpec},
};
use anyhow::Context;
use serde::Deserialize;
use std::{fs, path::Path, str::FromStr};

/// A TOML file describing build targets:
///
/// ```toml
/// [[target]]
/// name = "linux-gnu"
/// triple = "x86_64-unknown-linux-gnu"
/// linker = "x86_64-unknown-linux-gnu-gcc"
/// # optional, defaults to CARGO_TARGET_<TRIPLE>_LINKER
/// linker-env = "LINKER_GNU"
/// # optional, defaults to "dynamic"
/// linkage = "static"
/// ```
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetsFile {
    #[serde(default, rename = "target")]
    targets: Vec<TargetEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct TargetEntry {
    name: String,
    triple: String,
    linker: String,
    linker_env: Option<String>,
    #[serde(default)]
    linkage: Linkage,
}

impl From<TargetEntry> for TargetSpec {
    fn from(entry: TargetEntry) -> Self {
        let linker_env_var = entry
            .linker_env
            .unwrap_or_else(|| cargo_linker_env_var(&entry.triple));
        TargetSpec {
            name: entry.name,
            platform_triple: entry.triple,
            linker_binary: entry.linker,
            linker_env_var,
            linkage: entry.linkage,
        }
    }
}

impl FromStr for TargetsFile {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(toml::from_str(s)?)
    }
}

impl TargetsFile {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        content
            .parse()
            .with_context(|| format!("parsing target file {}", path.display()))
    }

    pub fn into_registry(self) -> anyhow::Result<TargetRegistry> {
        anyhow::ensure!(!self.targets.is_empty(), "no targets defined");
        Ok(TargetRegistry::from_specs(self.targets.into_iter().map(TargetSpec::from))?)
    }
}

/// Loads the registry from `path`, or falls back to the built-in targets.
pub fn load_registry(path: Option<&Path>) -> anyhow::Result<TargetRegistry> {
    match path {
        Some(path) => {
            log::debug!("loading targets from {}", path.display());
            TargetsFile::load(path)?
                .into_registry()
                .with_context(|| format!("invalid target file {}", path.display()))
        }
        None => Ok(TargetRegistry::builtin()),
    }
}
