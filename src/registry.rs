use crate::{
    error::{Error, Result},
    target::TargetSpec,
};

/// Collects target definitions during start-up. Turned into an immutable
/// [`TargetRegistry`] by [`RegistryBuilder::build`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    targets: Vec<TargetSpec>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, spec: TargetSpec) -> Result<&mut Self> {
        if self.targets.iter().any(|t| t.name == spec.name) {
            return Err(Error::DuplicateTarget(spec.name));
        }
        if let Some(existing) = self
            .targets
            .iter()
            .find(|t| t.platform_triple == spec.platform_triple && t.linker_env_var == spec.linker_env_var)
        {
            return Err(Error::ConflictingTarget {
                existing: existing.name.clone(),
                name: spec.name,
                platform_triple: spec.platform_triple,
                linker_env_var: spec.linker_env_var,
            });
        }
        log::debug!("registered target {}", spec);
        self.targets.push(spec);
        Ok(self)
    }

    pub fn build(self) -> TargetRegistry {
        TargetRegistry { targets: self.targets }
    }
}

/// Read-only set of build targets, in registration order.
#[derive(Debug, Clone)]
pub struct TargetRegistry {
    targets: Vec<TargetSpec>,
}

impl TargetRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// The targets known without a configuration file.
    pub fn builtin() -> Self {
        Self {
            targets: vec![TargetSpec::linux_gnu(), TargetSpec::linux_musl()],
        }
    }

    pub fn from_specs(specs: impl IntoIterator<Item = TargetSpec>) -> Result<Self> {
        let mut builder = Self::builder();
        for spec in specs {
            builder.register(spec)?;
        }
        Ok(builder.build())
    }

    pub fn resolve(&self, name: &str) -> Result<&TargetSpec> {
        self.targets
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| Error::UnknownTarget(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &TargetSpec> {
        self.targets.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.targets.iter().map(|t| t.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}
