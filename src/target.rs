extern crate derive_more;
use anyhow::{anyhow, Error};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// How the C runtime gets linked into the produced binary.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Linkage {
    /// glibc style, dynamically linked against the system libc
    #[default]
    #[display(fmt = "dynamic")]
    Dynamic,
    /// musl style, fully self-contained binary
    #[display(fmt = "static")]
    Static,
}

impl Linkage {
    /// Driver arguments implementing this linkage for `triple`.
    pub fn codegen_args(&self, triple: &str) -> Vec<String> {
        match self {
            Linkage::Dynamic => vec![],
            Linkage::Static => vec![
                "--config".to_string(),
                format!(r#"target.{}.rustflags=["-C", "target-feature=+crt-static"]"#, triple),
            ],
        }
    }
}

impl FromStr for Linkage {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dynamic" => Ok(Linkage::Dynamic),
            "static" => Ok(Linkage::Static),
            _ => Err(anyhow!("unknown linkage {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Display)]
pub enum BuildProfile {
    #[display(fmt = "release")]
    Release,
    #[display(fmt = "debug")]
    Debug,
}

impl BuildProfile {
    pub fn driver_args(&self) -> &'static [&'static str] {
        match self {
            BuildProfile::Release => &["--release"],
            BuildProfile::Debug => &[],
        }
    }
}

impl FromStr for BuildProfile {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "release" => Ok(BuildProfile::Release),
            "debug" | "dev" => Ok(BuildProfile::Debug),
            _ => Err(anyhow!("unknown build profile {}", s)),
        }
    }
}

/// One buildable configuration: which triple, and which linker the compiler
/// driver has to be pointed at for it.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct TargetSpec {
    pub name: String,
    pub platform_triple: String,
    pub linker_binary: String,
    pub linker_env_var: String,
    #[serde(default)]
    pub linkage: Linkage,
}

impl TargetSpec {
    /// Creates a spec whose linker is announced through cargo's per-target
    /// `CARGO_TARGET_<TRIPLE>_LINKER` variable.
    pub fn new(
        name: impl Into<String>,
        triple: impl Into<String>,
        linker: impl Into<String>,
        linkage: Linkage,
    ) -> Self {
        let platform_triple = triple.into();
        Self {
            name: name.into(),
            linker_env_var: cargo_linker_env_var(&platform_triple),
            platform_triple,
            linker_binary: linker.into(),
            linkage,
        }
    }

    pub fn with_linker_env_var(mut self, var: impl Into<String>) -> Self {
        self.linker_env_var = var.into();
        self
    }

    pub fn linux_gnu() -> Self {
        Self::new(
            "linux-gnu",
            "x86_64-unknown-linux-gnu",
            "x86_64-unknown-linux-gnu-gcc",
            Linkage::Dynamic,
        )
    }

    pub fn linux_musl() -> Self {
        Self::new(
            "linux-musl",
            "x86_64-unknown-linux-musl",
            "x86_64-linux-musl-gcc",
            Linkage::Static,
        )
    }
}

impl fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, {} linkage, {}={})",
            self.name, self.platform_triple, self.linkage, self.linker_env_var, self.linker_binary
        )
    }
}

/// `x86_64-unknown-linux-gnu` -> `CARGO_TARGET_X86_64_UNKNOWN_LINUX_GNU_LINKER`
pub fn cargo_linker_env_var(triple: &str) -> String {
    let upper = triple
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect::<String>();
    format!("CARGO_TARGET_{}_LINKER", upper)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_var_from_triple() {
        assert_eq!(
            cargo_linker_env_var("x86_64-unknown-linux-gnu"),
            "CARGO_TARGET_X86_64_UNKNOWN_LINUX_GNU_LINKER"
        );
        assert_eq!(
            cargo_linker_env_var("armv7-unknown-linux-musleabihf"),
            "CARGO_TARGET_ARMV7_UNKNOWN_LINUX_MUSLEABIHF_LINKER"
        );
    }

    #[test]
    fn builtin_targets() {
        let gnu = TargetSpec::linux_gnu();
        assert_eq!(gnu.platform_triple, "x86_64-unknown-linux-gnu");
        assert_eq!(gnu.linker_env_var, "CARGO_TARGET_X86_64_UNKNOWN_LINUX_GNU_LINKER");
        assert_eq!(gnu.linkage, Linkage::Dynamic);

        let musl = TargetSpec::linux_musl();
        assert_eq!(musl.platform_triple, "x86_64-unknown-linux-musl");
        assert_eq!(musl.linkage, Linkage::Static);
        assert_ne!(gnu.linker_env_var, musl.linker_env_var);
    }

    #[test]
    fn codegen_args_follow_linkage() {
        assert!(Linkage::Dynamic.codegen_args("x86_64-unknown-linux-gnu").is_empty());
        assert_eq!(
            Linkage::Static.codegen_args("x86_64-unknown-linux-musl"),
            vec![
                "--config".to_string(),
                r#"target.x86_64-unknown-linux-musl.rustflags=["-C", "target-feature=+crt-static"]"#.to_string()
            ]
        );
    }

    #[test]
    fn test_from_str() -> Result<(), Error> {
        assert_eq!(BuildProfile::from_str("release")?, BuildProfile::Release);
        assert_eq!(BuildProfile::from_str("debug")?, BuildProfile::Debug);
        assert_eq!(BuildProfile::from_str("dev")?, BuildProfile::Debug);
        assert!(BuildProfile::from_str("fast").is_err());
        assert_eq!(Linkage::from_str("static")?, Linkage::Static);
        assert_eq!(Linkage::from_str("dynamic")?, Linkage::Dynamic);
        assert!(Linkage::from_str("both").is_err());
        Ok(())
    }

    #[test]
    fn test_fmt() {
        assert_eq!(format!("{}", BuildProfile::Release), "release");
        assert_eq!(format!("{}", Linkage::Static), "static");
        assert_eq!(
            TargetSpec::linux_gnu().with_linker_env_var("LINKER_GNU").to_string(),
            "linux-gnu (x86_64-unknown-linux-gnu, dynamic linkage, LINKER_GNU=x86_64-unknown-linux-gnu-gcc)"
        );
    }
}
