use std::io;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("unknown target `{0}`")]
    UnknownTarget(String),
    #[error("target `{0}` is registered more than once")]
    DuplicateTarget(String),
    #[error("targets `{existing}` and `{name}` both set {linker_env_var} for {platform_triple}")]
    ConflictingTarget {
        name: String,
        existing: String,
        platform_triple: String,
        linker_env_var: String,
    },
    #[error("linker `{binary}` for target `{target}` not found on the toolchain search path")]
    ToolchainNotFound { target: String, binary: String },
    #[error("failed to start compiler driver `{program}`: {source}")]
    ProcessSpawn {
        program: String,
        #[source]
        source: io::Error,
    },
}
