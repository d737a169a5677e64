//! Builds one project for several target triples, pointing the compiler driver
//! at the right cross linker for each of them.
//!
//! The linker is handed to the driver through a per-target environment
//! variable that is set on the child process only; the calling process'
//! environment is never touched.

pub mod batch;
pub mod config;
pub mod driver;
pub mod error;
pub mod registry;
pub mod target;

pub use driver::{BuildResult, Driver, Invocation, InvocationRequest};
pub use error::{Error, Result};
pub use registry::{RegistryBuilder, TargetRegistry};
pub use target::{BuildProfile, Linkage, TargetSpec};
