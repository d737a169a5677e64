use crate::{
    driver::{BuildResult, Driver, Runner, Toolchain},
    error::Result,
    registry::TargetRegistry,
    target::{BuildProfile, TargetSpec},
};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use std::fmt;

pub struct Outcome<'a> {
    pub target: &'a TargetSpec,
    pub result: Result<BuildResult>,
}

impl fmt::Display for Outcome<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.result {
            Ok(BuildResult { success: true, .. }) => write!(f, "[OK]  {}", self.target.name),
            Ok(BuildResult { exit_code, .. }) => {
                write!(f, "[ERR] {}: exited with code {}", self.target.name, exit_code)
            }
            Err(e) => write!(f, "[ERR] {}: {}", self.target.name, e),
        }
    }
}

/// Builds every registered target in parallel. Outcomes are returned in
/// registration order.
pub fn build_all<'a, R: Runner, T: Toolchain>(
    driver: &Driver<R, T>,
    registry: &'a TargetRegistry,
    profile: BuildProfile,
) -> Vec<Outcome<'a>> {
    let targets = registry.iter().collect::<Vec<_>>();
    targets
        .par_iter()
        .map(|&target| {
            log::debug!("building {} ({})", target.name, profile);
            Outcome {
                target,
                result: driver.build(target, profile),
            }
        })
        .collect()
}

/// First failing exit code in registration order; errors before spawning count as 1.
pub fn exit_code(outcomes: &[Outcome<'_>]) -> i32 {
    outcomes
        .iter()
        .find_map(|o| match &o.result {
            Ok(r) if r.success => None,
            Ok(r) => Some(r.exit_code),
            Err(_) => Some(1),
        })
        .unwrap_or(0)
}

pub fn summary(outcomes: &[Outcome<'_>]) -> String {
    outcomes.iter().map(|o| format!("    {}\n", o)).collect()
}
