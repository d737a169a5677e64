use crate::{
    error::{Error, Result},
    target::{BuildProfile, TargetSpec},
};
use derive_more::Display;
use std::{
    env::{self, JoinPathsError},
    ffi::OsString,
    fmt, io,
    path::{Path, PathBuf},
    process::{Command, ExitStatus},
};

/// One build attempt. Consumed by [`Driver::execute`].
#[derive(Debug)]
pub struct InvocationRequest<'a> {
    pub target: &'a TargetSpec,
    pub profile: BuildProfile,
}

impl<'a> InvocationRequest<'a> {
    pub fn new(target: &'a TargetSpec, profile: BuildProfile) -> Self {
        Self { target, profile }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildResult {
    pub success: bool,
    pub exit_code: i32,
}

impl From<ExitStatus> for BuildResult {
    fn from(status: ExitStatus) -> Self {
        let exit_code = match status.code() {
            Some(code) => code,
            None => signal_exit_code(&status),
        };
        Self {
            success: status.success(),
            exit_code,
        }
    }
}

#[cfg(unix)]
fn signal_exit_code(status: &ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status.signal().map(|sig| 128 + sig).unwrap_or(1)
}

#[cfg(not(unix))]
fn signal_exit_code(_status: &ExitStatus) -> i32 {
    1
}

/// A fully prepared child process: the only place a linker override lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    /// Variables added on top of the inherited environment, for this child only.
    pub env: Vec<(String, String)>,
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.env {
            write!(f, "{}={} ", key, quote(value))?;
        }
        f.write_str(&quote(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", quote(arg))?;
        }
        Ok(())
    }
}

fn quote(s: &str) -> String {
    if !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || "_./=:+,@%-".contains(c)) {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', r"'\''"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum InvocationState {
    #[display(fmt = "idle")]
    Idle,
    #[display(fmt = "environment prepared")]
    EnvironmentPrepared,
    #[display(fmt = "child spawned")]
    ChildSpawned,
    #[display(fmt = "child exited (success: {})", _0)]
    ChildExited(bool),
    #[display(fmt = "spawn failed")]
    SpawnFailed,
}

/// Finds linker binaries before anything gets spawned.
pub trait Toolchain: Send + Sync {
    fn locate(&self, binary: &str) -> Option<PathBuf>;
}

/// Looks up binaries either on `PATH` or in an explicit list of directories.
#[derive(Debug, Clone, Default)]
pub enum SearchPath {
    #[default]
    Env,
    Dirs(OsString),
}

impl SearchPath {
    pub fn dirs<I, P>(dirs: I) -> Result<Self, JoinPathsError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        Ok(Self::Dirs(env::join_paths(
            dirs.into_iter().map(|p| p.as_ref().to_path_buf()),
        )?))
    }
}

impl Toolchain for SearchPath {
    fn locate(&self, binary: &str) -> Option<PathBuf> {
        let found = match self {
            SearchPath::Env => which::which(binary),
            SearchPath::Dirs(dirs) => which::which_in(binary, Some(dirs), "."),
        };
        match found {
            Ok(path) => Some(path),
            Err(e) => {
                log::debug!("looking up {}: {}", binary, e);
                None
            }
        }
    }
}

/// Starts a prepared invocation and waits for it to finish.
pub trait Runner: Send + Sync {
    fn run(&self, invocation: &Invocation) -> io::Result<BuildResult>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl Runner for ProcessRunner {
    fn run(&self, invocation: &Invocation) -> io::Result<BuildResult> {
        let status = Command::new(&invocation.program)
            .args(&invocation.args)
            .envs(invocation.env.iter().map(|(k, v)| (k, v)))
            .status()?;
        Ok(status.into())
    }
}

/// Turns build requests into compiler driver invocations.
#[derive(Debug, Clone)]
pub struct Driver<R = ProcessRunner, T = SearchPath> {
    program: String,
    extra_args: Vec<String>,
    runner: R,
    toolchain: T,
}

impl Driver {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            extra_args: vec![],
            runner: ProcessRunner,
            toolchain: SearchPath::Env,
        }
    }
}

impl<R: Runner, T: Toolchain> Driver<R, T> {
    pub fn with_runner<R2: Runner>(self, runner: R2) -> Driver<R2, T> {
        Driver {
            program: self.program,
            extra_args: self.extra_args,
            runner,
            toolchain: self.toolchain,
        }
    }

    pub fn with_toolchain<T2: Toolchain>(self, toolchain: T2) -> Driver<R, T2> {
        Driver {
            program: self.program,
            extra_args: self.extra_args,
            runner: self.runner,
            toolchain,
        }
    }

    /// Arguments appended after the generated ones, e.g. `--manifest-path`.
    pub fn with_extra_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.extra_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Checks the toolchain and prepares the child process without starting it.
    pub fn plan(&self, request: &InvocationRequest<'_>) -> Result<Invocation> {
        let target = request.target;
        let linker = self
            .toolchain
            .locate(&target.linker_binary)
            .ok_or_else(|| Error::ToolchainNotFound {
                target: target.name.clone(),
                binary: target.linker_binary.clone(),
            })?;
        log::debug!("{}: using linker {}", target.name, linker.display());

        let mut args = vec!["build".to_string(), "--target".to_string(), target.platform_triple.clone()];
        args.extend(request.profile.driver_args().iter().map(|s| s.to_string()));
        args.extend(target.linkage.codegen_args(&target.platform_triple));
        args.extend(self.extra_args.iter().cloned());

        Ok(Invocation {
            program: self.program.clone(),
            args,
            env: vec![(target.linker_env_var.clone(), target.linker_binary.clone())],
        })
    }

    pub fn build(&self, target: &TargetSpec, profile: BuildProfile) -> Result<BuildResult> {
        self.execute(InvocationRequest::new(target, profile))
    }

    pub fn execute(&self, request: InvocationRequest<'_>) -> Result<BuildResult> {
        let name = &request.target.name;
        log::debug!("{}: {}", name, InvocationState::Idle);
        let invocation = self.plan(&request)?;
        log::debug!("{}: {}", name, InvocationState::EnvironmentPrepared);

        log::info!("{}: running {}", name, invocation);
        log::debug!("{}: {}", name, InvocationState::ChildSpawned);
        match self.runner.run(&invocation) {
            Ok(result) => {
                log::debug!("{}: {}", name, InvocationState::ChildExited(result.success));
                if !result.success {
                    log::warn!("{}: {} exited with code {}", name, self.program, result.exit_code);
                }
                Ok(result)
            }
            Err(source) => {
                log::debug!("{}: {}", name, InvocationState::SpawnFailed);
                Err(Error::ProcessSpawn {
                    program: self.program.clone(),
                    source,
                })
            }
        }
    }
}
