use anyhow::Context;
use clap::{ArgAction, Args, CommandFactory, Parser, Subcommand};
use crossbuild::{batch, config, BuildProfile, Driver, InvocationRequest, TargetRegistry};
use itertools::Itertools;
use std::{path::PathBuf, process::exit};

#[derive(Parser, Debug)]
#[command(
    name = "crossbuild",
    version,
    about = "Builds the project for different target platforms, selecting the linker per target"
)]
struct Opts {
    /// TOML file with target definitions. Defaults to the built-in linux-gnu and linux-musl targets
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Compiler driver to invoke
    #[arg(long, global = true, default_value = "cargo")]
    driver: String,
    /// Print the driver invocation instead of running it
    #[arg(long, global = true)]
    dry_run: bool,
    /// Set verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, global = true, action = ArgAction::Count)]
    verbosity: u8,
    #[command(subcommand)]
    cmd: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Release build for x86_64-unknown-linux-gnu (target linux-gnu)
    BuildLinux(DriverArgs),
    /// Release build for x86_64-unknown-linux-musl, statically linked (target linux-musl)
    BuildLinuxMusl(DriverArgs),
    /// Build a single target
    Build {
        /// Logical target name, see `list`
        target: String,
        #[arg(long, default_value = "release")]
        profile: BuildProfile,
        #[command(flatten)]
        driver_args: DriverArgs,
    },
    /// Build all targets in parallel
    BuildAll {
        #[arg(long, default_value = "release")]
        profile: BuildProfile,
        #[command(flatten)]
        driver_args: DriverArgs,
    },
    /// List the known targets
    List {
        /// Format output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
struct DriverArgs {
    /// Additional arguments passed to the compiler driver, after `--`
    #[arg(last = true)]
    args: Vec<String>,
}

fn set_log_level(verbosity: u8) {
    let filter = match verbosity {
        0 => std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string()),
        1 => "info".to_string(),
        2 => "debug".to_string(),
        _ => "trace".to_string(),
    };
    env_logger::Builder::new().parse_filters(&filter).init();
}

fn build_one(
    registry: &TargetRegistry,
    driver: &Driver,
    name: &str,
    profile: BuildProfile,
    dry_run: bool,
) -> anyhow::Result<i32> {
    let target = registry.resolve(name)?;
    let request = InvocationRequest::new(target, profile);
    if dry_run {
        println!("{}", driver.plan(&request)?);
        return Ok(0);
    }
    let result = driver.execute(request)?;
    Ok(result.exit_code)
}

fn run(opts: Opts) -> anyhow::Result<i32> {
    let Some(cmd) = opts.cmd else {
        println!("{}", Opts::command().render_help());
        return Ok(0);
    };
    let registry = config::load_registry(opts.config.as_deref())?;
    let driver = |args: DriverArgs| Driver::new(opts.driver.clone()).with_extra_args(args.args);

    match cmd {
        Command::BuildLinux(args) => {
            build_one(&registry, &driver(args), "linux-gnu", BuildProfile::Release, opts.dry_run)
        }
        Command::BuildLinuxMusl(args) => {
            build_one(&registry, &driver(args), "linux-musl", BuildProfile::Release, opts.dry_run)
        }
        Command::Build {
            target,
            profile,
            driver_args,
        } => build_one(&registry, &driver(driver_args), &target, profile, opts.dry_run),
        Command::BuildAll { profile, driver_args } => {
            let driver = driver(driver_args);
            if opts.dry_run {
                let mut code = 0;
                for target in registry.iter() {
                    match driver.plan(&InvocationRequest::new(target, profile)) {
                        Ok(invocation) => println!("{}", invocation),
                        Err(e) => {
                            eprintln!("[ERR] {}: {}", target.name, e);
                            code = 1;
                        }
                    }
                }
                return Ok(code);
            }
            let outcomes = batch::build_all(&driver, &registry, profile);
            eprintln!("Built {} targets ({}):", outcomes.len(), profile);
            eprint!("{}", batch::summary(&outcomes));
            Ok(batch::exit_code(&outcomes))
        }
        Command::List { json } => {
            if json {
                let targets = registry.iter().collect::<Vec<_>>();
                println!(
                    "{}",
                    serde_json::to_string_pretty(&targets).context("serializing targets")?
                );
            } else {
                let width = registry.names().map(str::len).max().unwrap_or(0);
                let lines = registry.iter().map(|t| {
                    format!(
                        "{:width$}  {}  {}  {}={}",
                        t.name,
                        t.platform_triple,
                        t.linkage,
                        t.linker_env_var,
                        t.linker_binary,
                        width = width
                    )
                });
                println!("{}", lines.format("\n"));
            }
            Ok(0)
        }
    }
}

fn main() {
    let opts = Opts::parse();
    set_log_level(opts.verbosity);
    let code = match run(opts) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    };
    exit(code)
}
