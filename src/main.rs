//! ipa CLI
//!
//! Entry point for the `ipa` command-line tool.

use clap::{Args, Parser, Subcommand};
use ipa_build::config::ConfigOverrides;
use ipa_build::{signal, BuildOptions, BuildOrchestrator, Configuration, TerminalChooser, Xcodebuild};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "ipa")]
#[command(about = "Build and package iOS apps", version)]
struct Cli {
    /// Show subprocess output and debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new .ipa file for your app
    Build(BuildArgs),

    /// Print the resolved configuration and where it came from
    Config(ConfigArgs),
}

#[derive(Args)]
struct BuildArgs {
    /// Workspace (.xcworkspace) to build (automatically detected in current directory)
    #[arg(long, short = 'w')]
    workspace: Option<PathBuf>,

    /// Project (.xcodeproj) to build (automatically detected, ignored if a workspace is set)
    #[arg(long, short = 'p')]
    project: Option<PathBuf>,

    /// Configuration used to build
    #[arg(long, short = 'c')]
    configuration: Option<String>,

    /// Scheme used to build app
    #[arg(long, short = 's')]
    scheme: Option<String>,

    /// Do not clean before building
    #[arg(long)]
    no_clean: bool,

    /// Do not archive after building
    #[arg(long)]
    no_archive: bool,

    /// Destination directory (default: current directory)
    #[arg(long, short = 'd')]
    destination: Option<PathBuf>,

    /// Sign .ipa file with .mobileprovision
    #[arg(long, short = 'm')]
    embed: Option<String>,

    /// Identity to be used along with --embed
    #[arg(long, short = 'i')]
    identity: Option<String>,

    /// Name or path of the base SDK (default: iphoneos)
    #[arg(long)]
    sdk: Option<String>,

    /// Path to build config file (default: config/build.yml or build.yml)
    #[arg(long)]
    config: Option<PathBuf>,
}

impl BuildArgs {
    fn into_options(self) -> BuildOptions {
        BuildOptions {
            workspace: self.workspace,
            project: self.project,
            configuration: self.configuration,
            scheme: self.scheme,
            clean: !self.no_clean,
            archive: !self.no_archive,
            destination: self.destination,
            embed: self.embed,
            identity: self.identity,
            sdk: self.sdk,
            config_path: self.config,
        }
    }
}

#[derive(Args)]
struct ConfigArgs {
    /// Path to build config file (default: config/build.yml or build.yml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the workspace
    #[arg(long, short = 'w')]
    workspace: Option<String>,

    /// Override the scheme
    #[arg(long, short = 's')]
    scheme: Option<String>,

    /// Override the configuration
    #[arg(long, short = 'c')]
    configuration: Option<String>,

    /// Override the SDK
    #[arg(long)]
    sdk: Option<String>,

    /// Override the output directory
    #[arg(long, short = 'd')]
    destination: Option<String>,

    /// Override the signing identity
    #[arg(long, short = 'i')]
    identity: Option<String>,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = signal::install() {
        log::warn!("Could not install interrupt handler: {}", e);
    }

    match cli.command {
        Commands::Build(args) => run_build(args.into_options(), cli.verbose),
        Commands::Config(args) => run_config(args),
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn current_dir() -> PathBuf {
    match std::env::current_dir() {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("Error: cannot read current directory: {}", e);
            process::exit(1);
        }
    }
}

fn run_build(options: BuildOptions, verbose: bool) {
    let toolchain = Xcodebuild::new(verbose);
    let chooser = TerminalChooser;
    let orchestrator = BuildOrchestrator::new(&toolchain, &chooser, current_dir());

    match orchestrator.run(&options) {
        Ok(outcome) => {
            log::info!("Debug symbols archived to {}", outcome.dsym_zip_path.display());
            println!("{} successfully built", outcome.ipa_path.display());
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(e.exit_code());
        }
    }
}

fn run_config(args: ConfigArgs) {
    let overrides = ConfigOverrides {
        workspace: args.workspace,
        scheme: args.scheme,
        configuration: args.configuration,
        sdk: args.sdk,
        output: args.destination,
        identity: args.identity,
    };

    let config = match Configuration::resolve(&overrides, args.config.as_deref(), &current_dir()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(2);
        }
    };

    match config.to_json_pretty() {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            process::exit(1);
        }
    }
}
