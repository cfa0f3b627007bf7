use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "efpol - Induced-dipole polarization energies, gradients and geometry optimization for rigid EFP fragments.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel computation.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compute the polarization energy and gradient at the job geometry.
    Energy(EnergyArgs),
    /// Minimize the polarization energy over fragment positions and orientations.
    Optimize(OptimizeArgs),
}

/// Options shared by every command that reads a job file.
#[derive(Args, Debug)]
pub struct JobArgs {
    /// Path to the job file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    /// Override the fragment library named in the job file.
    #[arg(short = 'l', long, value_name = "PATH")]
    pub library: Option<PathBuf>,

    /// Enable the switching cutoff with the given radius in bohr.
    #[arg(long, value_name = "FLOAT")]
    pub cutoff: Option<f64>,

    /// Override the number of worker blocks fragments are split into.
    #[arg(short = 'w', long, value_name = "INT")]
    pub workers: Option<usize>,

    /// Set a specific configuration value, overriding the job file.
    /// Can be used multiple times. Example: -S polarization.scf-tolerance=1e-12
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `energy` subcommand.
#[derive(Args, Debug)]
pub struct EnergyArgs {
    #[command(flatten)]
    pub job: JobArgs,

    /// Skip the gradient and print only the energy.
    #[arg(long)]
    pub no_gradient: bool,
}

/// Arguments for the `optimize` subcommand.
#[derive(Args, Debug)]
pub struct OptimizeArgs {
    #[command(flatten)]
    pub job: JobArgs,

    /// Override the maximum number of optimization steps.
    #[arg(long, value_name = "INT")]
    pub max_steps: Option<usize>,

    /// Override the gradient convergence tolerance.
    #[arg(long, value_name = "FLOAT")]
    pub tolerance: Option<f64>,
}
