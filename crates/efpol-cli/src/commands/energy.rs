use crate::cli::EnergyArgs;
use crate::config::PartialJobConfig;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use crate::utils::report::{format_energy, format_gradient};
use efpol::engine::progress::ProgressReporter;
use efpol::workflows;
use tracing::info;

pub fn run(args: EnergyArgs) -> Result<()> {
    info!("Merging job file and CLI arguments...");
    let job = PartialJobConfig::from_file(&args.job.config)?.merge_with_cli(&args.job)?;
    let mut system = job.system;

    info!(
        fragments = system.len(),
        polarizable_points = system.n_polarizable_points(),
        "Job loaded."
    );

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Computing polarization energy...");
    let result = workflows::energy::run(
        &mut system,
        &job.polarization,
        &reporter,
        !args.no_gradient,
    )?;

    println!("\n    SCF converged in {} iterations\n", result.scf_iterations);
    print!("{}", format_energy(&result.energy));
    if let Some(gradient) = &result.gradient {
        println!();
        print!("{}", format_gradient(&system, gradient));
    }

    Ok(())
}
