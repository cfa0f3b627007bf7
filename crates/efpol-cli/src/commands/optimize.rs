use crate::cli::OptimizeArgs;
use crate::config::PartialJobConfig;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use crate::utils::report::{format_energy, format_restart};
use efpol::engine::progress::ProgressReporter;
use efpol::workflows::model::PolarizationModel;
use efpol::workflows::optimize;
use tracing::{info, warn};

pub fn run(args: OptimizeArgs) -> Result<()> {
    info!("Merging job file and CLI arguments...");
    let job = PartialJobConfig::from_file(&args.job.config)?
        .with_optimizer_overrides(&args)
        .merge_with_cli(&args.job)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());
    let mut model = PolarizationModel::new(job.system, job.polarization, &reporter);

    println!(
        "Starting geometry optimization of {} fragments...",
        model.system().len()
    );
    let x0 = model.system().coordinates();
    let result = optimize::run(&mut model, &x0, &job.optimization, &reporter)?;

    if result.converged {
        println!("\n    OPTIMIZATION CONVERGED AFTER {} STEPS\n", result.steps);
    } else {
        warn!(steps = result.steps, "Optimizer stopped without converging.");
        println!(
            "\n    OPTIMIZATION DID NOT CONVERGE IN {} STEPS\n",
            result.steps
        );
    }
    print!("{}", format_energy(&result.energy));

    let restart: Vec<_> = model
        .system()
        .fragments()
        .iter()
        .map(|f| (f.name().to_string(), f.coordinates()))
        .collect();
    println!("\n    FINAL COORDINATES\n");
    print!("{}", format_restart(&restart));

    Ok(())
}
