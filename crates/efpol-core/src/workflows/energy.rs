use crate::core::forcefield::term::EnergyTerm;
use crate::core::models::system::FragmentSystem;
use crate::engine::accumulator::GradientAccumulator;
use crate::engine::config::{ConfigError, PolarizationConfig};
use crate::engine::context::{PolarizationContext, validate_system};
use crate::engine::error::EngineError;
use crate::engine::partition::Partition;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::tasks;
use nalgebra::{Matrix3, Vector3};
use tracing::{info, instrument};

#[derive(Debug, Clone, PartialEq)]
pub struct PolarizationGradient {
    /// `gx, gy, gz, tx, ty, tz` per fragment; the last three are torques about the fragment
    /// center.
    pub fragments: Vec<f64>,
    pub point_charges: Vec<Vector3<f64>>,
    pub stress: Matrix3<f64>,
}

impl From<GradientAccumulator> for PolarizationGradient {
    fn from(acc: GradientAccumulator) -> Self {
        Self {
            fragments: acc.fragment_gradient(),
            point_charges: acc.point_charge_grads,
            stress: acc.stress,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolarizationResult {
    pub energy: EnergyTerm,
    pub scf_iterations: usize,
    /// Present only when the gradient was requested.
    pub gradient: Option<PolarizationGradient>,
}

/// Computes the polarization energy, and optionally its gradient, at the current geometry.
#[instrument(skip_all, name = "energy_workflow")]
pub fn run(
    system: &mut FragmentSystem,
    config: &PolarizationConfig,
    reporter: &ProgressReporter,
    do_gradient: bool,
) -> Result<PolarizationResult, EngineError> {
    let partition = Partition::new(system.len(), config.workers);
    let ctx = PolarizationContext::new(config, &partition, None, reporter);
    compute(system, &ctx, do_gradient)
}

pub(crate) fn compute(
    system: &mut FragmentSystem,
    ctx: &PolarizationContext,
    do_gradient: bool,
) -> Result<PolarizationResult, EngineError> {
    validate_system(system, ctx.config)?;
    if ctx.partition.n_fragments() != system.len() {
        return Err(ConfigError::InvalidParameter {
            parameter: "workers",
            reason: format!(
                "partition covers {} fragments but the system has {}",
                ctx.partition.n_fragments(),
                system.len()
            ),
        }
        .into());
    }

    if !ctx.config.terms.polarization {
        return Ok(PolarizationResult {
            energy: EnergyTerm::default(),
            scf_iterations: 0,
            gradient: do_gradient.then(|| {
                GradientAccumulator::new(system.len(), system.point_charges().len()).into()
            }),
        });
    }

    ctx.reporter.report(Progress::PhaseStart {
        name: "Static Field",
    });
    tasks::field::run(system, ctx)?;
    ctx.reporter.report(Progress::PhaseFinish);

    ctx.reporter.report(Progress::PhaseStart {
        name: "Induced Dipoles",
    });
    let induction = tasks::induction::run(system, ctx);
    ctx.reporter.report(Progress::PhaseFinish);
    let induction = induction?;

    let gradient = if do_gradient {
        ctx.reporter.report(Progress::PhaseStart { name: "Gradient" });
        let acc = tasks::gradient::run(system, ctx);
        ctx.reporter.report(Progress::PhaseFinish);
        Some(acc.into())
    } else {
        None
    };

    info!(
        energy = induction.energy.total(),
        iterations = induction.iterations,
        "Polarization energy computed."
    );

    Ok(PolarizationResult {
        energy: induction.energy,
        scf_iterations: induction.iterations,
        gradient,
    })
}
