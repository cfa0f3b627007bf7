use crate::core::forcefield::multipole::dipole_field;
use crate::core::forcefield::term::EnergyTerm;
use crate::core::models::points::PolarizablePoint;
use crate::core::models::system::FragmentSystem;
use crate::engine::context::PolarizationContext;
use crate::engine::error::EngineError;
use crate::engine::progress::Progress;
use crate::engine::window::PairWindow;
use nalgebra::Vector3;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InductionResult {
    pub energy: EnergyTerm,
    pub iterations: usize,
}

/// Solves for the induced and conjugate induced dipoles by Jacobi iteration and returns the
/// polarization energy.
///
/// Expects the static field to be current. Dipoles start from zero on every call; the iteration
/// converged when the mean dipole change falls below the tolerance, and convergence on the last
/// allowed iteration still counts.
#[instrument(skip_all, name = "induction_task")]
pub fn run(
    system: &mut FragmentSystem,
    ctx: &PolarizationContext,
) -> Result<InductionResult, EngineError> {
    for frag in system.fragments_mut() {
        for pt in frag.polarizable_points_mut() {
            pt.induced_dipole = Vector3::zeros();
            pt.induced_dipole_conj = Vector3::zeros();
        }
    }

    if system.n_polarizable_points() == 0 {
        debug!("No polarizable points; skipping SCF.");
        return Ok(InductionResult {
            energy: EnergyTerm::default(),
            iterations: 0,
        });
    }

    let tolerance = ctx.config.scf_tolerance;
    let max_iterations = ctx.config.scf_max_iterations;
    let mut iterations = 0;

    for iter in 1..=max_iterations {
        let conv = scf_iteration(system, ctx);
        ctx.reporter.report(Progress::ScfIteration {
            iteration: iter,
            conv,
        });
        debug!(iteration = iter, conv, "SCF iteration.");

        if conv < tolerance {
            iterations = iter;
            break;
        }
        if iter == max_iterations {
            warn!(
                iterations = max_iterations,
                conv, "Polarization SCF failed to converge."
            );
            return Err(EngineError::NotConverged {
                iterations: max_iterations,
            });
        }
    }

    let energy = polarization_energy(system);
    info!(
        iterations,
        energy = energy.total(),
        "Polarization SCF converged."
    );

    Ok(InductionResult { energy, iterations })
}

/// One Jacobi sweep. All new dipoles are computed from the previous ones before any point is
/// updated. Returns `sum(|dmu| + |dmu~|) / N / 2`.
fn scf_iteration(system: &mut FragmentSystem, ctx: &PolarizationContext) -> f64 {
    let new_dipoles = {
        let system = &*system;
        ctx.partition.gather(|i| {
            system.fragments()[i]
                .polarizable_points()
                .iter()
                .map(|pt| {
                    let (field, field_conj) = induced_dipole_field(system, ctx, i, pt);
                    let static_field = pt.elec_field + pt.elec_field_wf;

                    (
                        pt.tensor * (field + static_field),
                        pt.tensor.transpose() * (field_conj + static_field),
                    )
                })
                .collect()
        })
    };

    let conv: f64 = system
        .fragments()
        .iter()
        .flat_map(|f| f.polarizable_points())
        .zip(&new_dipoles)
        .map(|(pt, (mu, mu_conj))| {
            (mu - pt.induced_dipole).norm() + (mu_conj - pt.induced_dipole_conj).norm()
        })
        .sum();

    let mut new_dipoles = new_dipoles.into_iter();
    for frag in system.fragments_mut() {
        for pt in frag.polarizable_points_mut() {
            if let Some((mu, mu_conj)) = new_dipoles.next() {
                pt.induced_dipole = mu;
                pt.induced_dipole_conj = mu_conj;
            }
        }
    }

    conv / system.n_polarizable_points() as f64 / 2.0
}

/// Field at `pt` from the current induced dipoles (first) and conjugate induced dipoles (second)
/// of all other fragments.
fn induced_dipole_field(
    system: &FragmentSystem,
    ctx: &PolarizationContext,
    frag_idx: usize,
    pt: &PolarizablePoint,
) -> (Vector3<f64>, Vector3<f64>) {
    let damping = ctx.config.damping;
    let mut field = Vector3::zeros();
    let mut field_conj = Vector3::zeros();

    for (j, fr_j) in system.fragments().iter().enumerate() {
        if j == frag_idx || system.skip_pair(frag_idx, j) {
            continue;
        }

        let window = PairWindow::new(system, ctx.config, frag_idx, j);
        if window.is_out_of_range() {
            continue;
        }

        for pt_j in fr_j.polarizable_points() {
            let r = window.displacement(&pt.position, &pt_j.position);
            let scale = window.swf * damping.value(r.norm());

            field += dipole_field(&pt_j.induced_dipole, &r) * scale;
            field_conj += dipole_field(&pt_j.induced_dipole_conj, &r) * scale;
        }
    }

    (field, field_conj)
}

fn polarization_energy(system: &FragmentSystem) -> EnergyTerm {
    system
        .fragments()
        .iter()
        .flat_map(|f| f.polarizable_points())
        .map(|pt| EnergyTerm {
            polarization: -0.5 * pt.induced_dipole.dot(&pt.elec_field),
            ai_polarization: 0.5 * pt.induced_dipole_conj.dot(&pt.elec_field_wf),
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::PolarizationConfig;
    use crate::engine::partition::Partition;
    use crate::engine::progress::ProgressReporter;
    use crate::engine::tasks::field;
    use crate::fixtures;

    #[test]
    fn converged_dipoles_are_a_fixed_point_of_both_channels() {
        let config = PolarizationConfig::default();
        let partition = Partition::new(3, 2);
        let reporter = ProgressReporter::new();
        let ctx = PolarizationContext::new(&config, &partition, None, &reporter);
        let mut system = fixtures::three_fragment_system();

        field::run(&mut system, &ctx).unwrap();
        let result = run(&mut system, &ctx).unwrap();
        assert!(result.iterations > 1);

        for (i, frag) in system.fragments().iter().enumerate() {
            for pt in frag.polarizable_points() {
                let (field, field_conj) = induced_dipole_field(&system, &ctx, i, pt);
                let mu = pt.tensor * (field + pt.elec_field);
                let mu_conj = pt.tensor.transpose() * (field_conj + pt.elec_field);
                assert!((mu - pt.induced_dipole).norm() < 1e-9);
                assert!((mu_conj - pt.induced_dipole_conj).norm() < 1e-9);
            }
        }

        let asymmetric = &system.fragments()[0].polarizable_points()[1];
        assert!((asymmetric.induced_dipole - asymmetric.induced_dipole_conj).norm() > 1e-6);
    }

    #[test]
    fn system_without_polarizable_points_takes_no_iterations() {
        let config = PolarizationConfig::default();
        let partition = Partition::new(0, 1);
        let reporter = ProgressReporter::new();
        let ctx = PolarizationContext::new(&config, &partition, None, &reporter);
        let mut system = FragmentSystem::new();

        let result = run(&mut system, &ctx).unwrap();
        assert_eq!(result.iterations, 0);
        assert_eq!(result.energy, EnergyTerm::default());
    }

    #[test]
    fn scf_progress_is_reported_per_iteration() {
        let config = PolarizationConfig::default();
        let partition = Partition::new(2, 1);
        let seen = std::sync::Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event: Progress| {
            if let Progress::ScfIteration { iteration, conv } = event {
                seen.lock().unwrap().push((iteration, conv));
            }
        }));
        let ctx = PolarizationContext::new(&config, &partition, None, &reporter);
        let mut system = fixtures::two_fragment_system(6.0);

        field::run(&mut system, &ctx).unwrap();
        let result = run(&mut system, &ctx).unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), result.iterations);
        assert!(seen.iter().enumerate().all(|(k, (it, _))| *it == k + 1));
        assert!(seen.last().unwrap().1 < config.scf_tolerance);
    }
}
