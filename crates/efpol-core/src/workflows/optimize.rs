use super::lbfgs::{EnergyFunction, Lbfgs};
use crate::core::forcefield::term::EnergyTerm;
use crate::core::models::fragment::COORDS_PER_FRAGMENT;
use crate::engine::config::OptimizationConfig;
use crate::engine::error::OptimizerError;
use crate::engine::progress::{OptimizationSnapshot, Progress, ProgressReporter, SnapshotStage};
use nalgebra::Point3;
use tracing::{debug, info, instrument, warn};

/// An objective the optimization driver can minimize and describe in its reports.
///
/// Every description refers to the most recently evaluated point. The defaults fit objectives
/// without a molecular geometry behind them.
pub trait OptimizationTarget: EnergyFunction {
    /// Energy breakdown for an objective value.
    fn energy_terms(&self, value: f64) -> EnergyTerm {
        EnergyTerm::new(value, 0.0)
    }

    /// `(label, position)` of every atom.
    fn geometry(&self) -> Vec<(String, Point3<f64>)> {
        Vec::new()
    }

    /// `(fragment name, [x, y, z, a, b, c])` for every fragment.
    fn restart(&self) -> Vec<(String, [f64; COORDS_PER_FRAGMENT])> {
        Vec::new()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationResult {
    pub converged: bool,
    pub steps: usize,
    pub energy: EnergyTerm,
    /// Final coordinates, flattened as the objective takes them.
    pub coordinates: Vec<f64>,
}

/// Root-mean-square and largest absolute component of a gradient.
fn gradient_stats(gradient: &[f64]) -> (f64, f64) {
    if gradient.is_empty() {
        return (0.0, 0.0);
    }
    let rms = (gradient.iter().map(|g| g * g).sum::<f64>() / gradient.len() as f64).sqrt();
    let max = gradient.iter().fold(0.0_f64, |m, g| m.max(g.abs()));
    (rms, max)
}

/// Converged when the largest component is below `tolerance` and the RMS below a third of it.
fn is_converged(rms: f64, max: f64, tolerance: f64) -> bool {
    max < tolerance && rms < tolerance / 3.0
}

fn snapshot<F: OptimizationTarget + ?Sized>(
    target: &F,
    stage: SnapshotStage,
    value: f64,
    energy_change: f64,
    gradient: &[f64],
) -> OptimizationSnapshot {
    let (rms_gradient, max_gradient) = gradient_stats(gradient);

    OptimizationSnapshot {
        stage,
        geometry: target.geometry(),
        restart: target.restart(),
        energy: target.energy_terms(value),
        energy_change,
        rms_gradient,
        max_gradient,
    }
}

/// Minimizes `target` from `x0`.
///
/// Convergence is tested after every step, never at the starting point, so `max_steps = 0`
/// evaluates the start once and reports `converged = false`. Snapshots are reported for the
/// start, every `print_step`-th step that did not converge, and the final state. On success the
/// target was last evaluated at the returned coordinates.
#[instrument(skip_all, name = "optimization_workflow")]
pub fn run<F: OptimizationTarget>(
    target: &mut F,
    x0: &[f64],
    config: &OptimizationConfig,
    reporter: &ProgressReporter,
) -> Result<OptimizationResult, OptimizerError> {
    let n = x0.len();

    info!(
        coordinates = n,
        max_steps = config.max_steps,
        tolerance = config.tolerance,
        "Starting geometry optimization."
    );

    let mut optimizer = Lbfgs::new(n, &mut *target, config)?;
    optimizer.init(x0)?;

    reporter.report(Progress::Optimization(Box::new(snapshot(
        &**optimizer.function(),
        SnapshotStage::Initial,
        optimizer.fx(),
        0.0,
        optimizer.gx(),
    ))));

    reporter.report(Progress::TaskStart {
        total_steps: config.max_steps as u64,
    });

    let mut converged = false;
    let mut steps = 0;
    let mut energy_change = 0.0;

    for step in 1..=config.max_steps {
        let e_old = optimizer.fx();
        let stepped = optimizer.step();
        reporter.report(Progress::TaskIncrement);
        if let Err(e) = stepped {
            reporter.report(Progress::TaskFinish);
            warn!(step, "Optimization step failed: {}", e);
            return Err(e);
        }

        steps = step;
        energy_change = optimizer.fx() - e_old;
        let (rms, max) = gradient_stats(optimizer.gx());
        debug!(
            step,
            energy = optimizer.fx(),
            energy_change,
            rms_gradient = rms,
            max_gradient = max,
            "Optimization step."
        );

        if is_converged(rms, max, config.tolerance) {
            converged = true;
            break;
        }

        if step % config.print_step == 0 {
            reporter.report(Progress::Optimization(Box::new(snapshot(
                &**optimizer.function(),
                SnapshotStage::Step(step),
                optimizer.fx(),
                energy_change,
                optimizer.gx(),
            ))));
        }
    }

    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::Optimization(Box::new(snapshot(
        &**optimizer.function(),
        SnapshotStage::Final,
        optimizer.fx(),
        energy_change,
        optimizer.gx(),
    ))));

    let energy = optimizer.function().energy_terms(optimizer.fx());
    let coordinates = optimizer.x().to_vec();

    if converged {
        info!(steps, energy = energy.total(), "Geometry optimization converged.");
    } else {
        warn!(
            steps,
            energy = energy.total(),
            "Geometry optimization stopped before converging."
        );
    }

    Ok(OptimizationResult {
        converged,
        steps,
        energy,
        coordinates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::{
        OptimizationConfigBuilder, PolarizationConfig, PolarizationConfigBuilder,
    };
    use crate::engine::error::EngineError;
    use crate::fixtures;
    use crate::workflows::lbfgs::Evaluation;
    use crate::workflows::model::PolarizationModel;
    use std::sync::Mutex;

    /// `sum_i w_i (x_i - m_i)^2` with distinct curvatures.
    struct Quadratic {
        minimum: Vec<f64>,
    }

    impl EnergyFunction for Quadratic {
        fn evaluate(&mut self, x: &[f64]) -> Result<Evaluation, EngineError> {
            let mut value = 0.0;
            let mut gradient = Vec::with_capacity(x.len());
            for (i, (xi, mi)) in x.iter().zip(&self.minimum).enumerate() {
                let w = 1.0 + i as f64;
                value += w * (xi - mi).powi(2);
                gradient.push(2.0 * w * (xi - mi));
            }
            Ok(Evaluation { value, gradient })
        }
    }

    impl OptimizationTarget for Quadratic {}

    fn recording_reporter(stages: &Mutex<Vec<(SnapshotStage, f64)>>) -> ProgressReporter<'_> {
        ProgressReporter::with_callback(Box::new(move |event: Progress| {
            if let Progress::Optimization(snap) = event {
                stages.lock().unwrap().push((snap.stage, snap.energy.total()));
            }
        }))
    }

    #[test]
    fn gradient_stats_uses_absolute_values() {
        let (rms, max) = gradient_stats(&[3.0, -4.0]);
        assert!((rms - (12.5_f64).sqrt()).abs() < 1e-14);
        assert_eq!(max, 4.0);
    }

    #[test]
    fn convergence_requires_both_criteria() {
        assert!(is_converged(0.1, 0.5, 1.0));
        assert!(!is_converged(0.4, 0.5, 1.0));
        assert!(!is_converged(0.1, 1.0, 1.0));
    }

    #[test]
    fn quadratic_reaches_its_minimum_within_bounded_steps() {
        let minimum = vec![1.0, -2.0, 0.5, 3.0, -0.25, 0.0];
        let mut quadratic = Quadratic {
            minimum: minimum.clone(),
        };
        let config = OptimizationConfigBuilder::new()
            .tolerance(1e-6)
            .max_steps(100)
            .build()
            .unwrap();

        let result = run(&mut quadratic, &[0.0; 6], &config, &ProgressReporter::new()).unwrap();

        assert!(result.converged);
        assert!(result.steps >= 1 && result.steps <= 50, "{} steps", result.steps);
        for (x, m) in result.coordinates.iter().zip(&minimum) {
            assert!((x - m).abs() < 1e-6, "{x} vs {m}");
        }
        assert!(result.energy.total() < 1e-12);
        assert_eq!(result.energy.ai_polarization, 0.0);
    }

    #[test]
    fn converging_step_is_reported_only_as_final() {
        let stages = Mutex::new(Vec::new());
        let reporter = recording_reporter(&stages);
        let mut quadratic = Quadratic {
            minimum: vec![2.0, -1.0, 0.5],
        };
        let config = OptimizationConfigBuilder::new()
            .tolerance(1e-6)
            .print_step(1)
            .build()
            .unwrap();

        let result = run(&mut quadratic, &[0.0; 3], &config, &reporter).unwrap();
        assert!(result.converged);

        let stages = stages.lock().unwrap();
        let reported: Vec<SnapshotStage> = stages.iter().map(|(stage, _)| *stage).collect();
        let mut expected = vec![SnapshotStage::Initial];
        expected.extend((1..result.steps).map(SnapshotStage::Step));
        expected.push(SnapshotStage::Final);
        assert_eq!(reported, expected);
    }

    #[test]
    fn optimization_lowers_energy_and_reports_snapshots() {
        let stages = Mutex::new(Vec::new());
        let reporter = recording_reporter(&stages);
        let mut model = PolarizationModel::new(
            fixtures::two_fragment_system(6.0),
            PolarizationConfig::default(),
            &reporter,
        );
        let initial = model.compute(false).unwrap().energy.total();
        let x0 = model.system().coordinates();

        let config = OptimizationConfigBuilder::new()
            .max_steps(5)
            .print_step(2)
            .ls_step_size(0.2)
            .build()
            .unwrap();
        let result = run(&mut model, &x0, &config, &reporter).unwrap();

        assert!(result.steps >= 1 && result.steps <= 5);
        assert!(result.energy.total() < initial);
        assert_eq!(model.system().coordinates(), result.coordinates);

        let stages = stages.lock().unwrap();
        assert_eq!(stages.first().unwrap().0, SnapshotStage::Initial);
        assert_eq!(stages.last().unwrap().0, SnapshotStage::Final);
        assert!((stages.first().unwrap().1 - initial).abs() < 1e-12);
        for (stage, _) in stages.iter() {
            if let SnapshotStage::Step(step) = stage {
                assert_eq!(step % 2, 0);
            }
        }
    }

    #[test]
    fn zero_steps_evaluates_only_the_start() {
        let reporter = ProgressReporter::new();
        let mut model = PolarizationModel::new(
            fixtures::three_fragment_system(),
            PolarizationConfig::default(),
            &reporter,
        );
        let x0 = model.system().coordinates();
        let config = OptimizationConfigBuilder::new().max_steps(0).build().unwrap();

        let result = run(&mut model, &x0, &config, &reporter).unwrap();

        assert!(!result.converged);
        assert_eq!(result.steps, 0);
        assert_eq!(result.coordinates, x0);
        assert!(result.energy.total() < 0.0);
    }

    #[test]
    fn isolated_fragments_converge_after_one_step() {
        let reporter = ProgressReporter::new();
        let config = PolarizationConfigBuilder::new()
            .enable_cutoff(true)
            .swf_cutoff(5.0)
            .build()
            .unwrap();
        let mut model =
            PolarizationModel::new(fixtures::two_fragment_system(20.0), config, &reporter);
        let x0 = model.system().coordinates();

        let result = run(&mut model, &x0, &OptimizationConfig::default(), &reporter).unwrap();

        assert!(result.converged);
        assert_eq!(result.steps, 1);
        assert_eq!(result.energy.total(), 0.0);
        assert_eq!(result.coordinates, model.system().coordinates());
    }

    #[test]
    fn scf_failure_surfaces_as_evaluation_error() {
        let reporter = ProgressReporter::new();
        let config = PolarizationConfigBuilder::new()
            .scf_max_iterations(1)
            .build()
            .unwrap();
        let mut model =
            PolarizationModel::new(fixtures::three_fragment_system(), config, &reporter);
        let x0 = model.system().coordinates();

        let result = run(&mut model, &x0, &OptimizationConfig::default(), &reporter);
        assert!(matches!(result, Err(OptimizerError::Evaluation(_))));
    }
}
