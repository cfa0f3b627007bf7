use super::energy::{self, PolarizationResult};
use super::lbfgs::{EnergyFunction, Evaluation};
use super::optimize::OptimizationTarget;
use super::transform::torques_to_angle_gradients;
use crate::core::forcefield::term::EnergyTerm;
use crate::core::models::fragment::COORDS_PER_FRAGMENT;
use crate::core::models::system::FragmentSystem;
use crate::engine::config::PolarizationConfig;
use crate::engine::context::PolarizationContext;
use crate::engine::density::ElectronDensityField;
use crate::engine::error::EngineError;
use crate::engine::partition::Partition;
use crate::engine::progress::ProgressReporter;
use nalgebra::Point3;
use tracing::trace;

/// A fragment system bound to one polarization configuration.
///
/// Owns the system so that coordinate updates, the SCF state on the polarizable points and the
/// most recent result always describe the same geometry. Implements [`EnergyFunction`] over the
/// flattened `x, y, z, a, b, c` coordinates with Euler-angle gradients.
pub struct PolarizationModel<'a> {
    system: FragmentSystem,
    config: PolarizationConfig,
    partition: Partition,
    density: Option<Box<dyn ElectronDensityField + 'a>>,
    reporter: &'a ProgressReporter<'a>,
    last: Option<PolarizationResult>,
}

impl<'a> PolarizationModel<'a> {
    pub fn new(
        system: FragmentSystem,
        config: PolarizationConfig,
        reporter: &'a ProgressReporter<'a>,
    ) -> Self {
        let partition = Partition::new(system.len(), config.workers);
        Self {
            system,
            config,
            partition,
            density: None,
            reporter,
            last: None,
        }
    }

    /// Attaches the electron-density field used by the ab initio polarization term.
    pub fn with_density(mut self, density: impl ElectronDensityField + 'a) -> Self {
        self.density = Some(Box::new(density));
        self
    }

    pub fn system(&self) -> &FragmentSystem {
        &self.system
    }

    pub fn into_system(self) -> FragmentSystem {
        self.system
    }

    pub fn config(&self) -> &PolarizationConfig {
        &self.config
    }

    /// Result of the most recent successful [`compute`](Self::compute).
    pub fn last_result(&self) -> Option<&PolarizationResult> {
        self.last.as_ref()
    }

    pub fn dimension(&self) -> usize {
        self.system.len() * COORDS_PER_FRAGMENT
    }

    pub fn compute(&mut self, do_gradient: bool) -> Result<&PolarizationResult, EngineError> {
        self.last = None;
        let ctx = PolarizationContext::new(
            &self.config,
            &self.partition,
            self.density.as_deref(),
            self.reporter,
        );
        let result = energy::compute(&mut self.system, &ctx, do_gradient)?;
        Ok(self.last.insert(result))
    }
}

impl EnergyFunction for PolarizationModel<'_> {
    fn evaluate(&mut self, x: &[f64]) -> Result<Evaluation, EngineError> {
        let expected = self.dimension();
        if x.len() != expected {
            return Err(EngineError::CoordinateMismatch {
                expected,
                found: x.len(),
            });
        }

        self.system.set_coordinates(x)?;
        let result = self.compute(true)?;

        let value = result.energy.total();
        let mut gradient = result
            .gradient
            .as_ref()
            .map(|g| g.fragments.clone())
            .unwrap_or_else(|| vec![0.0; expected]);
        torques_to_angle_gradients(x, &mut gradient);

        trace!(value, "Model evaluated.");
        Ok(Evaluation { value, gradient })
    }
}

impl OptimizationTarget for PolarizationModel<'_> {
    fn energy_terms(&self, value: f64) -> EnergyTerm {
        self.last
            .as_ref()
            .map(|r| r.energy)
            .unwrap_or_else(|| EnergyTerm::new(value, 0.0))
    }

    fn geometry(&self) -> Vec<(String, Point3<f64>)> {
        self.system.atom_positions()
    }

    fn restart(&self) -> Vec<(String, [f64; COORDS_PER_FRAGMENT])> {
        self.system
            .fragments()
            .iter()
            .map(|f| (f.name().to_string(), f.coordinates()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::{PolarizationConfigBuilder, Terms};
    use crate::engine::error::CallbackError;
    use crate::fixtures;
    use nalgebra::{Point3, Vector3};

    fn sample_model<'a>(
        config: PolarizationConfig,
        reporter: &'a ProgressReporter<'a>,
    ) -> PolarizationModel<'a> {
        PolarizationModel::new(fixtures::three_fragment_system(), config, reporter)
    }

    #[test]
    fn euler_gradient_matches_finite_differences() {
        let reporter = ProgressReporter::new();
        for config in [
            PolarizationConfigBuilder::new()
                .scf_tolerance(1e-13)
                .build()
                .unwrap(),
            PolarizationConfigBuilder::new()
                .enable_cutoff(true)
                .swf_cutoff(5.6)
                .scf_tolerance(1e-13)
                .build()
                .unwrap(),
        ] {
            let mut model = sample_model(config, &reporter);
            let x0 = model.system().coordinates();
            let analytic = model.evaluate(&x0).unwrap().gradient;

            let h = 1e-5;
            for idx in 0..x0.len() {
                let mut plus = x0.clone();
                let mut minus = x0.clone();
                plus[idx] += h;
                minus[idx] -= h;

                let numeric = (model.evaluate(&plus).unwrap().value
                    - model.evaluate(&minus).unwrap().value)
                    / (2.0 * h);
                assert!(
                    (numeric - analytic[idx]).abs() < 1e-7,
                    "coordinate {idx}: numeric {numeric} vs analytic {}",
                    analytic[idx]
                );
            }
        }
    }

    #[test]
    fn evaluate_moves_the_system_and_records_the_result() {
        let reporter = ProgressReporter::new();
        let mut model = sample_model(PolarizationConfig::default(), &reporter);
        let mut x = model.system().coordinates();
        x[0] -= 0.5;
        x[4] += 0.2;

        let eval = model.evaluate(&x).unwrap();

        assert_eq!(model.system().coordinates(), x);
        let last = model.last_result().unwrap();
        assert_eq!(last.energy.total(), eval.value);
        assert!(last.gradient.is_some());
    }

    #[test]
    fn evaluate_rejects_wrong_length() {
        let reporter = ProgressReporter::new();
        let mut model = sample_model(PolarizationConfig::default(), &reporter);
        let before = model.system().coordinates();

        let result = model.evaluate(&[0.0; 7]);

        assert!(matches!(
            result,
            Err(EngineError::CoordinateMismatch {
                expected: 18,
                found: 7
            })
        ));
        assert_eq!(model.system().coordinates(), before);
    }

    #[test]
    fn reports_describe_the_last_evaluated_point() {
        let reporter = ProgressReporter::new();
        let mut model = sample_model(PolarizationConfig::default(), &reporter);
        let mut x = model.system().coordinates();
        x[6] += 0.3;

        let eval = model.evaluate(&x).unwrap();

        let restart = model.restart();
        assert_eq!(restart.len(), 3);
        assert_eq!(restart[1].0, model.system().fragments()[1].name());
        assert_eq!(restart[1].1[0], x[6]);
        assert_eq!(model.geometry().len(), model.system().atom_count());
        assert_eq!(model.energy_terms(0.0).total(), eval.value);
    }

    #[test]
    fn failed_compute_clears_last_result() {
        let reporter = ProgressReporter::new();
        let mut model = sample_model(PolarizationConfig::default(), &reporter);
        model.compute(false).unwrap();
        assert!(model.last_result().is_some());

        model.config.scf_max_iterations = 1;
        assert!(model.compute(false).is_err());
        assert!(model.last_result().is_none());
    }

    #[test]
    fn attached_density_feeds_ai_polarization() {
        let reporter = ProgressReporter::new();
        let config = PolarizationConfigBuilder::new()
            .terms(Terms {
                polarization: true,
                ai_polarization: true,
            })
            .build()
            .unwrap();
        let mut model = sample_model(config, &reporter).with_density(
            |positions: &[Point3<f64>]| -> Result<Vec<Vector3<f64>>, CallbackError> {
                Ok(positions
                    .iter()
                    .map(|p| Vector3::new(0.01, -0.02, 0.005) * (1.0 + 0.1 * p.x))
                    .collect())
            },
        );

        let result = model.compute(false).unwrap();
        assert!(result.energy.ai_polarization != 0.0);
        assert!(result.energy.polarization < 0.0);
    }
}
