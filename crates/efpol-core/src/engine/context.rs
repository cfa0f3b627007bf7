use super::config::{ConfigError, PolarizationConfig};
use super::density::ElectronDensityField;
use super::partition::Partition;
use super::progress::ProgressReporter;
use crate::core::models::system::FragmentSystem;

/// Read-only inputs shared by every polarization task of one evaluation.
#[derive(Clone, Copy)]
pub struct PolarizationContext<'a> {
    pub config: &'a PolarizationConfig,
    pub partition: &'a Partition,
    pub density: Option<&'a dyn ElectronDensityField>,
    pub reporter: &'a ProgressReporter<'a>,
}

impl<'a> PolarizationContext<'a> {
    pub fn new(
        config: &'a PolarizationConfig,
        partition: &'a Partition,
        density: Option<&'a dyn ElectronDensityField>,
        reporter: &'a ProgressReporter<'a>,
    ) -> Self {
        Self {
            config,
            partition,
            density,
            reporter,
        }
    }
}

/// Checks the parts of a system that depend on the configuration.
///
/// A periodic box requires the cutoff, and each edge must be at least twice the cutoff so that a
/// fragment interacts with at most one image of another.
pub fn validate_system(
    system: &FragmentSystem,
    config: &PolarizationConfig,
) -> Result<(), ConfigError> {
    let Some(edges) = system.periodic_box() else {
        return Ok(());
    };

    let Some(cutoff) = config.cutoff() else {
        return Err(ConfigError::InvalidParameter {
            parameter: "periodic_box",
            reason: "periodic boundaries require the cutoff to be enabled".to_string(),
        });
    };

    if edges.min() < 2.0 * cutoff {
        return Err(ConfigError::InvalidParameter {
            parameter: "periodic_box",
            reason: format!(
                "smallest edge {} is less than twice the cutoff {}",
                edges.min(),
                cutoff
            ),
        });
    }
    Ok(())
}
