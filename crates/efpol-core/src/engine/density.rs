use super::error::CallbackError;
use nalgebra::{Point3, Vector3};

/// Electric field produced by the electron density of an ab initio region.
///
/// Called once per solve with the lab-frame positions of every polarizable point, in global
/// point order. The returned vector must have one entry per position.
pub trait ElectronDensityField: Send + Sync {
    fn field_at(&self, positions: &[Point3<f64>]) -> Result<Vec<Vector3<f64>>, CallbackError>;
}

impl<F> ElectronDensityField for F
where
    F: Fn(&[Point3<f64>]) -> Result<Vec<Vector3<f64>>, CallbackError> + Send + Sync,
{
    fn field_at(&self, positions: &[Point3<f64>]) -> Result<Vec<Vector3<f64>>, CallbackError> {
        self(positions)
    }
}
