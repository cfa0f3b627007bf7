use nalgebra::{Matrix3, Point3, Vector3};

/// Additive gradient output of one pass: per-fragment gradients and torques, per-point-charge
/// gradients and the virial stress.
///
/// All vectors carry gradient sign (`dE/dX`, `dE/dtheta`). Partial accumulators built on
/// different threads are combined with [`merge`](Self::merge).
#[derive(Debug, Clone, PartialEq)]
pub struct GradientAccumulator {
    pub forces: Vec<Vector3<f64>>,
    pub torques: Vec<Vector3<f64>>,
    pub point_charge_grads: Vec<Vector3<f64>>,
    pub stress: Matrix3<f64>,
}

impl GradientAccumulator {
    pub fn new(n_fragments: usize, n_point_charges: usize) -> Self {
        Self {
            forces: vec![Vector3::zeros(); n_fragments],
            torques: vec![Vector3::zeros(); n_fragments],
            point_charge_grads: vec![Vector3::zeros(); n_point_charges],
            stress: Matrix3::zeros(),
        }
    }

    /// Applies `grad` at `site` on fragment `index` centered at `center`, plus `torque` from the
    /// rotation of the moment sitting at `site`.
    #[inline]
    pub fn add_site_gradient(
        &mut self,
        index: usize,
        center: &Point3<f64>,
        site: &Point3<f64>,
        grad: &Vector3<f64>,
        torque: &Vector3<f64>,
    ) {
        self.forces[index] += grad;
        self.torques[index] += (site - center).cross(grad) + torque;
    }

    /// Applies `grad` at the center of fragment `index`.
    #[inline]
    pub fn add_center_gradient(&mut self, index: usize, grad: &Vector3<f64>) {
        self.forces[index] += grad;
    }

    #[inline]
    pub fn add_stress(&mut self, dr: &Vector3<f64>, grad: &Vector3<f64>) {
        self.stress += dr * grad.transpose();
    }

    pub fn merge(mut self, other: Self) -> Self {
        for (a, b) in self.forces.iter_mut().zip(&other.forces) {
            *a += b;
        }
        for (a, b) in self.torques.iter_mut().zip(&other.torques) {
            *a += b;
        }
        for (a, b) in self
            .point_charge_grads
            .iter_mut()
            .zip(&other.point_charge_grads)
        {
            *a += b;
        }
        self.stress += other.stress;
        self
    }

    /// Flattened `gx, gy, gz, tx, ty, tz` per fragment.
    pub fn fragment_gradient(&self) -> Vec<f64> {
        self.forces
            .iter()
            .zip(&self.torques)
            .flat_map(|(f, t)| [f.x, f.y, f.z, t.x, t.y, t.z])
            .collect()
    }
}
