//! Point-multipole field and induced-dipole interaction kernels.
//!
//! Every kernel takes `r = r_a - r_b`, the displacement from the source site `b` to the
//! field (or dipole) site `a`. Damping and switching are applied by the callers.

use nalgebra::{Matrix3, Vector3};

/// Field at `r` from a point charge.
#[inline]
pub fn charge_field(q: f64, r: &Vector3<f64>) -> Vector3<f64> {
    let rr = r.norm();
    r * (q / (rr * rr * rr))
}

/// Field at `r` from a point dipole.
#[inline]
pub fn dipole_field(p: &Vector3<f64>, r: &Vector3<f64>) -> Vector3<f64> {
    let rr = r.norm();
    let r2 = rr * rr;
    let r3 = r2 * rr;
    let r5 = r3 * r2;

    r * (3.0 * p.dot(r) / r5) - p / r3
}

/// Field at `r` from a traceless point quadrupole.
#[inline]
pub fn quadrupole_field(quad: &Matrix3<f64>, r: &Vector3<f64>) -> Vector3<f64> {
    let rr = r.norm();
    let r2 = rr * rr;
    let r5 = r2 * r2 * rr;
    let r7 = r5 * r2;

    let q_r = quad * r;
    let r_q_r = r.dot(&q_r);

    q_r * (-2.0 / r5) + r * (5.0 * r_q_r / r7)
}

/// Energy, position gradient and torques of a dipole `d` at site `a` in the field of a source
/// at site `b`.
///
/// `grad` is `dU/dr_a`; the source feels `-grad`. `torque_dipole` and `torque_source` are the
/// derivatives of `U` with respect to infinitesimal rotations of the moment at `a` and of the
/// moment at `b`, each about its own site.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DipoleInteraction {
    pub energy: f64,
    pub grad: Vector3<f64>,
    pub torque_dipole: Vector3<f64>,
    pub torque_source: Vector3<f64>,
}

impl DipoleInteraction {
    fn from_field_and_grad(
        d: &Vector3<f64>,
        field: &Vector3<f64>,
        grad: Vector3<f64>,
        r: &Vector3<f64>,
    ) -> Self {
        let torque_dipole = -d.cross(field);
        // The pair energy is invariant under a rigid rotation of both sites and both moments.
        let torque_source = -torque_dipole - r.cross(&grad);

        Self {
            energy: -d.dot(field),
            grad,
            torque_dipole,
            torque_source,
        }
    }
}

impl std::ops::Add for DipoleInteraction {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            energy: self.energy + rhs.energy,
            grad: self.grad + rhs.grad,
            torque_dipole: self.torque_dipole + rhs.torque_dipole,
            torque_source: self.torque_source + rhs.torque_source,
        }
    }
}

pub fn charge_dipole(q: f64, d: &Vector3<f64>, r: &Vector3<f64>) -> DipoleInteraction {
    let rr = r.norm();
    let r2 = rr * rr;
    let r3 = r2 * rr;
    let r5 = r3 * r2;

    let d_r = d.dot(r);
    let grad = -(d / r3 - r * (3.0 * d_r / r5)) * q;

    DipoleInteraction::from_field_and_grad(d, &charge_field(q, r), grad, r)
}

pub fn dipole_dipole(d: &Vector3<f64>, p: &Vector3<f64>, r: &Vector3<f64>) -> DipoleInteraction {
    let rr = r.norm();
    let r2 = rr * rr;
    let r5 = r2 * r2 * rr;
    let r7 = r5 * r2;

    let d_r = d.dot(r);
    let p_r = p.dot(r);
    let d_p = d.dot(p);

    let grad = r * (15.0 * d_r * p_r / r7 - 3.0 * d_p / r5) - (d * p_r + p * d_r) * (3.0 / r5);

    DipoleInteraction::from_field_and_grad(d, &dipole_field(p, r), grad, r)
}

pub fn dipole_quadrupole(
    d: &Vector3<f64>,
    quad: &Matrix3<f64>,
    r: &Vector3<f64>,
) -> DipoleInteraction {
    let rr = r.norm();
    let r2 = rr * rr;
    let r5 = r2 * r2 * rr;
    let r7 = r5 * r2;
    let r9 = r7 * r2;

    let q_r = quad * r;
    let q_d = quad * d;
    let r_q_r = r.dot(&q_r);
    let d_q_r = d.dot(&q_r);
    let d_r = d.dot(r);

    let grad = q_d * (2.0 / r5) - (r * d_q_r + q_r * d_r) * (10.0 / r7) - d * (5.0 * r_q_r / r7)
        + r * (35.0 * r_q_r * d_r / r9);

    DipoleInteraction::from_field_and_grad(d, &quadrupole_field(quad, r), grad, r)
}

/// A symmetric quadrupole from its six unique components `xx, yy, zz, xy, xz, yz`.
pub fn quadrupole_from_components(c: &[f64; 6]) -> Matrix3<f64> {
    Matrix3::new(c[0], c[3], c[4], c[3], c[1], c[5], c[4], c[5], c[2])
}
