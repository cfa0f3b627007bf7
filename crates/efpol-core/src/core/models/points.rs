use nalgebra::{Matrix3, Point3, Vector3};

/// A nucleus of a fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// Atom label as given in the fragment library (e.g., "O1", "H2").
    pub label: String,
    /// Position in bohr. Body frame on a template, lab frame on a placed fragment.
    pub position: Point3<f64>,
    /// Nuclear charge in atomic units.
    pub znuc: f64,
}

/// A distributed multipole expansion site.
#[derive(Debug, Clone, PartialEq)]
pub struct MultipolePoint {
    pub position: Point3<f64>,
    pub monopole: f64,
    pub dipole: Vector3<f64>,
    /// Traceless quadrupole, symmetric.
    pub quadrupole: Matrix3<f64>,
}

/// A site carrying an anisotropic polarizability and its induced dipoles.
///
/// The induced dipole `mu` solves `mu = alpha . F` and its conjugate `mu~` solves
/// `mu~ = alpha^T . F~`. Both are zeroed at the start of every solve and are only meaningful
/// after a converged one.
#[derive(Debug, Clone, PartialEq)]
pub struct PolarizablePoint {
    pub position: Point3<f64>,
    /// Polarizability tensor. Not necessarily symmetric.
    pub tensor: Matrix3<f64>,
    pub induced_dipole: Vector3<f64>,
    pub induced_dipole_conj: Vector3<f64>,
    /// Static field from other fragments and external point charges.
    pub elec_field: Vector3<f64>,
    /// Static field from the electron density of an ab initio region.
    pub elec_field_wf: Vector3<f64>,
}

impl PolarizablePoint {
    pub fn new(position: Point3<f64>, tensor: Matrix3<f64>) -> Self {
        Self {
            position,
            tensor,
            induced_dipole: Vector3::zeros(),
            induced_dipole_conj: Vector3::zeros(),
            elec_field: Vector3::zeros(),
            elec_field_wf: Vector3::zeros(),
        }
    }

    /// The physical induced dipole, the mean of both channels.
    #[inline]
    pub fn mean_dipole(&self) -> Vector3<f64> {
        (self.induced_dipole + self.induced_dipole_conj) * 0.5
    }
}

/// An external point charge, typically a nucleus of an ab initio region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointCharge {
    pub position: Point3<f64>,
    pub charge: f64,
}
