use super::points::{Atom, MultipolePoint, PolarizablePoint};
use crate::core::utils::geometry::{euler_to_matrix, move_point, rotate_tensor};
use nalgebra::{Matrix3, Point3};
use std::sync::Arc;
use thiserror::Error;

/// Number of rigid-body coordinates per fragment: `x, y, z, a, b, c`.
pub const COORDS_PER_FRAGMENT: usize = 6;

#[derive(Debug, Error)]
pub enum FragmentError {
    #[error("Unknown fragment template '{0}'")]
    UnknownTemplate(String),

    #[error("Coordinate vector has length {found}, expected {expected}")]
    CoordinateLength { expected: usize, found: usize },

    #[error("Fragment index {index} out of range for a system of {count} fragments")]
    IndexOutOfRange { index: usize, count: usize },

    #[error("Invalid fragment template '{name}': {message}")]
    InvalidTemplate { name: String, message: String },

    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
}

/// Body-frame definition of a fragment type.
///
/// All positions are relative to the fragment origin and all tensors are expressed in the body
/// frame; a [`Fragment`] places a copy of these arrays in the lab frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentTemplate {
    pub name: String,
    pub atoms: Vec<Atom>,
    pub multipole_points: Vec<MultipolePoint>,
    pub polarizable_points: Vec<PolarizablePoint>,
}

/// A rigid fragment placed in the lab frame.
///
/// The lab-frame point arrays are recomputed from the template on every coordinate update, while
/// the induced dipoles and fields on the polarizable points are left untouched.
#[derive(Debug, Clone)]
pub struct Fragment {
    template: Arc<FragmentTemplate>,
    position: Point3<f64>,
    euler: [f64; 3],
    rotmat: Matrix3<f64>,
    atoms: Vec<Atom>,
    multipole_points: Vec<MultipolePoint>,
    polarizable_points: Vec<PolarizablePoint>,
}

impl Fragment {
    pub fn new(template: Arc<FragmentTemplate>, coordinates: &[f64; COORDS_PER_FRAGMENT]) -> Self {
        let mut fragment = Self {
            atoms: template.atoms.clone(),
            multipole_points: template.multipole_points.clone(),
            polarizable_points: template.polarizable_points.clone(),
            template,
            position: Point3::origin(),
            euler: [0.0; 3],
            rotmat: Matrix3::identity(),
        };
        fragment.set_coordinates(coordinates);
        fragment
    }

    pub fn name(&self) -> &str {
        &self.template.name
    }

    pub fn template(&self) -> &FragmentTemplate {
        &self.template
    }

    pub fn position(&self) -> &Point3<f64> {
        &self.position
    }

    /// Euler angles `(a, b, c)` in the z-x-z convention.
    pub fn euler_angles(&self) -> [f64; 3] {
        self.euler
    }

    pub fn rotation(&self) -> &Matrix3<f64> {
        &self.rotmat
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn multipole_points(&self) -> &[MultipolePoint] {
        &self.multipole_points
    }

    pub fn polarizable_points(&self) -> &[PolarizablePoint] {
        &self.polarizable_points
    }

    pub(crate) fn polarizable_points_mut(&mut self) -> &mut [PolarizablePoint] {
        &mut self.polarizable_points
    }

    pub fn coordinates(&self) -> [f64; COORDS_PER_FRAGMENT] {
        [
            self.position.x,
            self.position.y,
            self.position.z,
            self.euler[0],
            self.euler[1],
            self.euler[2],
        ]
    }

    pub fn set_coordinates(&mut self, coordinates: &[f64; COORDS_PER_FRAGMENT]) {
        let [x, y, z, a, b, c] = *coordinates;

        self.position = Point3::new(x, y, z);
        self.euler = [a, b, c];
        self.rotmat = euler_to_matrix(a, b, c);

        self.update_points();
    }

    fn update_points(&mut self) {
        let center = self.position;
        let rotmat = self.rotmat;
        let template = &self.template;

        for (atom, body) in self.atoms.iter_mut().zip(&template.atoms) {
            atom.position = move_point(&center, &rotmat, &body.position.coords);
        }

        for (mult, body) in self
            .multipole_points
            .iter_mut()
            .zip(&template.multipole_points)
        {
            mult.position = move_point(&center, &rotmat, &body.position.coords);
            mult.dipole = rotmat * body.dipole;
            mult.quadrupole = rotate_tensor(&rotmat, &body.quadrupole);
        }

        for (pt, body) in self
            .polarizable_points
            .iter_mut()
            .zip(&template.polarizable_points)
        {
            pt.position = move_point(&center, &rotmat, &body.position.coords);
            pt.tensor = rotate_tensor(&rotmat, &body.tensor);
        }
    }
}
