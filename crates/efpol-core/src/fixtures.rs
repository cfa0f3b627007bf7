use crate::core::forcefield::multipole::quadrupole_from_components;
use crate::core::models::fragment::{Fragment, FragmentTemplate};
use crate::core::models::points::{Atom, MultipolePoint, PolarizablePoint};
use crate::core::models::system::FragmentSystem;
use nalgebra::{Matrix3, Point3, Vector3};
use std::sync::Arc;

/// A small charged fragment with one symmetric and one asymmetric polarizability tensor.
pub fn sample_template() -> Arc<FragmentTemplate> {
    let atom = |label: &str, position: Point3<f64>| Atom {
        label: label.to_string(),
        position,
        znuc: 1.0,
    };
    let a1 = Point3::new(0.0, 0.0, 0.0);
    let a2 = Point3::new(1.2, 0.4, 0.0);

    Arc::new(FragmentTemplate {
        name: "SAMPLE".to_string(),
        atoms: vec![atom("A1", a1), atom("A2", a2)],
        multipole_points: vec![
            MultipolePoint {
                position: a1,
                monopole: -0.8,
                dipole: Vector3::new(0.05, -0.02, 0.1),
                quadrupole: quadrupole_from_components(&[0.2, -0.05, -0.15, 0.03, 0.0, -0.04]),
            },
            MultipolePoint {
                position: a2,
                monopole: -0.9,
                dipole: Vector3::new(-0.08, 0.04, 0.0),
                quadrupole: quadrupole_from_components(&[-0.1, 0.25, -0.15, 0.0, 0.06, 0.02]),
            },
        ],
        polarizable_points: vec![
            PolarizablePoint::new(
                Point3::new(0.3, 0.1, 0.0),
                Matrix3::new(3.0, 0.2, 0.1, 0.2, 2.5, 0.0, 0.1, 0.0, 2.0),
            ),
            PolarizablePoint::new(
                Point3::new(0.9, 0.5, 0.2),
                Matrix3::new(2.0, 0.3, 0.0, 0.1, 1.8, 0.2, 0.0, 0.1, 1.5),
            ),
        ],
    })
}

pub fn three_fragment_system() -> FragmentSystem {
    three_fragment_system_from(sample_template())
}

pub fn three_fragment_system_from(template: Arc<FragmentTemplate>) -> FragmentSystem {
    let mut system = FragmentSystem::new();
    for coords in [
        [0.0, 0.0, 0.0, 0.1, 0.2, 0.3],
        [4.5, 0.5, -0.3, 1.0, 0.7, -0.4],
        [0.8, 4.6, 0.9, -0.6, 1.3, 2.1],
    ] {
        system.add_fragment(Fragment::new(Arc::clone(&template), &coords));
    }
    system
}

/// Two sample fragments whose centers are `separation` apart along x.
pub fn two_fragment_system(separation: f64) -> FragmentSystem {
    let template = sample_template();
    let mut system = FragmentSystem::new();
    system.add_fragment(Fragment::new(
        Arc::clone(&template),
        &[0.0, 0.0, 0.0, 0.3, 0.5, 0.0],
    ));
    system.add_fragment(Fragment::new(template, &[separation, 0.0, 0.0, 0.4, 0.9, -0.2]));
    system
}
