use super::config::PolarizationConfig;
use crate::core::forcefield::switching::{dswf_over_r, swf};
use crate::core::models::system::FragmentSystem;
use nalgebra::{Point3, Vector3};

/// Switching value and periodic image for an ordered fragment pair `(i, j)`.
///
/// Computed afresh for every pair in every interaction loop; nothing is cached between loops.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairWindow {
    pub swf: f64,
    /// Gradient of `swf` with respect to the position of fragment `i`.
    pub dswf: Vector3<f64>,
    /// Minimum-image displacement from the center of `i` to the center of `j`.
    pub dr: Vector3<f64>,
    /// Lattice translation subtracted from `j` to reach its nearest image.
    pub cell: Vector3<f64>,
}

impl PairWindow {
    pub fn new(system: &FragmentSystem, config: &PolarizationConfig, i: usize, j: usize) -> Self {
        let frags = system.fragments();
        let raw = frags[j].position() - frags[i].position();

        let Some(cutoff) = config.cutoff() else {
            return Self {
                swf: 1.0,
                dswf: Vector3::zeros(),
                dr: raw,
                cell: Vector3::zeros(),
            };
        };

        let cell = match system.periodic_box() {
            Some(edges) => raw.zip_map(edges, |d, l| l * (d / l).round()),
            None => Vector3::zeros(),
        };

        let dr = raw - cell;
        let r = dr.norm();

        Self {
            swf: swf(r, cutoff),
            dswf: dr * -dswf_over_r(r, cutoff),
            dr,
            cell,
        }
    }

    /// Displacement from the nearest image of `source` (on `j`) to `site` (on `i`).
    #[inline]
    pub fn displacement(&self, site: &Point3<f64>, source: &Point3<f64>) -> Vector3<f64> {
        site - source + self.cell
    }

    #[inline]
    pub fn is_out_of_range(&self) -> bool {
        self.swf == 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::fragment::{Fragment, FragmentTemplate};
    use crate::engine::config::PolarizationConfigBuilder;
    use std::sync::Arc;

    fn system_with(positions: &[[f64; 3]]) -> FragmentSystem {
        let template = Arc::new(FragmentTemplate {
            name: "empty".to_string(),
            atoms: vec![],
            multipole_points: vec![],
            polarizable_points: vec![],
        });
        let mut system = FragmentSystem::new();
        for p in positions {
            system.add_fragment(Fragment::new(
                Arc::clone(&template),
                &[p[0], p[1], p[2], 0.0, 0.0, 0.0],
            ));
        }
        system
    }

    fn cutoff_config(cutoff: f64) -> PolarizationConfig {
        PolarizationConfigBuilder::new()
            .enable_cutoff(true)
            .swf_cutoff(cutoff)
            .build()
            .unwrap()
    }

    #[test]
    fn disabled_cutoff_gives_unit_window() {
        let system = system_with(&[[0.0; 3], [100.0, 0.0, 0.0]]);
        let window = PairWindow::new(&system, &PolarizationConfig::default(), 0, 1);
        assert_eq!(window.swf, 1.0);
        assert_eq!(window.dswf, Vector3::zeros());
        assert_eq!(window.dr, Vector3::new(100.0, 0.0, 0.0));
    }

    #[test]
    fn beyond_cutoff_window_is_zero() {
        let system = system_with(&[[0.0; 3], [11.0, 0.0, 0.0]]);
        let window = PairWindow::new(&system, &cutoff_config(10.0), 0, 1);
        assert!(window.is_out_of_range());
        assert_eq!(window.dswf, Vector3::zeros());
    }

    #[test]
    fn dswf_is_gradient_with_respect_to_first_fragment() {
        let config = cutoff_config(10.0);
        let h = 1e-6;
        let base = [[0.0, 0.0, 0.0], [6.0, 5.0, 2.0]];
        let window = PairWindow::new(&system_with(&base), &config, 0, 1);

        for k in 0..3 {
            let mut plus = base;
            let mut minus = base;
            plus[0][k] += h;
            minus[0][k] -= h;
            let numeric = (PairWindow::new(&system_with(&plus), &config, 0, 1).swf
                - PairWindow::new(&system_with(&minus), &config, 0, 1).swf)
                / (2.0 * h);
            assert!((numeric - window.dswf[k]).abs() < 1e-8);
        }
    }

    #[test]
    fn periodic_box_picks_nearest_image() {
        let mut system = system_with(&[[1.0, 1.0, 1.0], [29.0, 1.0, 1.0]]);
        system.set_periodic_box(Some(Vector3::new(30.0, 30.0, 30.0)));
        let window = PairWindow::new(&system, &cutoff_config(10.0), 0, 1);

        assert!((window.dr - Vector3::new(-2.0, 0.0, 0.0)).norm() < 1e-12);
        assert_eq!(window.cell, Vector3::new(30.0, 0.0, 0.0));
        let d = window.displacement(&Point3::new(1.0, 1.0, 1.0), &Point3::new(29.0, 1.0, 1.0));
        assert!((d - Vector3::new(2.0, 0.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn window_is_antisymmetric_in_pair_order() {
        let system = system_with(&[[0.0; 3], [5.0, 5.0, 3.0]]);
        let config = cutoff_config(10.0);
        let ij = PairWindow::new(&system, &config, 0, 1);
        let ji = PairWindow::new(&system, &config, 1, 0);
        assert_eq!(ij.swf, ji.swf);
        assert!((ij.dswf + ji.dswf).norm() < 1e-15);
        assert!((ij.dr + ji.dr).norm() < 1e-15);
    }
}
