use super::fragment::{COORDS_PER_FRAGMENT, Fragment, FragmentError};
use super::points::PointCharge;
use nalgebra::{Point3, Vector3};
use std::collections::HashSet;

/// A collection of rigid fragments together with the environment they are embedded in.
///
/// Besides the fragments themselves, the system holds the external point charges of an ab initio
/// region, the set of fragment pairs excluded from all interactions, and an optional periodic box.
#[derive(Debug, Clone, Default)]
pub struct FragmentSystem {
    /// Fragments in insertion order; the index is the fragment id.
    fragments: Vec<Fragment>,
    /// External point charges, each with its own gradient slot in the results.
    point_charges: Vec<PointCharge>,
    /// Excluded pairs, stored with the smaller index first.
    skip_pairs: HashSet<(usize, usize)>,
    /// Orthorhombic box edge lengths, if periodic.
    periodic_box: Option<Vector3<f64>>,
    n_polarizable_points: usize,
}

impl FragmentSystem {
    /// Creates a new, empty fragment system.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a fragment and returns its index.
    pub fn add_fragment(&mut self, fragment: Fragment) -> usize {
        let index = self.fragments.len();
        self.n_polarizable_points += fragment.polarizable_points().len();
        self.fragments.push(fragment);
        index
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Retrieves a fragment by index.
    ///
    /// # Return
    ///
    /// Returns `Some(&Fragment)` if the index is in range, otherwise `None`.
    pub fn fragment(&self, index: usize) -> Option<&Fragment> {
        self.fragments.get(index)
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub(crate) fn fragments_mut(&mut self) -> &mut [Fragment] {
        &mut self.fragments
    }

    /// Returns an iterator over the fragment names in index order.
    pub fn fragment_names(&self) -> impl Iterator<Item = &str> {
        self.fragments.iter().map(|f| f.name())
    }

    /// Total number of atoms over all fragments.
    pub fn atom_count(&self) -> usize {
        self.fragments.iter().map(|f| f.atoms().len()).sum()
    }

    /// Returns `(label, position)` for every atom of every fragment, in fragment order.
    pub fn atom_positions(&self) -> Vec<(String, Point3<f64>)> {
        self.fragments
            .iter()
            .flat_map(|f| f.atoms().iter().map(|a| (a.label.clone(), a.position)))
            .collect()
    }

    pub fn n_polarizable_points(&self) -> usize {
        self.n_polarizable_points
    }


    pub fn point_charges(&self) -> &[PointCharge] {
        &self.point_charges
    }

    pub fn set_point_charges(&mut self, charges: Vec<PointCharge>) {
        self.point_charges = charges;
    }

    pub fn periodic_box(&self) -> Option<&Vector3<f64>> {
        self.periodic_box.as_ref()
    }

    pub fn set_periodic_box(&mut self, periodic_box: Option<Vector3<f64>>) {
        self.periodic_box = periodic_box;
    }

    /// Marks or unmarks a fragment pair as excluded from all interactions.
    ///
    /// # Errors
    ///
    /// Returns [`FragmentError::IndexOutOfRange`] if either index does not name a fragment.
    pub fn set_skip_pair(&mut self, i: usize, j: usize, skip: bool) -> Result<(), FragmentError> {
        for index in [i, j] {
            if index >= self.len() {
                return Err(FragmentError::IndexOutOfRange {
                    index,
                    count: self.len(),
                });
            }
        }

        let key = (i.min(j), i.max(j));
        if skip {
            self.skip_pairs.insert(key);
        } else {
            self.skip_pairs.remove(&key);
        }
        Ok(())
    }

    #[inline]
    pub fn skip_pair(&self, i: usize, j: usize) -> bool {
        !self.skip_pairs.is_empty() && self.skip_pairs.contains(&(i.min(j), i.max(j)))
    }

    /// Returns the flattened `x, y, z, a, b, c` coordinates of all fragments.
    pub fn coordinates(&self) -> Vec<f64> {
        self.fragments
            .iter()
            .flat_map(|f| f.coordinates())
            .collect()
    }

    /// Moves every fragment to the given flattened coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`FragmentError::CoordinateLength`] if `coordinates` is not exactly six values per
    /// fragment; no fragment is moved in that case.
    pub fn set_coordinates(&mut self, coordinates: &[f64]) -> Result<(), FragmentError> {
        let expected = COORDS_PER_FRAGMENT * self.fragments.len();
        if coordinates.len() != expected {
            return Err(FragmentError::CoordinateLength {
                expected,
                found: coordinates.len(),
            });
        }

        for (fragment, chunk) in self
            .fragments
            .iter_mut()
            .zip(coordinates.chunks_exact(COORDS_PER_FRAGMENT))
        {
            let mut coords = [0.0; COORDS_PER_FRAGMENT];
            coords.copy_from_slice(chunk);
            fragment.set_coordinates(&coords);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::fragment::FragmentTemplate;
    use crate::core::models::points::{Atom, PolarizablePoint};
    use nalgebra::Matrix3;
    use std::sync::Arc;

    fn template(name: &str, n_pol: usize) -> Arc<FragmentTemplate> {
        Arc::new(FragmentTemplate {
            name: name.to_string(),
            atoms: vec![Atom {
                label: "A".to_string(),
                position: Point3::new(0.5, 0.0, 0.0),
                znuc: 1.0,
            }],
            multipole_points: vec![],
            polarizable_points: (0..n_pol)
                .map(|k| PolarizablePoint::new(Point3::new(k as f64, 0.0, 0.0), Matrix3::identity()))
                .collect(),
        })
    }

    fn system() -> FragmentSystem {
        let mut system = FragmentSystem::new();
        system.add_fragment(Fragment::new(template("a", 2), &[0.0; 6]));
        system.add_fragment(Fragment::new(template("b", 0), &[5.0, 0.0, 0.0, 0.0, 0.0, 0.0]));
        system.add_fragment(Fragment::new(template("c", 3), &[0.0, 5.0, 0.0, 0.0, 0.0, 0.0]));
        system
    }

    #[test]
    fn polarizable_points_are_counted_across_fragments() {
        let system = system();
        assert_eq!(system.n_polarizable_points(), 5);
    }

    #[test]
    fn set_coordinates_rejects_wrong_length() {
        let mut system = system();
        let before = system.coordinates();
        let result = system.set_coordinates(&[0.0; 17]);
        assert!(matches!(
            result,
            Err(FragmentError::CoordinateLength {
                expected: 18,
                found: 17
            })
        ));
        assert_eq!(system.coordinates(), before);
    }

    #[test]
    fn set_coordinates_moves_every_fragment() {
        let mut system = system();
        let coords: Vec<f64> = (0..18).map(|k| k as f64 * 0.1).collect();
        system.set_coordinates(&coords).unwrap();
        for (a, b) in system.coordinates().iter().zip(&coords) {
            assert!((a - b).abs() < 1e-15);
        }
    }

    #[test]
    fn skip_pairs_are_symmetric() {
        let mut system = system();
        system.set_skip_pair(2, 0, true).unwrap();
        assert!(system.skip_pair(0, 2));
        assert!(system.skip_pair(2, 0));
        assert!(!system.skip_pair(0, 1));

        system.set_skip_pair(0, 2, false).unwrap();
        assert!(!system.skip_pair(2, 0));
    }

    #[test]
    fn set_skip_pair_rejects_unknown_fragment() {
        let mut system = system();
        let result = system.set_skip_pair(0, 3, true);
        assert!(matches!(
            result,
            Err(FragmentError::IndexOutOfRange { index: 3, count: 3 })
        ));
    }

    #[test]
    fn names_and_atoms_follow_fragment_order() {
        let system = system();
        let names: Vec<_> = system.fragment_names().collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(system.atom_count(), 3);
        assert_eq!(system.atom_positions()[1].1, Point3::new(5.5, 0.0, 0.0));
    }
}
