use super::fragment::{COORDS_PER_FRAGMENT, Fragment, FragmentError, FragmentTemplate};
use super::points::{Atom, MultipolePoint, PolarizablePoint};
use crate::core::forcefield::multipole::quadrupole_from_components;
use nalgebra::{Matrix3, Point3, Vector3};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawLibrary {
    #[serde(default)]
    fragment: Vec<RawFragment>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawFragment {
    name: String,
    #[serde(default, rename = "atom")]
    atoms: Vec<RawAtom>,
    #[serde(default, rename = "multipole")]
    multipoles: Vec<RawMultipole>,
    #[serde(default, rename = "polarizable")]
    polarizable_points: Vec<RawPolarizable>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawAtom {
    label: String,
    position: [f64; 3],
    znuc: f64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawMultipole {
    position: [f64; 3],
    #[serde(default)]
    monopole: f64,
    #[serde(default)]
    dipole: [f64; 3],
    /// `xx, yy, zz, xy, xz, yz`
    #[serde(default)]
    quadrupole: [f64; 6],
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPolarizable {
    position: [f64; 3],
    /// Row-major.
    tensor: [[f64; 3]; 3],
}

/// Body-frame fragment templates keyed by name.
///
/// Libraries are TOML files with one `[[fragment]]` table per template, each carrying
/// `[[fragment.atom]]`, `[[fragment.multipole]]` and `[[fragment.polarizable]]` arrays. All
/// quantities are in atomic units. Quadrupoles are stored with their trace removed.
#[derive(Debug, Default, Clone)]
pub struct FragmentLibrary {
    templates: HashMap<String, Arc<FragmentTemplate>>,
}

impl FragmentLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self, FragmentError> {
        let path_str = path.to_string_lossy().to_string();
        let content = std::fs::read_to_string(path).map_err(|e| FragmentError::Io {
            path: path_str.clone(),
            source: e,
        })?;
        Self::parse(&content, &path_str)
    }

    fn parse(content: &str, origin: &str) -> Result<Self, FragmentError> {
        let raw: RawLibrary = toml::from_str(content).map_err(|e| FragmentError::Toml {
            path: origin.to_string(),
            source: e,
        })?;

        let mut library = Self::new();
        for raw_fragment in raw.fragment {
            library.insert(template_from_raw(raw_fragment)?)?;
        }
        Ok(library)
    }

    /// Registers a template, rejecting duplicate names.
    pub fn insert(&mut self, template: FragmentTemplate) -> Result<(), FragmentError> {
        if self.templates.contains_key(&template.name) {
            return Err(FragmentError::InvalidTemplate {
                name: template.name,
                message: "defined more than once".to_string(),
            });
        }
        self.templates
            .insert(template.name.clone(), Arc::new(template));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<FragmentTemplate>> {
        self.templates.get(name)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    /// Places a new fragment of the named template at `x, y, z, a, b, c`.
    pub fn instantiate(
        &self,
        name: &str,
        coordinates: &[f64; COORDS_PER_FRAGMENT],
    ) -> Result<Fragment, FragmentError> {
        let template = self
            .get(name)
            .ok_or_else(|| FragmentError::UnknownTemplate(name.to_string()))?;
        Ok(Fragment::new(Arc::clone(template), coordinates))
    }
}

impl FromStr for FragmentLibrary {
    type Err = FragmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s, "<string>")
    }
}

fn template_from_raw(raw: RawFragment) -> Result<FragmentTemplate, FragmentError> {
    if raw.name.trim().is_empty() {
        return Err(FragmentError::InvalidTemplate {
            name: raw.name,
            message: "fragment name must not be empty".to_string(),
        });
    }

    let atoms = raw
        .atoms
        .into_iter()
        .map(|a| Atom {
            label: a.label,
            position: Point3::from(a.position),
            znuc: a.znuc,
        })
        .collect();

    let multipole_points = raw
        .multipoles
        .into_iter()
        .map(|m| {
            let quad = quadrupole_from_components(&m.quadrupole);
            MultipolePoint {
                position: Point3::from(m.position),
                monopole: m.monopole,
                dipole: Vector3::from(m.dipole),
                quadrupole: quad - Matrix3::identity() * (quad.trace() / 3.0),
            }
        })
        .collect();

    let polarizable_points = raw
        .polarizable_points
        .into_iter()
        .map(|p| {
            let t = p.tensor;
            let tensor = Matrix3::new(
                t[0][0], t[0][1], t[0][2], t[1][0], t[1][1], t[1][2], t[2][0], t[2][1], t[2][2],
            );
            PolarizablePoint::new(Point3::from(p.position), tensor)
        })
        .collect();

    Ok(FragmentTemplate {
        name: raw.name,
        atoms,
        multipole_points,
        polarizable_points,
    })
}
