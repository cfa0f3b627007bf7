use std::ops::{Add, AddAssign};

/// Polarization energy split by the field it is computed against.
///
/// `polarization` is `-1/2 mu . E` over the static field of fragments and external point charges;
/// `ai_polarization` is `1/2 mu~ . E_wf` over the electron-density field.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EnergyTerm {
    pub polarization: f64,
    pub ai_polarization: f64,
}

impl EnergyTerm {
    pub fn new(polarization: f64, ai_polarization: f64) -> Self {
        Self {
            polarization,
            ai_polarization,
        }
    }

    #[inline]
    pub fn total(&self) -> f64 {
        self.polarization + self.ai_polarization
    }
}

impl Add for EnergyTerm {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            polarization: self.polarization + rhs.polarization,
            ai_polarization: self.ai_polarization + rhs.ai_polarization,
        }
    }
}

impl AddAssign for EnergyTerm {
    fn add_assign(&mut self, rhs: Self) {
        self.polarization += rhs.polarization;
        self.ai_polarization += rhs.ai_polarization;
    }
}

impl std::iter::Sum for EnergyTerm {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |acc, term| acc + term)
    }
}
