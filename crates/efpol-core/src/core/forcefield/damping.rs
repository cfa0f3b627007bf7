use serde::Deserialize;

/// Exponent of the Tang-Toennies style polarization damping, in bohr^-2.
pub const POL_DAMP_TT_PARAMETER: f64 = 0.6;

/// Short-range damping applied to every field and gradient term between fragments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolarizationDamping {
    Off,
    #[default]
    #[serde(alias = "thole")]
    Tt,
}

/// Damping value `p1` and the gradient factor `p2` at a separation.
///
/// `p2` is the negated `(1/r) dp1/dr`, so that `p2 * e * (r_b - r_a)` is the gradient of
/// `p1 * e` with respect to `r_a`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DampingFactors {
    pub p1: f64,
    pub p2: f64,
}

impl DampingFactors {
    pub const NONE: Self = Self { p1: 1.0, p2: 0.0 };
}

impl PolarizationDamping {
    #[inline]
    pub fn value(self, r: f64) -> f64 {
        match self {
            Self::Off => 1.0,
            Self::Tt => pol_damp_tt(r),
        }
    }

    #[inline]
    pub fn factors(self, r: f64) -> DampingFactors {
        match self {
            Self::Off => DampingFactors::NONE,
            Self::Tt => DampingFactors {
                p1: pol_damp_tt(r),
                p2: pol_damp_tt_grad(r),
            },
        }
    }
}

#[inline]
pub fn pol_damp_tt(r: f64) -> f64 {
    let a = POL_DAMP_TT_PARAMETER;
    let r2 = r * r;

    1.0 - (-a * r2).exp() * (1.0 + a * r2)
}

#[inline]
pub fn pol_damp_tt_grad(r: f64) -> f64 {
    let a = POL_DAMP_TT_PARAMETER;
    let r2 = r * r;

    -2.0 * (-a * r2).exp() * (a * a * r2)
}
