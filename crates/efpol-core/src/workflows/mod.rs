//! # Workflows Module
//!
//! High-level entry points that tie the `engine` tasks together into complete calculations.
//!
//! - **Energy** ([`energy`]) - Static field, induced-dipole SCF and optional analytic gradient
//!   at a fixed geometry.
//! - **Model** ([`model`]) - A fragment system bound to a configuration, usable as an objective
//!   over rigid-body coordinates.
//! - **Optimization** ([`optimize`]) - L-BFGS minimization of the polarization energy with
//!   periodic snapshots of geometry and restart data.

pub mod energy;
pub mod lbfgs;
pub mod model;
pub mod optimize;
pub mod transform;
