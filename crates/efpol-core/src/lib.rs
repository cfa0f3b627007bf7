//! # efpol Core Library
//!
//! Induced-dipole polarization between rigid Effective Fragment Potential (EFP) fragments:
//! self-consistent induced dipoles, the polarization energy, its analytic gradient with respect
//! to fragment positions, orientations and external point charges, and geometry optimization
//! driven by that gradient.
//!
//! ## Architectural Philosophy
//!
//! - **[`core`]: The Foundation.** Stateless data models (`FragmentTemplate`, `Fragment`,
//!   `FragmentSystem`), the multipole interaction kernels, damping and switching functions, and
//!   the TOML fragment library loader.
//!
//! - **[`engine`]: The Logic Core.** Configuration, errors, progress reporting and the
//!   per-fragment tasks: static field, the Jacobi SCF for induced dipoles and the gradient
//!   accumulation, split over contiguous fragment blocks.
//!
//! - **[`workflows`]: The Public API.** Energy evaluation at a fixed geometry, a reusable
//!   `PolarizationModel` and the L-BFGS geometry optimizer.

pub mod core;
pub mod engine;
pub mod workflows;

#[cfg(test)]
mod fixtures;
