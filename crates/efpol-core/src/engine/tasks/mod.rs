//! The three phases of a polarization evaluation.
//!
//! Each phase reads the fragment system, computes per-point or per-fragment results block by block
//! and only then writes them back, so no task observes a partially updated state.

pub mod field;
pub mod gradient;
pub mod induction;
