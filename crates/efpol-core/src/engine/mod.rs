//! # Engine Module
//!
//! Stateful machinery behind a polarization evaluation: configuration, the partition of fragments
//! into worker blocks, the gradient accumulator, and the computational tasks that run in sequence
//! for every energy/gradient point.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - SCF constants, cutoff, damping, term flags and optimizer
//!   settings, each behind a validating builder
//! - **Error Handling** ([`error`]) - engine and optimizer error types
//! - **Progress Monitoring** ([`progress`]) - callback-based progress reporting
//! - **Work Distribution** ([`partition`]) - static fragment blocks and the block-by-block gather
//! - **Tasks** - static field, induced-dipole SCF and gradient accumulation, separated by the
//!   barriers the SCF requires

pub mod accumulator;
pub mod config;
pub(crate) mod context;
pub mod density;
pub mod error;
pub mod partition;
pub mod progress;
pub(crate) mod tasks;
pub mod window;
