//! Pure interaction kernels: the cutoff taper, short-range damping and the point-multipole
//! field/energy expressions acting on induced dipoles.

pub mod damping;
pub mod multipole;
pub mod switching;
pub mod term;
