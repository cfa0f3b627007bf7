pub mod energy;
pub mod optimize;
