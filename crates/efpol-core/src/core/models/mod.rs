pub mod fragment;
pub mod library;
pub mod points;
pub mod system;
