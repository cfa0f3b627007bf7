use super::config::ConfigError;
use crate::core::models::fragment::FragmentError;
use thiserror::Error;

/// Failure reported by an externally supplied field callback.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{message}")]
pub struct CallbackError {
    message: String,
}

impl CallbackError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    /// The induced dipoles are left in an unconverged state and must not be used.
    #[error("Polarization SCF did not converge after {iterations} iterations")]
    NotConverged { iterations: usize },

    #[error("Electron density callback failed: {0}")]
    Callback(#[from] CallbackError),

    #[error("Coordinate vector has length {found}, expected {expected}")]
    CoordinateMismatch { expected: usize, found: usize },

    #[error("Fragment error: {0}")]
    Fragment(#[from] FragmentError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

#[derive(Debug, Error)]
pub enum OptimizerError {
    #[error("Unable to create an optimizer: {0}")]
    Construction(String),

    #[error("Unable to initialize the optimizer: {0}")]
    Initialization(String),

    #[error("Unable to make an optimization step: {0}")]
    Step(String),

    #[error("Energy evaluation failed: {0}")]
    Evaluation(#[from] EngineError),
}
