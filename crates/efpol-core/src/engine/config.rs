use crate::core::forcefield::damping::PolarizationDamping;
use thiserror::Error;

pub const DEFAULT_SWF_CUTOFF: f64 = 10.0;
pub const DEFAULT_SCF_TOLERANCE: f64 = 1.0e-10;
pub const DEFAULT_SCF_MAX_ITERATIONS: usize = 80;

pub const DEFAULT_LS_STEP_SIZE: f64 = 20.0;
pub const DEFAULT_OPT_TOLERANCE: f64 = 1.0e-4;
pub const DEFAULT_MAX_STEPS: usize = 100;
pub const DEFAULT_PRINT_STEP: usize = 1;
pub const DEFAULT_LBFGS_MEMORY: usize = 7;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Invalid value for '{parameter}': {reason}")]
    InvalidParameter {
        parameter: &'static str,
        reason: String,
    },
}

fn positive(parameter: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::InvalidParameter {
            parameter,
            reason: format!("must be a positive finite number, got {value}"),
        })
    }
}

fn at_least_one(parameter: &'static str, value: usize) -> Result<usize, ConfigError> {
    if value >= 1 {
        Ok(value)
    } else {
        Err(ConfigError::InvalidParameter {
            parameter,
            reason: "must be at least 1".to_string(),
        })
    }
}

/// Which energy terms are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Terms {
    /// Fragment-fragment polarization. When off, the energy and gradient are zero.
    pub polarization: bool,
    /// Polarization by an ab initio region: external point charges and electron density.
    pub ai_polarization: bool,
}

impl Default for Terms {
    fn default() -> Self {
        Self {
            polarization: true,
            ai_polarization: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolarizationConfig {
    pub enable_cutoff: bool,
    pub swf_cutoff: f64,
    pub damping: PolarizationDamping,
    pub terms: Terms,
    pub scf_tolerance: f64,
    pub scf_max_iterations: usize,
    /// Number of contiguous fragment blocks the work is split into.
    pub workers: usize,
}

impl PolarizationConfig {
    /// The switching cutoff radius, or `None` when interactions are never truncated.
    #[inline]
    pub fn cutoff(&self) -> Option<f64> {
        self.enable_cutoff.then_some(self.swf_cutoff)
    }
}

impl Default for PolarizationConfig {
    fn default() -> Self {
        Self {
            enable_cutoff: false,
            swf_cutoff: DEFAULT_SWF_CUTOFF,
            damping: PolarizationDamping::default(),
            terms: Terms::default(),
            scf_tolerance: DEFAULT_SCF_TOLERANCE,
            scf_max_iterations: DEFAULT_SCF_MAX_ITERATIONS,
            workers: 1,
        }
    }
}

#[derive(Default)]
pub struct PolarizationConfigBuilder {
    enable_cutoff: Option<bool>,
    swf_cutoff: Option<f64>,
    damping: Option<PolarizationDamping>,
    terms: Option<Terms>,
    scf_tolerance: Option<f64>,
    scf_max_iterations: Option<usize>,
    workers: Option<usize>,
}

impl PolarizationConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enable_cutoff(mut self, enable: bool) -> Self {
        self.enable_cutoff = Some(enable);
        self
    }
    pub fn swf_cutoff(mut self, cutoff: f64) -> Self {
        self.swf_cutoff = Some(cutoff);
        self
    }
    pub fn damping(mut self, damping: PolarizationDamping) -> Self {
        self.damping = Some(damping);
        self
    }
    pub fn terms(mut self, terms: Terms) -> Self {
        self.terms = Some(terms);
        self
    }
    pub fn scf_tolerance(mut self, tolerance: f64) -> Self {
        self.scf_tolerance = Some(tolerance);
        self
    }
    pub fn scf_max_iterations(mut self, iterations: usize) -> Self {
        self.scf_max_iterations = Some(iterations);
        self
    }
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    pub fn build(self) -> Result<PolarizationConfig, ConfigError> {
        let defaults = PolarizationConfig::default();
        Ok(PolarizationConfig {
            enable_cutoff: self.enable_cutoff.unwrap_or(defaults.enable_cutoff),
            swf_cutoff: positive("swf_cutoff", self.swf_cutoff.unwrap_or(defaults.swf_cutoff))?,
            damping: self.damping.unwrap_or(defaults.damping),
            terms: self.terms.unwrap_or(defaults.terms),
            scf_tolerance: positive(
                "scf_tolerance",
                self.scf_tolerance.unwrap_or(defaults.scf_tolerance),
            )?,
            scf_max_iterations: at_least_one(
                "scf_max_iterations",
                self.scf_max_iterations
                    .unwrap_or(defaults.scf_max_iterations),
            )?,
            workers: at_least_one("workers", self.workers.unwrap_or(defaults.workers))?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationConfig {
    /// Upper bound on the max-norm of a single line-search trial step.
    pub ls_step_size: f64,
    pub tolerance: f64,
    pub max_steps: usize,
    pub print_step: usize,
    /// Number of correction pairs kept by L-BFGS.
    pub memory: usize,
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        Self {
            ls_step_size: DEFAULT_LS_STEP_SIZE,
            tolerance: DEFAULT_OPT_TOLERANCE,
            max_steps: DEFAULT_MAX_STEPS,
            print_step: DEFAULT_PRINT_STEP,
            memory: DEFAULT_LBFGS_MEMORY,
        }
    }
}

#[derive(Default)]
pub struct OptimizationConfigBuilder {
    ls_step_size: Option<f64>,
    tolerance: Option<f64>,
    max_steps: Option<usize>,
    print_step: Option<usize>,
    memory: Option<usize>,
}

impl OptimizationConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ls_step_size(mut self, step: f64) -> Self {
        self.ls_step_size = Some(step);
        self
    }
    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = Some(tolerance);
        self
    }
    pub fn max_steps(mut self, steps: usize) -> Self {
        self.max_steps = Some(steps);
        self
    }
    pub fn print_step(mut self, step: usize) -> Self {
        self.print_step = Some(step);
        self
    }
    pub fn memory(mut self, memory: usize) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn build(self) -> Result<OptimizationConfig, ConfigError> {
        let defaults = OptimizationConfig::default();
        Ok(OptimizationConfig {
            ls_step_size: positive(
                "ls_step_size",
                self.ls_step_size.unwrap_or(defaults.ls_step_size),
            )?,
            tolerance: positive("tolerance", self.tolerance.unwrap_or(defaults.tolerance))?,
            max_steps: self.max_steps.unwrap_or(defaults.max_steps),
            print_step: at_least_one("print_step", self.print_step.unwrap_or(defaults.print_step))?,
            memory: at_least_one("memory", self.memory.unwrap_or(defaults.memory))?,
        })
    }
}
