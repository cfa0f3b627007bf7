//! Limited-memory BFGS minimizer with a bounded backtracking line search.

use crate::engine::config::OptimizationConfig;
use crate::engine::error::{EngineError, OptimizerError};
use nalgebra::DVector;
use std::collections::VecDeque;
use tracing::{debug, trace};

const ARMIJO_C1: f64 = 1.0e-4;
const BACKTRACK_FACTOR: f64 = 0.5;
const MAX_BACKTRACKS: usize = 40;

/// Value and gradient of an objective at one point.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub value: f64,
    pub gradient: Vec<f64>,
}

/// An objective the optimizer can minimize.
pub trait EnergyFunction {
    fn evaluate(&mut self, x: &[f64]) -> Result<Evaluation, EngineError>;
}

impl<T: EnergyFunction + ?Sized> EnergyFunction for &mut T {
    fn evaluate(&mut self, x: &[f64]) -> Result<Evaluation, EngineError> {
        (**self).evaluate(x)
    }
}

#[derive(Debug, Clone)]
struct Correction {
    s: DVector<f64>,
    y: DVector<f64>,
    rho: f64,
}

/// L-BFGS state: current point, value, gradient and correction history.
///
/// Usage follows `new -> init -> step...`. Every accepted step is the most recently evaluated
/// point, so the objective's own state always matches [`x`](Self::x).
pub struct Lbfgs<F> {
    function: F,
    n: usize,
    memory: usize,
    ls_step_size: f64,
    x: DVector<f64>,
    fx: f64,
    gx: DVector<f64>,
    history: VecDeque<Correction>,
    initialized: bool,
}

impl<F: EnergyFunction> Lbfgs<F> {
    pub fn new(n: usize, function: F, config: &OptimizationConfig) -> Result<Self, OptimizerError> {
        if n == 0 {
            return Err(OptimizerError::Construction(
                "problem dimension must be positive".to_string(),
            ));
        }
        if config.memory == 0 {
            return Err(OptimizerError::Construction(
                "memory must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            function,
            n,
            memory: config.memory,
            ls_step_size: config.ls_step_size,
            x: DVector::zeros(n),
            fx: 0.0,
            gx: DVector::zeros(n),
            history: VecDeque::with_capacity(config.memory),
            initialized: false,
        })
    }

    /// Evaluates the objective at the starting point.
    pub fn init(&mut self, x0: &[f64]) -> Result<(), OptimizerError> {
        if x0.len() != self.n {
            return Err(OptimizerError::Initialization(format!(
                "starting point has {} coordinates, expected {}",
                x0.len(),
                self.n
            )));
        }

        let x = DVector::from_column_slice(x0);
        let (fx, gx) = self.evaluate(&x)?;
        if !fx.is_finite() || gx.iter().any(|g| !g.is_finite()) {
            return Err(OptimizerError::Initialization(
                "objective is not finite at the starting point".to_string(),
            ));
        }

        self.x = x;
        self.fx = fx;
        self.gx = gx;
        self.history.clear();
        self.initialized = true;
        Ok(())
    }

    /// Takes one quasi-Newton step.
    ///
    /// A zero gradient leaves the state unchanged.
    pub fn step(&mut self) -> Result<(), OptimizerError> {
        if !self.initialized {
            return Err(OptimizerError::Step(
                "optimizer has not been initialized".to_string(),
            ));
        }

        let mut direction = self.direction();
        let mut slope = self.gx.dot(&direction);

        if !(slope < 0.0) {
            debug!(slope, "Not a descent direction; resetting to steepest descent.");
            self.history.clear();
            direction = -&self.gx;
            slope = -self.gx.norm_squared();
        }
        if slope == 0.0 {
            return Ok(());
        }

        let accepted = match self.line_search(&direction, slope)? {
            Some(point) => point,
            None if !self.history.is_empty() => {
                debug!("Line search failed; retrying along steepest descent.");
                self.history.clear();
                let direction = -&self.gx;
                let slope = -self.gx.norm_squared();
                self.line_search(&direction, slope)?.ok_or_else(|| {
                    OptimizerError::Step("line search failed to decrease the objective".to_string())
                })?
            }
            None => {
                return Err(OptimizerError::Step(
                    "line search failed to decrease the objective".to_string(),
                ));
            }
        };

        let (x_new, f_new, g_new) = accepted;
        let s = &x_new - &self.x;
        let y = &g_new - &self.gx;
        let sy = s.dot(&y);

        if sy > f64::EPSILON * y.norm_squared() {
            if self.history.len() == self.memory {
                self.history.pop_front();
            }
            self.history.push_back(Correction { s, y, rho: 1.0 / sy });
        } else {
            trace!(sy, "Skipping correction pair with non-positive curvature.");
        }

        self.x = x_new;
        self.fx = f_new;
        self.gx = g_new;
        Ok(())
    }

    pub fn fx(&self) -> f64 {
        self.fx
    }

    pub fn x(&self) -> &[f64] {
        self.x.as_slice()
    }

    pub fn gx(&self) -> &[f64] {
        self.gx.as_slice()
    }

    pub fn function(&self) -> &F {
        &self.function
    }

    fn evaluate(&mut self, x: &DVector<f64>) -> Result<(f64, DVector<f64>), OptimizerError> {
        let eval = self.function.evaluate(x.as_slice())?;
        if eval.gradient.len() != self.n {
            return Err(EngineError::CoordinateMismatch {
                expected: self.n,
                found: eval.gradient.len(),
            }
            .into());
        }
        Ok((eval.value, DVector::from_vec(eval.gradient)))
    }

    /// Two-loop recursion for `-H g`, with `H0 = (s.y / y.y) I` from the newest pair.
    fn direction(&self) -> DVector<f64> {
        let mut q = self.gx.clone();
        let mut alphas = Vec::with_capacity(self.history.len());

        for c in self.history.iter().rev() {
            let alpha = c.rho * c.s.dot(&q);
            q.axpy(-alpha, &c.y, 1.0);
            alphas.push(alpha);
        }

        if let Some(newest) = self.history.back() {
            q *= 1.0 / (newest.rho * newest.y.norm_squared());
        }

        for (c, alpha) in self.history.iter().zip(alphas.iter().rev()) {
            let beta = c.rho * c.y.dot(&q);
            q.axpy(alpha - beta, &c.s, 1.0);
        }

        -q
    }

    /// Backtracking search for the Armijo condition. The first trial is a unit step (a unit-length
    /// step when there is no curvature history yet), capped so that no coordinate moves by more
    /// than `ls_step_size`.
    fn line_search(
        &mut self,
        direction: &DVector<f64>,
        slope: f64,
    ) -> Result<Option<(DVector<f64>, f64, DVector<f64>)>, OptimizerError> {
        let mut alpha = if self.history.is_empty() {
            1.0 / direction.norm()
        } else {
            1.0
        };

        let max_move = direction.amax() * alpha;
        if max_move > self.ls_step_size {
            alpha *= self.ls_step_size / max_move;
        }

        for _ in 0..MAX_BACKTRACKS {
            let x_new = &self.x + direction * alpha;
            let (f_new, g_new) = self.evaluate(&x_new)?;
            trace!(alpha, f_new, "Line search trial.");

            if f_new.is_finite() && f_new <= self.fx + ARMIJO_C1 * alpha * slope {
                return Ok(Some((x_new, f_new, g_new)));
            }
            alpha *= BACKTRACK_FACTOR;
        }

        Ok(None)
    }
}
