use crate::core::forcefield::term::EnergyTerm;
use nalgebra::Point3;

/// Where in an optimization run a snapshot was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotStage {
    Initial,
    Step(usize),
    Final,
}

/// Everything reported about the optimizer state at one point of a run.
#[derive(Debug, Clone)]
pub struct OptimizationSnapshot {
    pub stage: SnapshotStage,
    /// `(label, position)` of every atom, in bohr.
    pub geometry: Vec<(String, Point3<f64>)>,
    /// `(fragment name, [x, y, z, a, b, c])` for every fragment.
    pub restart: Vec<(String, [f64; 6])>,
    pub energy: EnergyTerm,
    pub energy_change: f64,
    pub rms_gradient: f64,
    pub max_gradient: f64,
}

#[derive(Debug, Clone)]
pub enum Progress {
    PhaseStart { name: &'static str },
    PhaseFinish,

    TaskStart { total_steps: u64 },
    TaskIncrement,
    TaskFinish,

    ScfIteration { iteration: usize, conv: f64 },
    Optimization(Box<OptimizationSnapshot>),
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }
}
